//! BLE adapter error types and their mapping onto the port error.

use uhilog_app::ports::BleError;

/// Errors specific to the btleplug adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// A btleplug call failed.
    #[error("btleplug error")]
    Btleplug(#[from] btleplug::Error),

    /// `connect` was given a peripheral the last scan did not report.
    #[error("peripheral {0} was not seen by the last scan")]
    UnknownPeripheral(String),
}

impl From<AdapterError> for BleError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::NotAvailable => Self::AdapterOff,
            AdapterError::UnknownPeripheral(_) => Self::ConnectFailed(Box::new(err)),
            AdapterError::Btleplug(_) => Self::ScanFailed(Box::new(err)),
        }
    }
}

pub(crate) fn scan_failed(err: btleplug::Error) -> BleError {
    BleError::ScanFailed(Box::new(AdapterError::from(err)))
}

pub(crate) fn connect_failed(err: btleplug::Error) -> BleError {
    BleError::ConnectFailed(Box::new(AdapterError::from(err)))
}

pub(crate) fn read_failed(err: btleplug::Error) -> BleError {
    BleError::ReadFailed(Box::new(AdapterError::from(err)))
}

pub(crate) fn disconnect_failed(err: btleplug::Error) -> BleError {
    BleError::DisconnectFailed(Box::new(AdapterError::from(err)))
}
