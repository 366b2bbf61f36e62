//! gpsd adapter error types.

use uhilog_app::ports::LocationError;

/// Errors specific to the gpsd adapter.
#[derive(Debug, thiserror::Error)]
pub enum GpsdError {
    /// The daemon could not be reached.
    #[error("cannot connect to gpsd at {address}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the daemon failed.
    #[error("gpsd i/o error")]
    Io(#[from] std::io::Error),

    /// The daemon closed the connection.
    #[error("gpsd closed the connection")]
    Closed,
}

impl From<GpsdError> for LocationError {
    fn from(err: GpsdError) -> Self {
        match err {
            GpsdError::Connect { .. } => Self::Unavailable(Box::new(err)),
            GpsdError::Io(_) | GpsdError::Closed => Self::Stream(Box::new(err)),
        }
    }
}
