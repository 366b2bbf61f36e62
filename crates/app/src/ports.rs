//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod ble;
pub mod events;
pub mod location;
pub mod platform;
pub mod registry;
pub mod storage;

pub use ble::{Advertisement, BleConnection, BleError, BleTransport};
pub use events::{
    EventQueue, EventSink, SessionEvent, SessionEventKind, SessionEvents, Subscription,
    event_channel,
};
pub use location::{LocationError, LocationTransport, WatchOptions};
pub use platform::{Clock, NotificationSink, PermissionGate, SystemClock};
pub use registry::{RegistryError, RegistryKey, SensorRegistry};
pub use storage::{SampleStore, StorageError};
