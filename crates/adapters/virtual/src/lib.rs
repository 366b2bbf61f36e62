//! # uhilog-adapter-virtual
//!
//! Virtual/demo adapters that stand in for the platform so the session can
//! run without a sensor or a GPS receiver.
//!
//! ## Provided adapters
//!
//! | Adapter | Port | Behaviour |
//! |---------|------|-----------|
//! | [`VirtualBle`] | `BleTransport` | Advertises one sensor whose temperature drifts around a base value |
//! | [`VirtualLocation`] | `LocationTransport` | Walks a straight track from a start coordinate |
//! | [`GrantAll`] | `PermissionGate` | Grants every permission |
//!
//! ## Dependency rule
//!
//! Depends on `uhilog-app` (port traits) and `uhilog-domain` only.

mod location;
mod permissions;
mod sensor;

pub use location::{VirtualLocation, VirtualTrack};
pub use permissions::GrantAll;
pub use sensor::{VirtualBle, VirtualCharacteristic, VirtualConnection, VirtualSensorConfig};
