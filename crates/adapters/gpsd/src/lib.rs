//! # uhilog-adapter-gpsd
//!
//! Location adapter backed by [gpsd](https://gpsd.io), the service daemon
//! that multiplexes GPS receivers on Linux hosts.
//!
//! ## How it works
//!
//! Each request opens a TCP connection, enables JSON watch mode and reads
//! `TPV` reports line by line. A one-shot fix returns the first report with
//! a 2D or 3D fix; a watch forwards fixes to the session, dropping any that
//! arrive faster than the requested interval.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `uhilog-app` and `uhilog-domain`.

mod config;
mod error;
mod location;
pub mod protocol;

pub use config::GpsdConfig;
pub use error::GpsdError;
pub use location::GpsdLocation;
