//! # uhilog-domain
//!
//! Pure domain model for the uhilog field temperature logger.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define **Samples** (one sensor reading joined with a GPS fix) and their
//!   fixed-point storage encoding
//! - Define **Positions** as delivered by a location source
//! - Define the **paired sensor** identity and the GATT target it must expose
//! - Define **campaign settings**, device labels and jobcodes
//! - Define **status events** emitted by the session and how they render as
//!   user notifications
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod fixed_point;
pub mod time;

pub mod campaign;
pub mod notification;
pub mod position;
pub mod sample;
pub mod sensor;
