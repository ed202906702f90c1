//! Bundy attendance engine.
//!
//! This crate provides the core of a clock in/out kiosk: deriving each
//! employee's current status from an append-only log of time entries, the
//! optimistic toggle that writes new entries, a daily auto clock-out sweep,
//! and date-columned attendance reports. An axum HTTP API exposes the kiosk
//! operations.

#![warn(missing_docs)]

pub mod api;
pub mod attendance;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
