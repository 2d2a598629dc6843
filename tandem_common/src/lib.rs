//! TANDEM Common Library
//!
//! This crate provides the driver boundary, shared constants and
//! configuration loading utilities for all TANDEM workspace crates.
//!
//! # Module Structure
//!
//! - [`drive`] - Field-bus and axis driver traits, status bits, drive events
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide limits, defaults and register addresses
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use tandem_common::prelude::*;
//!
//! let status = AxisStatus::STAND_STILL;
//! assert!(status.is_standstill());
//! ```

pub mod config;
pub mod consts;
pub mod drive;
pub mod prelude;
