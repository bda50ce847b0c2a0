//! # Kruisteller Core Library
//!
//! Core functionality for the kruisteller intersection counting bridge.

#![warn(missing_docs)]

//!
//! This library provides:
//! - YAML configuration loading
//! - Serial port enumeration and line framing for the counting controller
//! - Event token parsing and classification
//! - A MySQL gateway for intersection lookups and event writes
//! - The startup sequencer that ties everything together
//!
//! ## Example
//!
//! ```rust,ignore
//! use kruisteller_core::{bridge::{Bridge, SystemSerial}, db::MySqlGateway};
//!
//! let mut bridge = Bridge::new(SystemSerial::default(), std::io::stdout());
//! let mut gateway = None;
//! let summary = bridge
//!     .run("config.yml", |config| {
//!         let g = MySqlGateway::connect_lazy(&config.mysql);
//!         gateway = Some(g.clone());
//!         g
//!     })
//!     .await?;
//! ```

pub mod bridge;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod protocol;
