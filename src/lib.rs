#![cfg_attr(not(test), no_std)]

//! # Quectel smart configuration
//!
//! Check-set-verify configuration engine for Quectel cellular modules that
//! are using an AT commands based interface. The engine compares the module's
//! live settings against a declared desired state and only writes the deltas,
//! so repeated runs do not wear the module's flash.
//!
//! The serial link itself is not owned by this crate. Implement
//! [`transport::AtTransport`] for whatever carries your AT traffic (a serial
//! port, a mux channel, a test double) and hand it to a [`Configurator`]:
//!
//! ```ignore
//! let mut desired = DesiredConfig::new();
//! desired.set("basic", "error_reporting", Value::Int(2))?;
//!
//! let report = Configurator::new(&mut port, &mut delay).run(&desired)?;
//! info!("{}", report.summary());
//! ```
//!
//! The engine issues one command at a time and blocks on the transport; the
//! transport is exclusively owned for the duration of a run. A run never
//! aborts on a per-key failure; only a dead serial device is fatal, and even
//! then the partial [`report::Report`] travels with the error.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod codec;
pub mod command;
pub mod config;
mod configurator;
pub mod error;
pub mod report;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use config::{DesiredConfig, Value};
pub use configurator::{Config, Configurator};
pub use report::{Report, Summary};
