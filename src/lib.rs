//! Marvin: a chat robot core.
//!
//! An [`adapters::Adapter`] owns the real-time session with a chat backend
//! and feeds normalized [`types::Message`]s to a [`robot::Robot`], which
//! matches them against registered regex listeners and runs the callbacks
//! of every match in order.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod types;

pub mod adapters;
pub mod http;
pub mod robot;

pub mod plugins;
