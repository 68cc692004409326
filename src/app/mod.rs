//! Application core: stream orchestration with no transport I/O.
//!
//! This module holds the rules that tie topic membership to simulation
//! sessions and expose the health assessment.  Models, payload sinks
//! and config sources are reached through **port traits** defined in
//! [`ports`], keeping this layer testable with scripted doubles.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
