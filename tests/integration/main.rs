//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a subsystem against
//! mock adapters or small hand-built model artifacts.  Everything runs
//! on the host with short tick intervals.

mod health_tests;
mod mocks;
mod registry_tests;
mod stream_service_tests;
