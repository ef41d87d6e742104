// DnaQuery - lib.rs
//
// Library entry point, exposing all modules for integration testing and for
// callers that drive a run programmatically.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
