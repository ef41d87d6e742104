// DnaQuery - platform/mod.rs
//
// Platform layer: config file loading and local filesystem access.
// Dependencies: standard library, toml, flate2, core rule definitions.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
