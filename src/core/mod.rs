// DnaQuery - core/mod.rs
//
// Core extraction logic: rules, scanning, transformation, output.
// Works on Read/Write handles only.
// Must NOT depend on: app or platform.

pub mod model;
pub mod registry;
pub mod scanner;
pub mod sink;
pub mod timefmt;
pub mod transformer;
