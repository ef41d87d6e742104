// DnaQuery - app/mod.rs
//
// Application layer: pipeline orchestration and the end-to-end run.
// Dependencies: core, platform.

pub mod pipeline;
pub mod run;
