// crates/tspend-cli/src/commands/mod.rs
//
// Command module declarations for the tspend CLI.

pub mod estimate;
pub mod expiry;
pub mod gen;
pub mod progress;
