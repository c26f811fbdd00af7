// crates/trustgate-cli/src/commands/mod.rs
//
// Command module declarations for the Trustgate CLI.

pub mod api;
pub mod attest;
pub mod hash;
pub mod keys;
