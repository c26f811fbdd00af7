// crates/trustgate-store/src/lib.rs
//
// trustgate-store: Storage layer for Trustgate.
//
// Provides a RocksDB-backed store and an in-memory store. Both implement
// every storage trait from trustgate-core (snapshots, wallet links, loan
// requests, audit entries) so a single instance can back the whole daemon.

pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use memory::MemoryStore;
pub use rocks::RocksStore;
