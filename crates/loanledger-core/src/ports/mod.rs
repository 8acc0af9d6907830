//! Port definitions (hexagonal architecture interfaces)
//!
//! The only port is the world state: the deterministic key-value store owned
//! by the hosting ledger platform. Adapters live in `loanledger-state`.

pub mod world_state;

pub use world_state::IWorldState;
