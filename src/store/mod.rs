//! Store module
//!
//! Versioned persistence for every record the shop keeps.

mod entities;
mod error;
mod memory;
mod postgres;
mod repository;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{Entity, Store, Versioned, WriteAction, WriteOp};
