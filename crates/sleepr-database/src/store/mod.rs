//! Store adapters implementing [`StoreClient`](sleepr_core::traits::StoreClient).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
