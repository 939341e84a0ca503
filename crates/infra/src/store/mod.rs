//! Bindings to the external relational data service.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryAccessStore;
#[cfg(feature = "postgres")]
pub use postgres::PgAccessStore;
