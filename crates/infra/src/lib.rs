//! `spendgate-infra` — storage adapters, the decision cache and the
//! service facade tying the engine together.

pub mod cache;
pub mod service;
pub mod store;

pub use cache::DecisionCache;
pub use service::AccessService;
pub use store::InMemoryAccessStore;
#[cfg(feature = "postgres")]
pub use store::PgAccessStore;
