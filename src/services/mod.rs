// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod ranking;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CachedStore};
pub use memory::InMemoryStore;
pub use postgres::PostgresClient;
pub use ranking::{RankError, RankingService, DEFAULT_RADIUS_KM};
pub use store::{MatchStore, StoreError};
