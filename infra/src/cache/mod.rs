//! Redis-backed token storage
//!
//! [`RedisClient`] wraps a multiplexed connection with retry logic;
//! [`RedisTokenStore`] implements the token store contract on top of it.

pub mod redis_client;
pub mod redis_token_store;

pub use redis_client::RedisClient;
pub use redis_token_store::RedisTokenStore;

pub use tw_shared::config::CacheConfig;
