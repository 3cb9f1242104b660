mod memory_store;
mod redis_store;
mod traits;

pub use memory_store::{InMemorySessionStore, InMemoryTokenBlacklist};
pub use redis_store::{connect, RedisSessionStore, RedisTokenBlacklist};
pub use traits::{SessionStore, TokenBlacklist};
