#[cfg(feature = "redis")]
pub mod redis;

pub mod memory;

pub use memory::MemoryStorage;
#[cfg(feature = "redis")]
pub use redis::Redis;

/// Key/value store used by the out-of-band serializer.
#[async_trait::async_trait]
pub trait Storage: Sync + Send {
    /// `None` when nothing (or an empty value) is stored under `key`.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], ttl_sec: usize) -> anyhow::Result<()>;

    async fn expire(&self, key: &str, ttl_sec: usize) -> anyhow::Result<()>;
}
