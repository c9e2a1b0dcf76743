use super::Storage;
use std::{
    collections::HashMap,
    sync::RwLock,
    time::{Duration, Instant},
};

struct Item {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process storage. Honours TTLs on read.
#[derive(Default)]
pub struct MemoryStorage {
    storage: RwLock<HashMap<String, Item>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before `key` expires.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.storage
            .read()
            .ok()?
            .get(key)
            .and_then(|item| item.expires_at.checked_duration_since(Instant::now()))
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let storage = self.storage.read().map_err(|e| anyhow::anyhow!("{}", e))?;
        match storage.get(key) {
            Some(item) if item.expires_at > Instant::now() => Ok(Some(item.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl_sec: usize) -> anyhow::Result<()> {
        self.storage
            .write()
            .map_err(|e| anyhow::anyhow!("{}", e))?
            .insert(
                key.to_string(),
                Item {
                    value: value.to_vec(),
                    expires_at: Instant::now() + Duration::from_secs(ttl_sec as u64),
                },
            );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_sec: usize) -> anyhow::Result<()> {
        if let Some(item) = self
            .storage
            .write()
            .map_err(|e| anyhow::anyhow!("{}", e))?
            .get_mut(key)
        {
            item.expires_at = Instant::now() + Duration::from_secs(ttl_sec as u64);
        }
        Ok(())
    }
}
