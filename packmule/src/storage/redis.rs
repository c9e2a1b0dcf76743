use super::Storage;
use async_mutex::{Mutex, MutexGuard};
use redis::{aio::Connection, AsyncCommands, Client};

/// Redis storage. The connection is opened on first use so building one
/// (e.g. while resolving a serializer) never touches the network.
pub struct Redis {
    client: Client,
    connection: Mutex<Option<Connection>>,
}

impl Redis {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> anyhow::Result<MutexGuard<'_, Option<Connection>>> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.client.get_async_connection().await?);
        }
        Ok(guard)
    }
}

#[async_trait::async_trait]
impl Storage for Redis {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let mut guard = self.connection().await?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("redis connection is not available"))?;
        let data: Option<Vec<u8>> = conn.get(key).await?;
        Ok(data.filter(|data| !data.is_empty()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl_sec: usize) -> anyhow::Result<()> {
        let mut guard = self.connection().await?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("redis connection is not available"))?;
        Ok(conn.set_ex(key, value, ttl_sec).await?)
    }

    async fn expire(&self, key: &str, ttl_sec: usize) -> anyhow::Result<()> {
        let mut guard = self.connection().await?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("redis connection is not available"))?;
        Ok(conn.expire(key, ttl_sec).await?)
    }
}
