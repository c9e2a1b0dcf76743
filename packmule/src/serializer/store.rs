use super::Serializer;
use crate::{
    config::{Options, Settings},
    encoder,
    id::IdOf,
    models::Job,
    storage::Storage,
    Error, Result,
};
use std::sync::Arc;

pub const OPTION_PREFIX: &str = "store";
pub const DEFAULT_TTL: u64 = 24 * 3600;
pub const DEFAULT_CLEANUP_TTL: u64 = 600;
pub const DEFAULT_KEY_PREFIX: &str = "packmule-job-";

/// Out-of-band serializer: the JSON payload is written to a [`Storage`]
/// and the token is the storage key.
pub struct StoreSerializer {
    identifier: String,
    storage: Arc<dyn Storage>,
    ttl: u64,
    cleanup_ttl: u64,
    key_prefix: String,
}

impl StoreSerializer {
    pub fn new(
        identifier: &str,
        storage: Arc<dyn Storage>,
        options: &Options,
        settings: &Settings,
    ) -> Result<Self> {
        Ok(Self {
            identifier: identifier.to_string(),
            storage,
            ttl: settings.resolve(options, OPTION_PREFIX, "ttl", Some(DEFAULT_TTL))?,
            cleanup_ttl: settings.resolve(
                options,
                OPTION_PREFIX,
                "cleanup_ttl",
                Some(DEFAULT_CLEANUP_TTL),
            )?,
            key_prefix: settings.resolve(
                options,
                OPTION_PREFIX,
                "key_prefix",
                Some(DEFAULT_KEY_PREFIX.to_string()),
            )?,
        })
    }

    /// Redis-backed flavour, `store_url` is required.
    #[cfg(feature = "redis")]
    pub fn redis(identifier: &str, options: &Options, settings: &Settings) -> Result<Self> {
        let url: String = settings.resolve(options, OPTION_PREFIX, "url", None)?;
        let storage = crate::storage::Redis::new(&url).map_err(|e| {
            Error::Configuration(format!("invalid `{}`: {}", settings.env_key(OPTION_PREFIX, "url"), e))
        })?;

        Self::new(identifier, Arc::new(storage), options, settings)
    }

    pub fn key_for(&self, job: &Job) -> String {
        IdOf::JobPayload {
            prefix: &self.key_prefix,
            id: job.id,
        }
        .get_id()
        .to_string()
    }
}

#[async_trait::async_trait]
impl Serializer for StoreSerializer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn serialize(&self, job: &Job) -> Result<String> {
        let payload = encoder::encode(job)?;
        let key = self.key_for(job);

        self.storage
            .set(&key, payload.as_bytes(), self.ttl as usize)
            .await
            .map_err(Error::Storage)?;

        tracing::debug!("Job {}: payload stored under {}", job.id, key);
        Ok(key)
    }

    async fn unserialize(&self, token: &str) -> Result<Job> {
        let bytes = self
            .storage
            .get(token)
            .await
            .map_err(Error::Storage)?
            .ok_or_else(|| {
                Error::Serialization(format!("no payload stored under `{}` (expired?)", token))
            })?;
        let payload = std::str::from_utf8(&bytes)
            .map_err(|e| Error::Serialization(format!("payload under `{}` is not UTF-8: {}", token, e)))?;
        let job: Job = encoder::decode(payload)?;

        let id = IdOf::JobPayload {
            prefix: &self.key_prefix,
            id: job.id,
        }
        .get_id();
        if id != *token {
            return Err(Error::Serialization(format!(
                "payload under `{}` belongs to `{}`, refusing to run it",
                token,
                id.to_string()
            )));
        }

        Ok(job)
    }

    /// Shortens the TTL; the payload stays readable for `cleanup_ttl` seconds.
    async fn cleanup(&self, job: &Job) -> Result<()> {
        self.storage
            .expire(&self.key_for(job), self.cleanup_ttl as usize)
            .await
            .map_err(Error::Storage)
    }
}
