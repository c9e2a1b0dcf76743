use super::Serializer;
use crate::{encoder, models::Job, Result};

pub const IDENTIFIER: &str = "json";

/// In-band serializer: the token is the job itself as JSON.
#[derive(Debug, Default, Clone)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Serializer for JsonSerializer {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    async fn serialize(&self, job: &Job) -> Result<String> {
        encoder::encode(job)
    }

    async fn unserialize(&self, token: &str) -> Result<Job> {
        encoder::decode(token)
    }
}
