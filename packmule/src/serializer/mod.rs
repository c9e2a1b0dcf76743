use crate::{models::Job, Result};

mod json;
mod store;

pub use json::JsonSerializer;
pub use store::StoreSerializer;

/// Turns a [`Job`] into a transportable token and back.
///
/// `identifier` is the registry key the executing side uses to pick the
/// same serializer, so it travels on the command line next to the token.
#[async_trait::async_trait]
pub trait Serializer: Send + Sync {
    fn identifier(&self) -> &str;

    async fn serialize(&self, job: &Job) -> Result<String>;
    async fn unserialize(&self, token: &str) -> Result<Job>;

    /// Called once the job ran.
    async fn cleanup(&self, _job: &Job) -> Result<()> {
        Ok(())
    }
}
