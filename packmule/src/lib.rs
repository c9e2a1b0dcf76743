#![doc = include_str!("../README.md")]
use crate::{
    backend::{BatchClient, ContainerRuntime},
    metrics::Metrics,
    registry::Entry,
};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

pub use anyhow;
pub use serde_json;

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
mod dispatcher;
mod encoder;
mod error;
mod executor;
mod id;
mod job;
mod metrics;
mod models;
pub mod registry;
pub mod serializer;
pub mod storage;

pub use config::{Config, Options, Settings};
pub use error::{Error, Result};
pub use job::{JobBuilder, JobHandle};
pub use models::{Arguments, Job, JobId, StartedJob};
pub use registry::{JobFn, Registry};

pub type UtcDateTime = chrono::DateTime<chrono::Utc>;

pub fn generate_id() -> JobId {
    JobId::new()
}

/// Owns the settings, the registry and the job table shared by submitting
/// code and the worker side. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    settings: Settings,
    registry: Registry,
    jobs: RwLock<HashMap<String, Entry>>,
    batch_client: Option<Arc<dyn BatchClient>>,
    container_runtime: Option<Arc<dyn ContainerRuntime>>,
    metrics: Metrics,
    bootstrapped: tokio::sync::OnceCell<()>,
}
