//! Stable string keys for serializers, backends and bootstrap callbacks.
//!
//! The key a serializer registers under is what travels on the worker
//! command line, so submitter and worker must be built with the same
//! registry entries.

use crate::{
    backend::{
        batch, container, Backend, BatchBackend, ContainerBackend, ImmediateBackend,
        ProcessBackend, ThreadBackend,
    },
    config::Options,
    models::Arguments,
    serializer::{JsonSerializer, Serializer, StoreSerializer},
    storage::Storage,
    Dispatcher, Error, Result,
};
use std::{collections::HashMap, sync::Arc};

/// A function that can run as a job.
pub type JobFn = Arc<dyn Fn(&Arguments) -> anyhow::Result<()> + Send + Sync>;
pub type BootstrapFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;
pub type SerializerFactory =
    Arc<dyn Fn(&Options, &Dispatcher) -> Result<Arc<dyn Serializer>> + Send + Sync>;
pub type BackendFactory =
    Arc<dyn Fn(&Options, &Dispatcher) -> Result<Arc<dyn Backend>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Registry {
    serializers: HashMap<String, SerializerFactory>,
    backends: HashMap<String, BackendFactory>,
    bootstraps: HashMap<String, BootstrapFn>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in serializer and backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry
            .register_serializer("json", |_, _| Ok(Arc::new(JsonSerializer::new())))
            .register_backend("batch", |options, dispatcher| {
                let client = match dispatcher.batch_client() {
                    Some(client) => client,
                    None => batch::default_client(options, dispatcher.settings())?,
                };
                Ok(Arc::new(BatchBackend::new(client, options, dispatcher.settings())?))
            })
            .register_backend("container", |options, dispatcher| {
                let runtime = match dispatcher.container_runtime() {
                    Some(runtime) => runtime,
                    None => container::default_runtime()?,
                };
                Ok(Arc::new(ContainerBackend::new(runtime, options, dispatcher.settings())?))
            })
            .register_backend("process", |options, dispatcher| {
                Ok(Arc::new(ProcessBackend::new(options, dispatcher.settings())?))
            })
            .register_backend("thread", |_, dispatcher| {
                Ok(Arc::new(ThreadBackend::new(dispatcher.clone())))
            })
            .register_backend("immediate", |_, dispatcher| {
                Ok(Arc::new(ImmediateBackend::new(dispatcher.clone())))
            });

        #[cfg(feature = "redis")]
        registry.register_serializer("redis", |options, dispatcher| {
            Ok(Arc::new(StoreSerializer::redis(
                "redis",
                options,
                dispatcher.settings(),
            )?))
        });

        registry
    }

    pub fn register_serializer<F>(&mut self, key: &str, factory: F) -> &mut Self
    where
        F: Fn(&Options, &Dispatcher) -> Result<Arc<dyn Serializer>> + Send + Sync + 'static,
    {
        self.serializers.insert(key.to_string(), Arc::new(factory));
        self
    }

    /// Registers an out-of-band serializer writing to `storage` under `key`.
    pub fn register_store(&mut self, key: &str, storage: Arc<dyn Storage>) -> &mut Self {
        let identifier = key.to_string();
        self.register_serializer(key, move |options, dispatcher| {
            Ok(Arc::new(StoreSerializer::new(
                &identifier,
                storage.clone(),
                options,
                dispatcher.settings(),
            )?))
        })
    }

    pub fn register_backend<F>(&mut self, key: &str, factory: F) -> &mut Self
    where
        F: Fn(&Options, &Dispatcher) -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        self.backends.insert(key.to_string(), Arc::new(factory));
        self
    }

    /// Registers a callback the worker runs once before decoding its job,
    /// selected with the `BOOTSTRAP_CALLBACK` setting.
    pub fn register_bootstrap<F>(&mut self, key: &str, callback: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bootstraps.insert(key.to_string(), Arc::new(callback));
        self
    }

    pub(crate) fn serializer(
        &self,
        key: &str,
        options: &Options,
        dispatcher: &Dispatcher,
    ) -> Result<Arc<dyn Serializer>> {
        let factory = self
            .serializers
            .get(key)
            .ok_or_else(|| unknown("serializer", key, self.serializers.keys()))?;
        factory(options, dispatcher)
    }

    pub(crate) fn backend(
        &self,
        key: &str,
        options: &Options,
        dispatcher: &Dispatcher,
    ) -> Result<Arc<dyn Backend>> {
        let factory = self
            .backends
            .get(key)
            .ok_or_else(|| unknown("backend", key, self.backends.keys()))?;
        factory(options, dispatcher)
    }

    pub(crate) fn bootstrap(&self, key: &str) -> Result<BootstrapFn> {
        self.bootstraps
            .get(key)
            .cloned()
            .ok_or_else(|| unknown("bootstrap callback", key, self.bootstraps.keys()))
    }
}

fn unknown<'a>(what: &str, key: &str, known: impl Iterator<Item = &'a String>) -> Error {
    let mut known: Vec<&str> = known.map(String::as_str).collect();
    known.sort_unstable();
    Error::Resolution(format!(
        "unknown {} `{}` (registered: {})",
        what,
        key,
        known.join(", ")
    ))
}

/// What a function path resolves to in the job table.
#[derive(Clone)]
pub(crate) enum Entry {
    /// Registered as a job; `None` when only the path is known here.
    Job(Option<JobFn>),
    /// Callable, but never marked as a job.
    Plain(JobFn),
}
