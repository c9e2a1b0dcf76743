use crate::{
    backend::Backend,
    config::Options,
    models::{Arguments, Job, StartedJob},
    registry::{Entry, JobFn},
    serializer::Serializer,
    Dispatcher, Error, Result,
};
use serde_json::Value;
use std::sync::Arc;

/// Which serializer or backend a job uses.
enum Selection<T: ?Sized> {
    Default,
    Named(String),
    Instance(Arc<T>),
}

impl<T: ?Sized> Clone for Selection<T> {
    fn clone(&self) -> Self {
        match self {
            Selection::Default => Selection::Default,
            Selection::Named(key) => Selection::Named(key.clone()),
            Selection::Instance(instance) => Selection::Instance(instance.clone()),
        }
    }
}

pub struct JobBuilder {
    dispatcher: Dispatcher,
    path: String,
    function: Option<JobFn>,
    serializer: Selection<dyn Serializer>,
    backend: Selection<dyn Backend>,
    options: Options,
}

impl JobBuilder {
    pub(crate) fn new(dispatcher: Dispatcher, path: &str, function: Option<JobFn>) -> Self {
        Self {
            dispatcher,
            path: path.to_string(),
            function,
            serializer: Selection::Default,
            backend: Selection::Default,
            options: Options::new(),
        }
    }

    /// Registry key of the serializer.
    pub fn serializer(mut self, key: &str) -> Self {
        self.serializer = Selection::Named(key.to_string());
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Selection::Instance(serializer);
        self
    }

    /// Registry key of the backend.
    pub fn backend(mut self, key: &str) -> Self {
        self.backend = Selection::Named(key.to_string());
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Selection::Instance(backend);
        self
    }

    /// Per-job option such as `batch_queue_name`, taking precedence over
    /// the process-wide settings.
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_lowercase(), value.into());
        self
    }

    pub fn register(self) -> Result<JobHandle> {
        self.dispatcher
            .insert(&self.path, Entry::Job(self.function.clone()))?;

        tracing::debug!("Registered job {}", self.path);

        Ok(JobHandle {
            dispatcher: self.dispatcher,
            path: self.path,
            function: self.function,
            serializer: self.serializer,
            backend: self.backend,
            options: self.options,
        })
    }
}

/// A registered job. `submit` sends it to its backend, `call` runs it
/// right here.
#[derive(Clone)]
pub struct JobHandle {
    dispatcher: Dispatcher,
    path: String,
    function: Option<JobFn>,
    serializer: Selection<dyn Serializer>,
    backend: Selection<dyn Backend>,
    options: Options,
}

impl JobHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn submit(&self, arguments: Arguments) -> Result<StartedJob> {
        let job = Job::new(self.path.clone(), arguments);

        let backend = self.resolve_backend()?;
        let serializer = match backend.requires_serializer() {
            true => Some(self.resolve_serializer()?),
            false => None,
        };

        tracing::debug!(
            "Submitting job {} ({}) to {}",
            job.id,
            job.func,
            backend.identifier()
        );

        match backend.submit(&job, serializer.as_deref()).await {
            Ok(started) => {
                self.dispatcher.record_submission(backend.identifier(), true);
                Ok(started)
            }
            Err(e) => {
                self.dispatcher.record_submission(backend.identifier(), false);
                Err(e)
            }
        }
    }

    /// Invokes the bound function locally.
    pub fn call(&self, arguments: &Arguments) -> Result<()> {
        let function = self.function.as_ref().ok_or_else(|| {
            Error::Resolution(format!(
                "`{}` has no function in this process",
                self.path
            ))
        })?;

        function(arguments).map_err(|source| Error::Job {
            func: self.path.clone(),
            source,
        })
    }

    fn resolve_backend(&self) -> Result<Arc<dyn Backend>> {
        match &self.backend {
            Selection::Instance(backend) => Ok(backend.clone()),
            Selection::Named(key) => self.dispatcher.backend(Some(key), &self.options),
            Selection::Default => self.dispatcher.backend(None, &self.options),
        }
    }

    fn resolve_serializer(&self) -> Result<Arc<dyn Serializer>> {
        match &self.serializer {
            Selection::Instance(serializer) => Ok(serializer.clone()),
            Selection::Named(key) => self.dispatcher.serializer(Some(key), &self.options),
            Selection::Default => self.dispatcher.serializer(None, &self.options),
        }
    }
}
