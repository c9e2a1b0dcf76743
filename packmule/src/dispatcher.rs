use crate::{
    backend::{Backend, BatchClient, ContainerRuntime},
    config::{Config, Options, Settings},
    job::JobBuilder,
    metrics::Metrics,
    models::{Arguments, Job},
    registry::{Entry, JobFn, Registry},
    serializer::Serializer,
    Dispatcher, Error, Inner, Result,
};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

impl Dispatcher {
    pub fn new(config: Config) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Configuration(format!("unable to set up metrics: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                settings: config.settings,
                registry: config.registry,
                jobs: RwLock::new(HashMap::new()),
                batch_client: config.batch_client,
                container_runtime: config.container_runtime,
                metrics,
                bootstrapped: tokio::sync::OnceCell::new(),
            }),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn batch_client(&self) -> Option<Arc<dyn BatchClient>> {
        self.inner.batch_client.clone()
    }

    pub fn container_runtime(&self) -> Option<Arc<dyn ContainerRuntime>> {
        self.inner.container_runtime.clone()
    }

    /// Starts the registration of `f` as a job under `path`.
    pub fn job<F>(&self, path: &str, f: F) -> JobBuilder
    where
        F: Fn(&Arguments) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        JobBuilder::new(self.clone(), path, Some(Arc::new(f)))
    }

    /// Registers a job that is only known by its path in this process,
    /// typically one that runs in another deployment.
    pub fn remote_job(&self, path: &str) -> JobBuilder {
        JobBuilder::new(self.clone(), path, None)
    }

    /// Makes `f` callable by path without marking it as a job. Under strict
    /// mode the executor refuses to run it.
    pub fn register_fn<F>(&self, path: &str, f: F) -> Result<()>
    where
        F: Fn(&Arguments) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(path, Entry::Plain(Arc::new(f)))
    }

    /// Serializer under `key`, or the configured default.
    pub fn serializer(&self, key: Option<&str>, options: &Options) -> Result<Arc<dyn Serializer>> {
        let key = match key {
            Some(key) => key.to_string(),
            None => self.inner.settings.serializer()?,
        };
        self.inner.registry.serializer(&key, options, self)
    }

    /// Backend under `key`, or the configured default.
    pub fn backend(&self, key: Option<&str>, options: &Options) -> Result<Arc<dyn Backend>> {
        let key = match key {
            Some(key) => key.to_string(),
            None => self.inner.settings.backend()?,
        };
        self.inner.registry.backend(&key, options, self)
    }

    /// Prometheus text exposition of this dispatcher's counters.
    pub fn metrics_output(&self) -> Result<String> {
        self.inner
            .metrics
            .output()
            .map_err(|e| Error::Configuration(format!("unable to render metrics: {}", e)))
    }

    pub(crate) fn insert(&self, path: &str, entry: Entry) -> Result<()> {
        if path.is_empty() {
            return Err(Error::Configuration(
                "a job needs a non-empty function path".to_string(),
            ));
        }

        let mut jobs = self.jobs_mut()?;
        let merged = match (jobs.get(path), entry) {
            (None, entry) => entry,
            (Some(Entry::Job(None)), Entry::Plain(f) | Entry::Job(Some(f))) => Entry::Job(Some(f)),
            (Some(Entry::Job(Some(f)) | Entry::Plain(f)), Entry::Job(None)) => Entry::Job(Some(f.clone())),
            (Some(Entry::Job(None)), Entry::Job(None)) => Entry::Job(None),
            (Some(_), _) => {
                return Err(Error::Configuration(format!(
                    "`{}` already has a function registered",
                    path
                )))
            }
        };
        jobs.insert(path.to_string(), merged);

        Ok(())
    }

    /// Looks `path` up in the job table, honouring strict mode.
    pub(crate) fn resolve_function(&self, path: &str) -> Result<JobFn> {
        let entry = self.jobs()?.get(path).cloned();

        match entry {
            Some(Entry::Job(Some(f))) => Ok(f),
            Some(Entry::Job(None)) => Err(Error::Resolution(format!(
                "`{}` is registered without a function in this process",
                path
            ))),
            Some(Entry::Plain(f)) => {
                if self.inner.settings.strict_mode()? {
                    Err(Error::Resolution(format!(
                        "`{}` is not registered as a job",
                        path
                    )))
                } else {
                    Ok(f)
                }
            }
            None => Err(Error::Resolution(format!("unknown function `{}`", path))),
        }
    }

    pub(crate) fn record_execution(&self, job: &Job) {
        self.inner
            .metrics
            .jobs_executed
            .with_label_values(&[job.func.as_str()])
            .inc();
    }

    pub(crate) fn record_submission(&self, backend: &str, succeeded: bool) {
        let counter = match succeeded {
            true => &self.inner.metrics.jobs_submitted,
            false => &self.inner.metrics.jobs_submit_failed,
        };
        counter.with_label_values(&[backend]).inc();
    }

    pub(crate) fn bootstrapped(&self) -> &tokio::sync::OnceCell<()> {
        &self.inner.bootstrapped
    }

    fn jobs(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Entry>>> {
        self.inner
            .jobs
            .read()
            .map_err(|e| Error::Resolution(format!("job table is unavailable: {}", e)))
    }

    fn jobs_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Entry>>> {
        self.inner
            .jobs
            .write()
            .map_err(|e| Error::Configuration(format!("job table is unavailable: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher(strict: bool) -> Dispatcher {
        let settings = Settings::default().with_value("STRICT_MODE", strict.to_string());
        Dispatcher::new(Config::builder().settings(settings).build()).unwrap()
    }

    fn noop() -> JobFn {
        Arc::new(|_: &Arguments| Ok(()))
    }

    #[test]
    fn unknown_path_does_not_resolve() {
        let result = dispatcher(true).resolve_function("app.missing");

        assert!(matches!(result, Err(Error::Resolution(_))));
    }

    #[test]
    fn plain_function_needs_non_strict_mode() {
        let strict = dispatcher(true);
        strict.register_fn("app.plain", |_| Ok(())).unwrap();
        let relaxed = dispatcher(false);
        relaxed.register_fn("app.plain", |_| Ok(())).unwrap();

        assert!(matches!(
            strict.resolve_function("app.plain"),
            Err(Error::Resolution(_))
        ));
        assert!(relaxed.resolve_function("app.plain").is_ok());
    }

    #[test]
    fn path_only_registration_keeps_bound_function() {
        let dispatcher = dispatcher(true);
        dispatcher.insert("app.add", Entry::Job(Some(noop()))).unwrap();
        dispatcher.insert("app.add", Entry::Job(None)).unwrap();

        assert!(dispatcher.resolve_function("app.add").is_ok());
    }

    #[test]
    fn path_only_registration_does_not_resolve() {
        let dispatcher = dispatcher(true);
        dispatcher.insert("app.remote", Entry::Job(None)).unwrap();

        assert!(matches!(
            dispatcher.resolve_function("app.remote"),
            Err(Error::Resolution(_))
        ));
    }

    #[test]
    fn marking_a_plain_function_as_job() {
        let dispatcher = dispatcher(true);
        dispatcher.register_fn("app.plain", |_| Ok(())).unwrap();
        dispatcher.insert("app.plain", Entry::Job(None)).unwrap();

        assert!(dispatcher.resolve_function("app.plain").is_ok());
    }

    #[test]
    fn binding_a_path_twice_is_rejected() {
        let dispatcher = dispatcher(true);
        dispatcher.insert("app.add", Entry::Job(Some(noop()))).unwrap();

        assert!(matches!(
            dispatcher.insert("app.add", Entry::Job(Some(noop()))),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            dispatcher.register_fn("app.add", |_| Ok(())),
            Err(Error::Configuration(_))
        ));
        assert!(dispatcher.resolve_function("app.add").is_ok());
    }

    #[test]
    fn binding_a_path_only_job_later() {
        let dispatcher = dispatcher(true);
        dispatcher.insert("app.remote", Entry::Job(None)).unwrap();
        dispatcher.register_fn("app.remote", |_| Ok(())).unwrap();

        assert!(dispatcher.resolve_function("app.remote").is_ok());
    }

    #[test]
    fn empty_path_is_rejected() {
        let result = dispatcher(true).register_fn("", |_| Ok(()));

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn defaults_come_from_settings() {
        let settings = Settings::default()
            .with_value("BACKEND", "immediate")
            .with_value("SERIALIZER", "nope");
        let dispatcher = Dispatcher::new(Config::builder().settings(settings).build()).unwrap();

        assert_eq!(
            "immediate",
            dispatcher.backend(None, &Options::new()).unwrap().identifier()
        );
        assert!(matches!(
            dispatcher.serializer(None, &Options::new()),
            Err(Error::Resolution(_))
        ));
    }
}
