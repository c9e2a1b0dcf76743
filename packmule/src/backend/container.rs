use super::{require_serializer, Backend};
use crate::{
    commands::ExecuteCommand,
    config::{Options, Settings},
    models::{Job, StartedJob},
    serializer::Serializer,
    Error, Result,
};
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

pub const IDENTIFIER: &str = "container";
pub const OPTION_PREFIX: &str = "container";

/// What to run, as resolved by the [`ContainerBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub image: String,
    pub entrypoint: Option<Vec<String>>,
    pub command: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub auto_remove: bool,
    /// Free-form options handed to the runtime as they are.
    pub run_options: Map<String, Value>,
}

#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Starts the container detached and returns its id.
    async fn run_detached(&self, spec: ContainerSpec) -> anyhow::Result<String>;
}

/// Container runtime backend.
pub struct ContainerBackend {
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    entrypoint: Option<Vec<String>>,
    environment: BTreeMap<String, String>,
    auto_remove: bool,
    run_options: Map<String, Value>,
    program: Vec<String>,
}

impl ContainerBackend {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        options: &Options,
        settings: &Settings,
    ) -> Result<Self> {
        let image = settings.resolve(options, OPTION_PREFIX, "image", None)?;
        let explicit: HashMap<String, String> =
            settings.resolve(options, OPTION_PREFIX, "environment", Some(HashMap::new()))?;
        let pass_environment =
            settings.resolve(options, OPTION_PREFIX, "pass_environment", Some(false))?;
        let program = settings.resolve(options, OPTION_PREFIX, "command", Some(super::default_program()))?;
        super::validate_program(IDENTIFIER, &program)?;

        let mut environment = BTreeMap::new();
        if pass_environment {
            environment.extend(settings.host_env().clone());
        }
        environment.extend(explicit);

        Ok(Self {
            runtime,
            image,
            entrypoint: settings.resolve_optional(options, OPTION_PREFIX, "entrypoint")?,
            environment,
            auto_remove: settings.resolve(options, OPTION_PREFIX, "auto_remove", Some(true))?,
            run_options: settings.resolve(options, OPTION_PREFIX, "run_options", Some(Map::new()))?,
            program,
        })
    }

    pub fn spec_for(&self, command: Vec<String>) -> ContainerSpec {
        ContainerSpec {
            image: self.image.clone(),
            entrypoint: self.entrypoint.clone(),
            command,
            environment: self.environment.clone(),
            auto_remove: self.auto_remove,
            run_options: self.run_options.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Backend for ContainerBackend {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    async fn submit(&self, job: &Job, serializer: Option<&dyn Serializer>) -> Result<StartedJob> {
        let serializer = require_serializer(IDENTIFIER, serializer)?;
        let token = serializer.serialize(job).await?;
        let command = ExecuteCommand::new(serializer.identifier(), token).command_line(&self.program);

        let container_id = self
            .runtime
            .run_detached(self.spec_for(command))
            .await
            .map_err(|e| Error::submission(IDENTIFIER, e))?;

        tracing::info!("Job {} started in container {}", job.id, container_id);

        Ok(StartedJob::new(IDENTIFIER, job, container_id))
    }
}

/// The runtime used when none was passed to [`crate::Config`].
pub(crate) fn default_runtime() -> Result<Arc<dyn ContainerRuntime>> {
    #[cfg(feature = "docker")]
    {
        let runtime = super::DockerRuntime::connect()
            .map_err(|e| Error::Configuration(format!("backend `{}`: {:#}", IDENTIFIER, e)))?;
        Ok(Arc::new(runtime))
    }

    #[cfg(not(feature = "docker"))]
    Err(Error::Configuration(format!(
        "backend `{}` needs a container runtime: enable the `docker` feature or pass one to the config",
        IDENTIFIER
    )))
}
