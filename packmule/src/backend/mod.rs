use crate::{
    models::{Job, StartedJob},
    serializer::Serializer,
    Error, Result,
};

#[cfg(feature = "batch")]
mod aws;
pub(crate) mod batch;
pub(crate) mod container;
#[cfg(feature = "docker")]
mod docker;
mod immediate;
mod process;
mod thread;

#[cfg(feature = "batch")]
pub use aws::AwsBatch;
pub use batch::{BatchBackend, BatchClient, JobPage, JobSummary, SubmitJobRequest};
pub use container::{ContainerBackend, ContainerRuntime, ContainerSpec};
#[cfg(feature = "docker")]
pub use docker::DockerRuntime;
pub use immediate::ImmediateBackend;
pub use process::ProcessBackend;
pub use thread::{thread_ident, ThreadBackend};

/// Default program a backend puts in front of `execute-job`.
pub const DEFAULT_PROGRAM: &str = "packmule";

/// Ships a [`Job`] to some execution environment.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    fn identifier(&self) -> &str;

    /// Backends that run the job in-process don't need a serializer and
    /// get `None`.
    fn requires_serializer(&self) -> bool {
        true
    }

    async fn submit(&self, job: &Job, serializer: Option<&dyn Serializer>) -> Result<StartedJob>;

    /// Terminates every pending or running job the backend knows about,
    /// returning how many were terminated.
    async fn purge(&self) -> Result<usize> {
        Err(Error::Configuration(format!(
            "backend `{}` does not support purge",
            self.identifier()
        )))
    }
}

pub(crate) fn require_serializer<'s>(
    backend: &str,
    serializer: Option<&'s dyn Serializer>,
) -> Result<&'s dyn Serializer> {
    serializer.ok_or_else(|| {
        Error::Configuration(format!("backend `{}` needs a serializer", backend))
    })
}

pub(crate) fn default_program() -> Vec<String> {
    vec![DEFAULT_PROGRAM.to_string()]
}

pub(crate) fn validate_program(backend: &str, program: &[String]) -> Result<()> {
    if program.is_empty() || program[0].trim().is_empty() {
        return Err(Error::Configuration(format!(
            "backend `{}` needs a non-empty command",
            backend
        )));
    }
    Ok(())
}
