use super::{require_serializer, Backend};
use crate::{
    commands::ExecuteCommand,
    config::{Options, Settings},
    models::{Job, StartedJob},
    serializer::Serializer,
    Error, Result,
};
use std::sync::Arc;

pub const IDENTIFIER: &str = "batch";
pub const OPTION_PREFIX: &str = "batch";

/// Job states that count as pending or running for [`Backend::purge`].
pub const ACTIVE_STATUSES: [&str; 5] = ["SUBMITTED", "PENDING", "RUNNABLE", "STARTING", "RUNNING"];

const PURGE_REASON: &str = "Purged by packmule";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitJobRequest {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    /// Container command override.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: String,
    pub job_name: String,
}

/// One page of a job listing; `next_token` is set when more pages follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPage {
    pub jobs: Vec<JobSummary>,
    pub next_token: Option<String>,
}

/// The cloud batch service operations the backend relies on.
#[async_trait::async_trait]
pub trait BatchClient: Send + Sync {
    /// Returns the provider-assigned job id.
    async fn submit_job(&self, request: SubmitJobRequest) -> anyhow::Result<String>;
    async fn list_jobs(
        &self,
        queue: &str,
        status: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<JobPage>;
    async fn terminate_job(&self, job_id: &str, reason: &str) -> anyhow::Result<()>;
}

/// Cloud batch queue backend.
pub struct BatchBackend {
    client: Arc<dyn BatchClient>,
    queue_name: String,
    job_definition: String,
    program: Vec<String>,
}

impl BatchBackend {
    pub fn new(client: Arc<dyn BatchClient>, options: &Options, settings: &Settings) -> Result<Self> {
        let program = settings.resolve(options, OPTION_PREFIX, "command", Some(super::default_program()))?;
        super::validate_program(IDENTIFIER, &program)?;

        Ok(Self {
            client,
            queue_name: settings.resolve(options, OPTION_PREFIX, "queue_name", None)?,
            job_definition: settings.resolve(options, OPTION_PREFIX, "job_definition", None)?,
            program,
        })
    }
}

#[async_trait::async_trait]
impl Backend for BatchBackend {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    async fn submit(&self, job: &Job, serializer: Option<&dyn Serializer>) -> Result<StartedJob> {
        let serializer = require_serializer(IDENTIFIER, serializer)?;
        let token = serializer.serialize(job).await?;
        let command = ExecuteCommand::new(serializer.identifier(), token).command_line(&self.program);

        let batch_job_id = self
            .client
            .submit_job(SubmitJobRequest {
                job_name: job.id.to_string(),
                job_queue: self.queue_name.clone(),
                job_definition: self.job_definition.clone(),
                command,
            })
            .await
            .map_err(|e| Error::submission(IDENTIFIER, e))?;

        tracing::info!(
            "Job {} submitted to queue {} as {}",
            job.id,
            self.queue_name,
            batch_job_id
        );

        Ok(StartedJob::new(IDENTIFIER, job, batch_job_id))
    }

    async fn purge(&self) -> Result<usize> {
        let mut terminated = 0;

        for status in ACTIVE_STATUSES {
            let mut next_token = None;
            loop {
                let page = self
                    .client
                    .list_jobs(&self.queue_name, status, next_token.take())
                    .await
                    .map_err(|e| Error::submission(IDENTIFIER, e))?;

                for summary in &page.jobs {
                    tracing::info!("Terminating {} ({}) [{}]", summary.job_id, summary.job_name, status);
                    self.client
                        .terminate_job(&summary.job_id, PURGE_REASON)
                        .await
                        .map_err(|e| Error::submission(IDENTIFIER, e))?;
                    terminated += 1;
                }

                match page.next_token {
                    Some(token) if !token.is_empty() => next_token = Some(token),
                    _ => break,
                }
            }
        }

        Ok(terminated)
    }
}

/// The client used when none was passed to [`crate::Config`]. The optional
/// `region` option overrides the SDK's region lookup.
pub(crate) fn default_client(options: &Options, settings: &Settings) -> Result<Arc<dyn BatchClient>> {
    #[cfg(feature = "batch")]
    {
        let region = settings.resolve_optional(options, OPTION_PREFIX, "region")?;
        Ok(Arc::new(super::AwsBatch::new(region)))
    }

    #[cfg(not(feature = "batch"))]
    {
        let _ = (options, settings);
        Err(Error::Configuration(format!(
            "backend `{}` needs a batch client: enable the `batch` feature or pass one to the config",
            IDENTIFIER
        )))
    }
}
