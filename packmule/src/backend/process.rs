use super::{require_serializer, Backend};
use crate::{
    commands::ExecuteCommand,
    config::{Options, Settings},
    models::{Job, StartedJob},
    serializer::Serializer,
    Error, Result,
};

pub const IDENTIFIER: &str = "process";
pub const OPTION_PREFIX: &str = "process";

/// Runs the job in a child process of the submitter.
pub struct ProcessBackend {
    program: Vec<String>,
}

impl ProcessBackend {
    pub fn new(options: &Options, settings: &Settings) -> Result<Self> {
        let program = settings.resolve(options, OPTION_PREFIX, "command", Some(super::default_program()))?;
        super::validate_program(IDENTIFIER, &program)?;

        Ok(Self { program })
    }

    /// The full command line the child is started with.
    pub async fn command_line(&self, job: &Job, serializer: &dyn Serializer) -> Result<Vec<String>> {
        let token = serializer.serialize(job).await?;
        Ok(ExecuteCommand::new(serializer.identifier(), token).command_line(&self.program))
    }
}

#[async_trait::async_trait]
impl Backend for ProcessBackend {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    async fn submit(&self, job: &Job, serializer: Option<&dyn Serializer>) -> Result<StartedJob> {
        let serializer = require_serializer(IDENTIFIER, serializer)?;
        let command_line = self.command_line(job, serializer).await?;

        // Not awaited: the child outlives this call and is reaped by tokio.
        let child = tokio::process::Command::new(&command_line[0])
            .args(&command_line[1..])
            .spawn()
            .map_err(|e| Error::submission(IDENTIFIER, e))?;
        let pid = child
            .id()
            .ok_or_else(|| Error::submission(IDENTIFIER, anyhow::anyhow!("child exited before reporting a pid")))?;

        tracing::info!("Job {} started as process {}", job.id, pid);

        Ok(StartedJob::new(IDENTIFIER, job, pid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::{Command, EXECUTE_JOB},
        models::Arguments,
        serializer::JsonSerializer,
    };
    use serde_json::json;

    fn backend(program: &[&str]) -> ProcessBackend {
        let mut options = Options::new();
        options.insert("process_command".into(), json!(program));
        ProcessBackend::new(&options, &Settings::default()).unwrap()
    }

    #[tokio::test]
    async fn command_line_carries_serializer_and_token() {
        let serializer = JsonSerializer::new();
        let job = Job::new(
            "app.add",
            Arguments::new().arg(2).unwrap().kwarg("b", 3).unwrap(),
        );

        let command_line = backend(&["worker"]).command_line(&job, &serializer).await.unwrap();
        let joined = command_line.join(" ");

        assert!(joined.contains(EXECUTE_JOB));
        assert!(joined.contains("--serializer json"));
        match Command::parse(command_line[1..].iter().cloned()).unwrap() {
            Command::ExecuteJob(cmd) => {
                let decoded = serializer.unserialize(&cmd.token).await.unwrap();
                assert_eq!(job.args, decoded.args);
                assert_eq!(job.kwargs, decoded.kwargs);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn submit_returns_child_pid() {
        let job = Job::new("app.add", Arguments::new());

        let started = backend(&["true"])
            .submit(&job, Some(&JsonSerializer::new()))
            .await
            .unwrap();

        let pid: u32 = started.backend_job_id.parse().unwrap();
        assert!(pid > 0);
        assert_eq!(IDENTIFIER, started.backend);
    }

    #[tokio::test]
    async fn missing_program_is_a_submission_error() {
        let job = Job::new("app.add", Arguments::new());

        let result = backend(&["/nonexistent/packmule-worker"])
            .submit(&job, Some(&JsonSerializer::new()))
            .await;

        assert!(matches!(result, Err(Error::Submission { .. })));
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut options = Options::new();
        options.insert("process_command".into(), json!([]));

        assert!(matches!(
            ProcessBackend::new(&options, &Settings::default()),
            Err(Error::Configuration(_))
        ));
    }
}
