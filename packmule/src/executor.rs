use crate::{config::Options, models::Job, Dispatcher, Error, Result};

impl Dispatcher {
    /// Worker side of a submission: decodes `token` with the serializer
    /// registered under `serializer` (or the default one) and runs the job.
    pub async fn execute(&self, serializer: Option<&str>, token: &str) -> Result<Job> {
        self.bootstrap().await?;

        let serializer = self.serializer(serializer, &Options::new())?;
        let job = serializer.unserialize(token).await?;

        self.execute_job(&job)?;

        if let Err(e) = serializer.cleanup(&job).await {
            tracing::warn!("Unable to clean up the payload of job {}: {}", job.id, e);
        }

        Ok(job)
    }

    /// Runs the function `job.func` points at with the job's arguments.
    pub fn execute_job(&self, job: &Job) -> Result<()> {
        let function = self.resolve_function(&job.func)?;

        tracing::info!("Executing job {} ({})", job.id, job.func);
        function(&job.arguments()).map_err(|source| Error::Job {
            func: job.func.clone(),
            source,
        })?;
        self.record_execution(job);

        Ok(())
    }

    async fn bootstrap(&self) -> Result<()> {
        self.bootstrapped()
            .get_or_try_init(|| async {
                if let Some(key) = self.settings().bootstrap_callback()? {
                    let callback = self.registry().bootstrap(&key)?;
                    tracing::debug!("Running bootstrap callback {}", key);
                    callback().map_err(|e| {
                        Error::Configuration(format!("bootstrap callback `{}` failed: {}", key, e))
                    })?;
                }
                Ok::<(), Error>(())
            })
            .await?;

        Ok(())
    }
}
