use super::batch::{BatchClient, JobPage, JobSummary, SubmitJobRequest};
use aws_sdk_batch::{
    config::Region,
    types::{ContainerOverrides, JobStatus},
    Client,
};
use tokio::sync::OnceCell;

/// [`BatchClient`] on top of the AWS Batch SDK.
///
/// The SDK configuration (credentials, region) is loaded from the
/// environment on first use.
pub struct AwsBatch {
    region: Option<String>,
    client: OnceCell<Client>,
}

impl AwsBatch {
    pub fn new(region: Option<String>) -> Self {
        Self {
            region,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
                if let Some(region) = &self.region {
                    loader = loader.region(Region::new(region.clone()));
                }
                Client::new(&loader.load().await)
            })
            .await
    }
}

#[async_trait::async_trait]
impl BatchClient for AwsBatch {
    async fn submit_job(&self, request: SubmitJobRequest) -> anyhow::Result<String> {
        let output = self
            .client()
            .await
            .submit_job()
            .job_name(request.job_name)
            .job_queue(request.job_queue)
            .job_definition(request.job_definition)
            .container_overrides(
                ContainerOverrides::builder()
                    .set_command(Some(request.command))
                    .build(),
            )
            .send()
            .await?;

        Ok(output.job_id().to_string())
    }

    async fn list_jobs(
        &self,
        queue: &str,
        status: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<JobPage> {
        let output = self
            .client()
            .await
            .list_jobs()
            .job_queue(queue)
            .job_status(JobStatus::from(status))
            .set_next_token(next_token)
            .send()
            .await?;

        Ok(JobPage {
            jobs: output
                .job_summary_list()
                .iter()
                .map(|summary| JobSummary {
                    job_id: summary.job_id().to_string(),
                    job_name: summary.job_name().to_string(),
                })
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn terminate_job(&self, job_id: &str, reason: &str) -> anyhow::Result<()> {
        self.client()
            .await
            .terminate_job()
            .job_id(job_id)
            .reason(reason)
            .send()
            .await?;
        Ok(())
    }
}
