use packmule::{
    backend::{BatchClient, JobPage, SubmitJobRequest},
    Config, Dispatcher, Registry, Settings,
};
use std::{
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

/// Batch client that keeps what it was asked to submit.
#[derive(Default)]
pub struct RecordingBatch {
    pub requests: Mutex<Vec<SubmitJobRequest>>,
}

#[async_trait::async_trait]
impl BatchClient for RecordingBatch {
    async fn submit_job(&self, request: SubmitJobRequest) -> anyhow::Result<String> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        Ok(format!("batch-{}", requests.len()))
    }

    async fn list_jobs(
        &self,
        _queue: &str,
        _status: &str,
        _next_token: Option<String>,
    ) -> anyhow::Result<JobPage> {
        Ok(JobPage::default())
    }

    async fn terminate_job(&self, _job_id: &str, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn settings() -> Settings {
    Settings::default()
        .with_value("BATCH_QUEUE_NAME", "test-queue")
        .with_value("BATCH_JOB_DEFINITION", "test-worker:1")
}

pub fn create_dispatcher(settings: Settings, registry: Registry, batch: Arc<RecordingBatch>) -> Dispatcher {
    Dispatcher::new(
        Config::builder()
            .settings(settings)
            .registry(registry)
            .batch_client(batch)
            .build(),
    )
    .expect("create dispatcher")
}

/// Polls `check` until it holds or a few seconds passed.
pub async fn wait_until(check: impl Fn() -> bool) -> bool {
    let start = SystemTime::now();
    while SystemTime::now().duration_since(start).unwrap() < Duration::from_secs(5) {
        if check() {
            return true;
        }
        sleep_ms(25).await;
    }
    check()
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await
}
