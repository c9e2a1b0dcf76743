use super::Backend;
use crate::{
    generate_id,
    models::{Job, StartedJob},
    serializer::Serializer,
    Dispatcher, Result,
};

pub const IDENTIFIER: &str = "immediate";

/// Runs the job right away on the calling task, through the same path the
/// worker uses. Errors of the job surface from `submit`.
pub struct ImmediateBackend {
    dispatcher: Dispatcher,
}

impl ImmediateBackend {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

#[async_trait::async_trait]
impl Backend for ImmediateBackend {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn requires_serializer(&self) -> bool {
        false
    }

    async fn submit(&self, job: &Job, _serializer: Option<&dyn Serializer>) -> Result<StartedJob> {
        self.dispatcher.execute_job(job)?;

        Ok(StartedJob::new(IDENTIFIER, job, generate_id().to_string()))
    }
}
