use super::Backend;
use crate::{
    models::{Job, StartedJob},
    serializer::Serializer,
    Dispatcher, Error, Result,
};
use std::thread::ThreadId;

pub const IDENTIFIER: &str = "thread";

/// Runs the registered function on a new thread of this process.
///
/// Nothing crosses a process boundary, so no serializer is involved. The
/// thread is detached: no join, no result.
pub struct ThreadBackend {
    dispatcher: Dispatcher,
}

impl ThreadBackend {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

/// Numeric form of a thread id, e.g. `7` for `ThreadId(7)`.
///
/// `ThreadId` exposes no stable numeric accessor, so this reads its `Debug`
/// output. Should that format change, the whole `Debug` text is returned
/// instead, which is still unique per thread.
pub fn thread_ident(id: ThreadId) -> String {
    let debug = format!("{:?}", id);
    match debug
        .strip_prefix("ThreadId(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(number) => number.to_string(),
        None => debug,
    }
}

#[async_trait::async_trait]
impl Backend for ThreadBackend {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn requires_serializer(&self) -> bool {
        false
    }

    async fn submit(&self, job: &Job, _serializer: Option<&dyn Serializer>) -> Result<StartedJob> {
        let function = self.dispatcher.resolve_function(&job.func)?;
        let dispatcher = self.dispatcher.clone();
        let thread_job = job.clone();

        let handle = std::thread::Builder::new()
            .name(format!("packmule-{}", job.id))
            .spawn(move || {
                let arguments = thread_job.arguments();
                match function(&arguments) {
                    Ok(_) => dispatcher.record_execution(&thread_job),
                    Err(e) => tracing::error!("Job {} ({}) failed: {:?}", thread_job.id, thread_job.func, e),
                }
            })
            .map_err(|e| Error::submission(IDENTIFIER, e))?;

        let ident = thread_ident(handle.thread().id());
        tracing::debug!("Job {} started on thread {}", job.id, ident);

        Ok(StartedJob::new(IDENTIFIER, job, ident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_ident_is_numeric_and_distinct() {
        let here = thread_ident(std::thread::current().id());
        let there = std::thread::spawn(|| thread_ident(std::thread::current().id()))
            .join()
            .unwrap();

        assert!(here.parse::<u64>().is_ok(), "{}", here);
        assert_ne!(here, there);
    }
}
