//! Worker entry point. A binary built on this crate forwards its arguments
//! (without the program name) to [`run`].

use crate::{
    commands::{Command, ExecuteCommand},
    config::Options,
    Dispatcher, Result,
};

pub async fn run<I, S>(dispatcher: &Dispatcher, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match Command::parse(args)? {
        Command::ExecuteJob(ExecuteCommand { serializer, token }) => {
            let job = dispatcher.execute(serializer.as_deref(), &token).await?;
            tracing::info!("Job {} ({}) done", job.id, job.func);
        }
        Command::Purge { backend } => {
            let terminated = dispatcher
                .backend(Some(&backend), &Options::new())?
                .purge()
                .await?;
            tracing::info!("Purged {} job(s) from {}", terminated, backend);
        }
    }

    Ok(())
}
