//! Registers a couple of jobs. Without arguments it submits them to the
//! configured backend; with arguments it acts as the worker
//! (`packmule-example execute-job --serializer json '<token>'`), so point
//! the backends at it with e.g. `PACKMULE_PROCESS_COMMAND=packmule-example`.

use packmule::{Arguments, Config, Dispatcher, JobHandle};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Serialize, Deserialize, Debug)]
struct Recipient {
    name: String,
    email: String,
}

fn add(args: &Arguments) -> anyhow::Result<()> {
    let a: i64 = args.get(0)?;
    let b: i64 = args.get(1)?;
    tracing::info!("{} + {} = {}", a, b, a + b);
    Ok(())
}

fn send_report(args: &Arguments) -> anyhow::Result<()> {
    let recipient: Recipient = args.get(0)?;
    let day: chrono::NaiveDate = args.get_kw("day")?;
    let draft = args.get_kw_opt::<bool>("draft")?.unwrap_or(false);
    tracing::info!(
        "Sending the {} report to {} <{}> (draft: {})",
        day,
        recipient.name,
        recipient.email,
        draft
    );
    Ok(())
}

struct Jobs {
    add: JobHandle,
    send_report: JobHandle,
}

fn register(dispatcher: &Dispatcher) -> packmule::Result<Jobs> {
    Ok(Jobs {
        add: dispatcher.job("example.add", add).register()?,
        send_report: dispatcher
            .job("example.send_report", send_report)
            .option("container_image", "packmule-example:latest")
            .register()?,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")))
        .init();

    let dispatcher = Dispatcher::new(Config::builder().build())?;
    let jobs = register(&dispatcher)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        packmule::cli::run(&dispatcher, args).await?;
        return Ok(());
    }

    let started = jobs
        .add
        .submit(Arguments::new().arg(2)?.arg(3)?)
        .await?;
    tracing::info!("{} -> {}", started.job.id, started.backend_job_id);

    let recipient = Recipient {
        name: "Ops".to_string(),
        email: "ops@example.com".to_string(),
    };
    let started = jobs
        .send_report
        .submit(
            Arguments::new()
                .arg(recipient)?
                .kwarg("day", chrono::Utc::now().date_naive())?,
        )
        .await?;
    tracing::info!("{} -> {}", started.job.id, started.backend_job_id);

    println!("{}", dispatcher.metrics_output()?);

    Ok(())
}
