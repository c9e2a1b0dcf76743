use lazy_static::lazy_static;
use packmule::{
    cli, serializer::JsonSerializer, serializer::Serializer, Arguments, Config, Dispatcher, Error,
    Job, Settings,
};
use std::sync::Mutex;
use test_case::test_case;

lazy_static! {
    static ref GREETINGS: Mutex<Vec<String>> = Mutex::new(Vec::default());
}

fn greet(args: &Arguments) -> anyhow::Result<()> {
    let name: String = args.get_kw("name")?;
    GREETINGS.lock().unwrap().push(name);
    Ok(())
}

fn worker(strict: bool) -> Dispatcher {
    let settings = Settings::default().with_value("STRICT_MODE", strict.to_string());
    let dispatcher = Dispatcher::new(Config::builder().settings(settings).build()).unwrap();
    dispatcher.register_fn("tests.worker.greet_plain", greet).unwrap();
    dispatcher
        .job("tests.worker.greet", greet)
        .register()
        .unwrap();
    dispatcher
}

async fn token_for(func: &str, name: &str) -> String {
    let job = Job::new(func, Arguments::new().kwarg("name", name).unwrap());
    JsonSerializer::new().serialize(&job).await.unwrap()
}

#[test_case(true; "strict")]
#[test_case(false; "relaxed")]
#[tokio::test]
async fn registered_job_runs_in_any_mode(strict: bool) {
    let name = format!("job-{}", strict);
    let token = token_for("tests.worker.greet", &name).await;

    cli::run(&worker(strict), ["execute-job", "-s", "json", token.as_str()])
        .await
        .unwrap();

    assert!(GREETINGS.lock().unwrap().contains(&name));
}

#[tokio::test]
async fn strict_mode_refuses_plain_functions() {
    let token = token_for("tests.worker.greet_plain", "refused").await;

    let result = cli::run(&worker(true), ["execute-job", token.as_str()]).await;

    assert!(matches!(result, Err(Error::Resolution(_))));
    assert!(!GREETINGS.lock().unwrap().contains(&"refused".to_string()));
}

#[tokio::test]
async fn relaxed_mode_runs_plain_functions() {
    let token = token_for("tests.worker.greet_plain", "plain").await;

    cli::run(&worker(false), ["execute-job", token.as_str()])
        .await
        .unwrap();

    assert!(GREETINGS.lock().unwrap().contains(&"plain".to_string()));
}

#[tokio::test]
async fn unknown_function() {
    let token = token_for("tests.worker.nobody", "x").await;

    let result = worker(false).execute(None, &token).await;

    assert!(matches!(result, Err(Error::Resolution(_))));
}

#[tokio::test]
async fn malformed_token() {
    let result = cli::run(&worker(true), ["execute-job", "--serializer=json", "{not json"]).await;

    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[tokio::test]
async fn executions_are_counted() {
    let dispatcher = worker(true);
    let token = token_for("tests.worker.greet", "counted").await;

    dispatcher.execute(Some("json"), &token).await.unwrap();

    let output = dispatcher.metrics_output().unwrap();
    assert!(
        output.contains("packmule_jobs_executed{func=\"tests.worker.greet\"} 1"),
        "{}",
        output
    );
}
