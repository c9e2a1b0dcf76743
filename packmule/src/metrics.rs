use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub(crate) struct Metrics {
    registry: Registry,
    pub jobs_submitted: IntCounterVec,
    pub jobs_submit_failed: IntCounterVec,
    pub jobs_executed: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let a = counter(&registry, "packmule_jobs_submitted", "total jobs submitted", "backend")?;
        let b = counter(
            &registry,
            "packmule_jobs_submit_failed",
            "total jobs a backend failed to submit",
            "backend",
        )?;
        let c = counter(&registry, "packmule_jobs_executed", "total jobs executed", "func")?;

        Ok(Metrics {
            registry,
            jobs_submitted: a,
            jobs_submit_failed: b,
            jobs_executed: c,
        })
    }

    pub fn output(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

fn counter(registry: &Registry, name: &str, help: &str, label: &str) -> anyhow::Result<IntCounterVec> {
    let counter = IntCounterVec::new(Opts::new(name, help), &[label])?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}
