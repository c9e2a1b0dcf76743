use super::container::{ContainerRuntime, ContainerSpec};
use anyhow::Context;
use bollard::{
    container::{Config, CreateContainerOptions, StartContainerOptions},
    models::HostConfig,
    Docker,
};
use serde_json::Value;

/// [`ContainerRuntime`] talking to the Docker engine API.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Uses `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Unable to set up the Docker client")?;
        Ok(Self::new(docker))
    }
}

/// Engine API container config for `spec`. Run options are host config
/// fields in the API's naming (`NetworkMode`, `Binds`, ...).
pub(crate) fn container_config(spec: &ContainerSpec) -> anyhow::Result<Config<String>> {
    let mut host_config: HostConfig =
        serde_json::from_value(Value::Object(spec.run_options.clone()))
            .context("Invalid container run options")?;
    host_config.auto_remove = Some(spec.auto_remove);

    Ok(Config {
        image: Some(spec.image.clone()),
        entrypoint: spec.entrypoint.clone(),
        cmd: Some(spec.command.clone()),
        env: Some(
            spec.environment
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect(),
        ),
        host_config: Some(host_config),
        ..Default::default()
    })
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run_detached(&self, spec: ContainerSpec) -> anyhow::Result<String> {
        let config = container_config(&spec)?;

        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .with_context(|| format!("Failed to create a container from '{}'", spec.image))?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .with_context(|| format!("Failed to start container '{}'", created.id))?;

        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn spec(run_options: Map<String, Value>) -> ContainerSpec {
        ContainerSpec {
            image: "img".into(),
            entrypoint: Some(vec!["/bin/sh".into(), "-c".into()]),
            command: vec!["worker".into(), "execute-job".into()],
            environment: [("A".to_string(), "1".to_string())].into_iter().collect(),
            auto_remove: true,
            run_options,
        }
    }

    #[test]
    fn spec_maps_to_engine_config() {
        let mut run_options = Map::new();
        run_options.insert("NetworkMode".into(), json!("host"));
        run_options.insert("Privileged".into(), json!(true));
        run_options.insert("Binds".into(), json!(["/a:/a", "/b:/b"]));

        let config = container_config(&spec(run_options)).unwrap();

        assert_eq!(Some("img".to_string()), config.image);
        assert_eq!(
            Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
            config.entrypoint
        );
        assert_eq!(
            Some(vec!["worker".to_string(), "execute-job".to_string()]),
            config.cmd
        );
        assert_eq!(Some(vec!["A=1".to_string()]), config.env);

        let host = config.host_config.unwrap();
        assert_eq!(Some(true), host.auto_remove);
        assert_eq!(Some("host".to_string()), host.network_mode);
        assert_eq!(Some(true), host.privileged);
        assert_eq!(
            Some(vec!["/a:/a".to_string(), "/b:/b".to_string()]),
            host.binds
        );
    }

    #[test]
    fn malformed_run_options_are_rejected() {
        let mut run_options = Map::new();
        run_options.insert("Privileged".into(), json!("very"));

        assert!(container_config(&spec(run_options)).is_err());
    }
}
