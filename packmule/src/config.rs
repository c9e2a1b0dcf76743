use crate::{
    backend::{BatchClient, ContainerRuntime},
    registry::Registry,
    Error, Result,
};
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};
use typed_builder::TypedBuilder;

pub const DEFAULT_ENV_PREFIX: &str = "PACKMULE_";
pub const DEFAULT_BACKEND: &str = "batch";
pub const DEFAULT_SERIALIZER: &str = "json";

/// Per-job options, keyed `{prefix}_{name}` in lower case.
pub type Options = HashMap<String, Value>;

/// Everything a [`crate::Dispatcher`] is built from.
#[derive(TypedBuilder)]
pub struct Config {
    #[builder(default = Settings::from_env())]
    pub settings: Settings,
    #[builder(default = Registry::with_defaults())]
    pub registry: Registry,
    #[builder(default, setter(strip_option))]
    pub batch_client: Option<Arc<dyn BatchClient>>,
    #[builder(default, setter(strip_option))]
    pub container_runtime: Option<Arc<dyn ContainerRuntime>>,
}

/// The process-wide layer of configuration plus the resolver that puts
/// per-job options in front of it.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Settings {
    #[builder(default = DEFAULT_ENV_PREFIX.to_string(), setter(into))]
    env_prefix: String,
    /// Process-wide values, upper-case keys without the env prefix.
    #[builder(default)]
    values: HashMap<String, String>,
    /// Snapshot of the host environment.
    #[builder(default)]
    host_env: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::builder().build()
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_vars(DEFAULT_ENV_PREFIX, std::env::vars())
    }

    /// Builds settings from `vars`; those starting with `env_prefix` become
    /// process-wide values, all of them are kept as the host environment.
    pub fn from_vars<I, K, V>(env_prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let host_env: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let values = host_env
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(env_prefix)
                    .map(|key| (key.to_uppercase(), v.clone()))
            })
            .collect();

        Self {
            env_prefix: env_prefix.to_string(),
            values,
            host_env,
        }
    }

    pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_uppercase(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn host_env(&self) -> &HashMap<String, String> {
        &self.host_env
    }

    pub fn env_key(&self, prefix: &str, name: &str) -> String {
        format!("{}{}", self.env_prefix, join(prefix, name).to_uppercase())
    }

    /// Resolves `name` for the component `prefix`: per-job option, then the
    /// process-wide value (cast to `T`), then `default`.
    pub fn resolve<T: Setting>(
        &self,
        options: &Options,
        prefix: &str,
        name: &str,
        default: Option<T>,
    ) -> Result<T> {
        match self.resolve_optional(options, prefix, name)? {
            Some(value) => Ok(value),
            None => default.ok_or_else(|| {
                Error::Configuration(format!(
                    "You have to set `{}` in the job options or set the system-wide default with `{}` environment variable",
                    join(prefix, name).to_lowercase(),
                    self.env_key(prefix, name)
                ))
            }),
        }
    }

    pub fn resolve_optional<T: Setting>(
        &self,
        options: &Options,
        prefix: &str,
        name: &str,
    ) -> Result<Option<T>> {
        let key = join(prefix, name);

        if let Some(value) = options.get(&key.to_lowercase()) {
            return T::from_option(value).map(Some).map_err(|e| {
                Error::Configuration(format!(
                    "option `{}` has an invalid value: {}",
                    key.to_lowercase(),
                    e
                ))
            });
        }

        match self.get(&key) {
            Some(raw) => T::parse(raw).map(Some).map_err(|e| {
                Error::Configuration(format!(
                    "`{}` has an invalid value: {}",
                    self.env_key(prefix, name),
                    e
                ))
            }),
            None => Ok(None),
        }
    }

    pub fn backend(&self) -> Result<String> {
        self.resolve(&Options::new(), "", "BACKEND", Some(DEFAULT_BACKEND.to_string()))
    }

    pub fn serializer(&self) -> Result<String> {
        self.resolve(
            &Options::new(),
            "",
            "SERIALIZER",
            Some(DEFAULT_SERIALIZER.to_string()),
        )
    }

    pub fn strict_mode(&self) -> Result<bool> {
        self.resolve(&Options::new(), "", "STRICT_MODE", Some(true))
    }

    pub fn bootstrap_callback(&self) -> Result<Option<String>> {
        self.resolve_optional(&Options::new(), "", "BOOTSTRAP_CALLBACK")
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    }
}

/// A value that can be read from per-job options (already typed JSON) or
/// cast from a process-wide string.
pub trait Setting: Sized {
    fn from_option(value: &Value) -> std::result::Result<Self, String>;
    fn parse(raw: &str) -> std::result::Result<Self, String>;
}

impl Setting for String {
    fn from_option(value: &Value) -> std::result::Result<Self, String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("expected a string, got {}", value))
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl Setting for u64 {
    fn from_option(value: &Value) -> std::result::Result<Self, String> {
        value
            .as_u64()
            .ok_or_else(|| format!("expected a non-negative integer, got {}", value))
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        raw.trim().parse().map_err(|e| format!("{}", e))
    }
}

impl Setting for bool {
    fn from_option(value: &Value) -> std::result::Result<Self, String> {
        value
            .as_bool()
            .ok_or_else(|| format!("expected a boolean, got {}", value))
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(format!("expected a boolean, got `{}`", other)),
        }
    }
}

/// Lists come as a JSON array or as comma-separated text.
impl Setting for Vec<String> {
    fn from_option(value: &Value) -> std::result::Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        let raw = raw.trim();
        if raw.starts_with('[') {
            return serde_json::from_str(raw).map_err(|e| e.to_string());
        }

        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl Setting for HashMap<String, String> {
    fn from_option(value: &Value) -> std::result::Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }
}

impl Setting for Map<String, Value> {
    fn from_option(value: &Value) -> std::result::Result<Self, String> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| format!("expected an object, got {}", value))
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn settings() -> Settings {
        Settings::from_vars(
            "PACKMULE_",
            vec![
                ("PACKMULE_BATCH_QUEUE_NAME", "from-env"),
                ("PACKMULE_STORE_TTL", "120"),
                ("PACKMULE_CONTAINER_AUTO_REMOVE", "false"),
                ("PACKMULE_PROCESS_COMMAND", "cargo, run ,--"),
                ("PACKMULE_CONTAINER_ENVIRONMENT", r#"{"A":"1"}"#),
                ("HOME", "/root"),
            ],
        )
    }

    #[test]
    fn per_job_option_wins_over_process_wide_value() {
        let mut options = Options::new();
        options.insert("batch_queue_name".into(), json!("from-options"));

        let value: String = settings()
            .resolve(&options, "batch", "queue_name", None)
            .unwrap();

        assert_eq!("from-options", value);
    }

    #[test]
    fn process_wide_value_is_used_without_option() {
        let value: String = settings()
            .resolve(&Options::new(), "batch", "queue_name", Some("default".into()))
            .unwrap();

        assert_eq!("from-env", value);
    }

    #[test]
    fn default_is_used_when_nothing_is_set() {
        let value: u64 = settings()
            .resolve(&Options::new(), "store", "cleanup_ttl", Some(600))
            .unwrap();

        assert_eq!(600, value);
    }

    #[test]
    fn missing_value_names_option_and_env_key() {
        let err = settings()
            .resolve::<String>(&Options::new(), "batch", "job_definition", None)
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(message.contains("`batch_job_definition`"), "{}", message);
        assert!(message.contains("`PACKMULE_BATCH_JOB_DEFINITION`"), "{}", message);
    }

    #[test]
    fn process_wide_values_are_cast() {
        let settings = settings();
        let options = Options::new();

        let ttl: u64 = settings.resolve(&options, "store", "ttl", None).unwrap();
        let auto_remove: bool = settings
            .resolve(&options, "container", "auto_remove", Some(true))
            .unwrap();
        let command: Vec<String> = settings.resolve(&options, "process", "command", None).unwrap();
        let env: HashMap<String, String> = settings
            .resolve(&options, "container", "environment", None)
            .unwrap();

        assert_eq!(120, ttl);
        assert!(!auto_remove);
        assert_eq!(vec!["cargo", "run", "--"], command);
        assert_eq!(Some(&"1".to_string()), env.get("A"));
    }

    #[test]
    fn per_job_option_of_wrong_type_is_a_configuration_error() {
        let mut options = Options::new();
        options.insert("store_ttl".into(), json!("soon"));

        let result = settings().resolve::<u64>(&options, "store", "ttl", None);

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test_case("true", true; "lower true")]
    #[test_case("1", true; "one")]
    #[test_case("off", false; "off")]
    #[test_case("False", false; "capital false")]
    fn booleans_are_parsed(raw: &str, expected: bool) {
        assert_eq!(expected, bool::parse(raw).unwrap());
    }

    #[test]
    fn global_defaults() {
        let settings = Settings::default();

        assert_eq!(DEFAULT_BACKEND, settings.backend().unwrap());
        assert_eq!(DEFAULT_SERIALIZER, settings.serializer().unwrap());
        assert!(settings.strict_mode().unwrap());
        assert_eq!(None, settings.bootstrap_callback().unwrap());
    }

    #[test]
    fn host_environment_is_kept() {
        assert_eq!(Some(&"/root".to_string()), settings().host_env().get("HOME"));
        assert_eq!(None, settings().get("HOME"));
    }
}
