use crate::{Error, Result, UtcDateTime};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobId(uuid::Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        uuid::Uuid::parse_str(s)
            .map(JobId)
            .map_err(|e| Error::Serialization(format!("invalid job id `{}`: {}", s, e)))
    }
}

/// The captured intent to call `func` with `args` and `kwargs`.
///
/// This is also the JSON wire format of the default serializer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub id: JobId,
    pub func: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl Job {
    pub fn new(func: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: JobId::new(),
            func: func.into(),
            args: arguments.args,
            kwargs: arguments.kwargs,
        }
    }

    pub fn arguments(&self) -> Arguments {
        Arguments {
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

/// Record of a job handed over to a backend.
#[derive(Clone, Debug)]
pub struct StartedJob {
    /// Registry key of the backend that accepted the job.
    pub backend: String,
    pub job: Job,
    /// Identifier assigned by the backend: batch job id, pid, container id,
    /// thread id, or a generated id for in-process execution.
    pub backend_job_id: String,
    pub submitted_at: UtcDateTime,
}

impl StartedJob {
    pub(crate) fn new(backend: &str, job: &Job, backend_job_id: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            job: job.clone(),
            backend_job_id: backend_job_id.into(),
            submitted_at: chrono::Utc::now(),
        }
    }
}

/// Positional and keyword arguments of a job call.
///
/// Values are converted to JSON when captured, so anything that serializes
/// with serde can be passed (`chrono` dates end up as ISO-8601 strings).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    args: Vec<Value>,
    kwargs: Map<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Serialize) -> Result<Self> {
        self.args.push(to_value(value)?);
        Ok(self)
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self> {
        self.kwargs.insert(name.into(), to_value(value)?);
        Ok(self)
    }

    /// Positional plus keyword arguments.
    pub fn len(&self) -> usize {
        self.args.len() + self.kwargs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    /// Positional argument `index` as `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.args.get(index).ok_or_else(|| {
            Error::Serialization(format!(
                "missing positional argument #{} ({} given)",
                index,
                self.args.len()
            ))
        })?;
        from_value(value, &format!("#{}", index))
    }

    /// Keyword argument `name` as `T`.
    pub fn get_kw<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        match self.get_kw_opt(name)? {
            Some(value) => Ok(value),
            None => Err(Error::Serialization(format!(
                "missing keyword argument `{}`",
                name
            ))),
        }
    }

    pub fn get_kw_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.kwargs
            .get(name)
            .map(|value| from_value(value, name))
            .transpose()
    }
}

fn to_value(value: impl Serialize) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::Serialization(format!("argument is not JSON serializable: {}", e)))
}

fn from_value<T: DeserializeOwned>(value: &Value, name: &str) -> Result<T> {
    T::deserialize(value)
        .map_err(|e| Error::Serialization(format!("argument {} has unexpected type: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[test]
    fn keyword_only_arguments_are_counted() {
        let arguments = Arguments::new().kwarg("k", 1).unwrap();

        assert_eq!(1, arguments.len());
        assert!(!arguments.is_empty());
        assert!(Arguments::new().is_empty());
    }

    #[test]
    fn arguments_are_read_back_typed() {
        let when = chrono::Utc.with_ymd_and_hms(2022, 5, 1, 12, 30, 0).unwrap();
        let arguments = Arguments::new()
            .arg(2)
            .unwrap()
            .arg("three")
            .unwrap()
            .kwarg("when", when)
            .unwrap();

        assert_eq!(3, arguments.len());
        assert_eq!(2, arguments.args().len());
        assert_eq!(2, arguments.get::<i64>(0).unwrap());
        assert_eq!("three", arguments.get::<String>(1).unwrap());
        assert_eq!(
            "2022-05-01T12:30:00Z",
            arguments.get_kw::<String>("when").unwrap()
        );
        assert_eq!(when, arguments.get_kw::<UtcDateTime>("when").unwrap());
        assert_eq!(None, arguments.get_kw_opt::<i64>("missing").unwrap());
    }

    #[test]
    fn missing_and_mistyped_arguments_fail() {
        let arguments = Arguments::new().arg("x").unwrap();

        assert!(matches!(arguments.get::<i64>(0), Err(Error::Serialization(_))));
        assert!(matches!(arguments.get::<String>(3), Err(Error::Serialization(_))));
        assert!(matches!(
            arguments.get_kw::<String>("name"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn non_json_values_are_rejected_at_capture() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys");

        let result = Arguments::new().arg(map);

        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn job_ids_are_unique() {
        let a = Job::new("app.add", Arguments::new());
        let b = Job::new("app.add", Arguments::new());

        assert_ne!(a.id, b.id);
    }
}
