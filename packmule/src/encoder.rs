use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

pub fn encode(input: impl Serialize) -> Result<String> {
    serde_json::to_string(&input).map_err(|e| Error::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input).map_err(|e| Error::Serialization(e.to_string()))
}
