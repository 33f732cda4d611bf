use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Free-form task parameters.
///
/// The map stays untyped; handlers own the typing and extract the keys they
/// need through the accessors below, which classify missing or mistyped keys
/// as parameter errors instead of panicking.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` if no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw access to a value, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Extract a required string parameter.
    pub fn get_str(&self, key: &str) -> ModelResult<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ModelError::ParameterType {
                key: key.to_string(),
                expected: "string",
            }),
            None => Err(ModelError::MissingParameter(key.to_string())),
        }
    }

    /// Extract an optional string parameter.
    ///
    /// An absent key is `None`; a present but non-string value is still an
    /// error.
    pub fn get_str_opt(&self, key: &str) -> ModelResult<Option<&str>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ModelError::ParameterType {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Extract a required integer parameter.
    ///
    /// Some parsers surface JSON numbers as floats; integral floats are
    /// accepted here for that reason.
    pub fn get_i64(&self, key: &str) -> ModelResult<i64> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| ModelError::MissingParameter(key.to_string()))?;
        let number = match value {
            Value::Number(n) => n,
            _ => {
                return Err(ModelError::ParameterType {
                    key: key.to_string(),
                    expected: "integer",
                })
            }
        };
        if let Some(i) = number.as_i64() {
            return Ok(i);
        }
        match number.as_f64() {
            Some(f) if f.fract() == 0.0 => Ok(f as i64),
            _ => Err(ModelError::ParameterType {
                key: key.to_string(),
                expected: "integer",
            }),
        }
    }

    /// Extract a required integer parameter that must fit in 32 bits.
    pub fn get_i32(&self, key: &str) -> ModelResult<i32> {
        let wide = self.get_i64(key)?;
        i32::try_from(wide).map_err(|_| ModelError::InvalidParameter {
            key: key.to_string(),
            reason: format!("{wide} does not fit in 32 bits"),
        })
    }

    /// Insert or overwrite a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Iterate through all parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::Parameters;
    use crate::error::ModelError;
    use serde_json::json;

    fn sample() -> Parameters {
        let mut params = Parameters::new();
        params.set("name", "anchor");
        params.set("limit", 5);
        params.set("ratio", 2.5);
        params.set("wide", json!(4.0));
        params
    }

    #[test]
    fn get_str_returns_string_values() {
        let params = sample();
        assert_eq!(params.get_str("name").unwrap(), "anchor");
    }

    #[test]
    fn get_str_classifies_missing_and_mistyped() {
        let params = sample();
        assert!(matches!(
            params.get_str("absent"),
            Err(ModelError::MissingParameter(_))
        ));
        assert!(matches!(
            params.get_str("limit"),
            Err(ModelError::ParameterType { .. })
        ));
    }

    #[test]
    fn get_str_opt_distinguishes_absent_from_mistyped() {
        let params = sample();
        assert_eq!(params.get_str_opt("absent").unwrap(), None);
        assert_eq!(params.get_str_opt("name").unwrap(), Some("anchor"));
        assert!(params.get_str_opt("limit").is_err());
    }

    #[test]
    fn get_i64_accepts_integral_floats() {
        let params = sample();
        assert_eq!(params.get_i64("limit").unwrap(), 5);
        assert_eq!(params.get_i64("wide").unwrap(), 4);
        assert!(matches!(
            params.get_i64("ratio"),
            Err(ModelError::ParameterType { .. })
        ));
    }

    #[test]
    fn get_i32_rejects_out_of_range() {
        let mut params = Parameters::new();
        params.set("big", i64::MAX);
        params.set("small", 3);
        assert_eq!(params.get_i32("small").unwrap(), 3);
        assert!(matches!(
            params.get_i32("big"),
            Err(ModelError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn set_overwrites_existing_values() {
        let mut params = sample();
        params.set("name", "bowline");
        assert_eq!(params.get_str("name").unwrap(), "bowline");
    }

    #[test]
    fn serde_is_transparent() {
        let params = sample();
        let round: Parameters =
            serde_json::from_str(&serde_json::to_string(&params).unwrap()).unwrap();
        assert_eq!(params, round);
    }
}
