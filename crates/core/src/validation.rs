//! Validate-or-fail utility used at every boundary crossing.
//!
//! Contracts are JSON Schemas. A value is first checked against the schema
//! (collecting every violation) and only then deserialized into its type.

use crate::error::{GatewayError, GatewayResult};
use crate::metadata::CallMetadata;
use jsonschema::Validator;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A type whose instances are only produced from schema-checked data.
pub trait Contract: DeserializeOwned {
    /// Name used in failure messages, e.g. "issue".
    const NAME: &'static str;

    fn validator() -> &'static Validator;
}

/// Compile a JSON Schema into a reusable validator.
pub fn compile(schema: &Value) -> Result<Validator, String> {
    jsonschema::validator_for(schema).map_err(|e| format!("invalid schema: {}", e))
}

/// Every violation of `validator` by `value`, as `path: reason`.
pub fn issues(validator: &Validator, value: &Value) -> Vec<String> {
    validator
        .iter_errors(value)
        .map(|err| {
            let path = err.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            format!("{}: {}", path, err)
        })
        .collect()
}

/// Check `value` against `validator` and deserialize it.
pub fn validate<T: DeserializeOwned>(
    validator: &Validator,
    value: Value,
    subject: &str,
    metadata: &CallMetadata,
) -> GatewayResult<T> {
    let found = issues(validator, &value);
    if !found.is_empty() {
        return Err(GatewayError::schema(
            format!("{} does not match its contract ({} issue(s))", subject, found.len()),
            found,
            metadata,
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        GatewayError::schema(
            format!("{} could not be decoded", subject),
            vec![format!("/: {}", e)],
            metadata,
        )
    })
}

/// Validate `value` against the contract of `T`.
pub fn validate_as<T: Contract>(value: Value, metadata: &CallMetadata) -> GatewayResult<T> {
    validate(T::validator(), value, T::NAME, metadata)
}
