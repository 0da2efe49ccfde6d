//! Response body normalization.
//!
//! The backend wraps every payload in an object with a single key naming the resource
//! (`{"agency": {...}}`, `{"clients": [...]}`). [`unwrap_single_key`] strips that envelope;
//! [`camel_case_keys`] optionally rewrites the payload's object keys to camelCase.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Violations of the single-key envelope precondition.
#[derive(Debug, ThisError)]
pub enum EnvelopeError {
	/// Body was not valid JSON.
	#[error("Response body is not valid JSON.")]
	InvalidJson(#[source] serde_json::Error),
	/// Body was valid JSON but not an object.
	#[error("Response body must be a JSON object, found {found}.")]
	NotAnObject {
		/// JSON type that was found instead.
		found: &'static str,
	},
	/// Body object did not have exactly one key.
	#[error("Response envelope must have exactly one top-level key, found {keys:?}.")]
	KeyCount {
		/// Keys present in the envelope (empty when the object was empty).
		keys: Vec<String>,
	},
}

/// Parses `body` and returns the value stored under its only top-level key.
pub fn unwrap_single_key(body: &[u8]) -> Result<Value, EnvelopeError> {
	let value = serde_json::from_slice::<Value>(body).map_err(EnvelopeError::InvalidJson)?;

	unwrap_value(value)
}

/// Same as [`unwrap_single_key`] for an already parsed value.
pub fn unwrap_value(value: Value) -> Result<Value, EnvelopeError> {
	let map = match value {
		Value::Object(map) => map,
		other => return Err(EnvelopeError::NotAnObject { found: json_type(&other) }),
	};

	if map.len() != 1 {
		return Err(EnvelopeError::KeyCount { keys: map.keys().cloned().collect() });
	}

	Ok(map.into_iter().next().map(|(_, inner)| inner).unwrap_or(Value::Null))
}

/// Recursively rewrites object keys from `snake_case` or `kebab-case` to `camelCase`.
///
/// Only a separator followed by an ASCII lowercase letter is collapsed, so `client_id` becomes
/// `clientId` while `x_1` and `already_Camel` are left untouched.
pub fn camel_case_keys(value: Value) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(key, inner)| (camel_case(&key), camel_case_keys(inner)))
				.collect::<Map<_, _>>(),
		),
		Value::Array(items) => Value::Array(items.into_iter().map(camel_case_keys).collect()),
		other => other,
	}
}

fn camel_case(key: &str) -> String {
	let mut out = String::with_capacity(key.len());
	let mut chars = key.chars().peekable();

	while let Some(ch) = chars.next() {
		let upper = matches!(ch, '-' | '_')
			.then(|| chars.peek().copied())
			.flatten()
			.filter(char::is_ascii_lowercase);

		match upper {
			Some(next) => {
				out.push(next.to_ascii_uppercase());
				chars.next();
			},
			None => out.push(ch),
		}
	}

	out
}

fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
