//! Password-grant credentials and the sources they are loaded from.
//!
//! Credentials are read once at startup through a [`CredentialSource`] and stay immutable for the
//! lifetime of the process. Two sources ship with the crate: [`EnvCredentialSource`] reads
//! `<PREFIX>_CLIENT_ID`, `<PREFIX>_CLIENT_SECRET`, `<PREFIX>_USERNAME`, and `<PREFIX>_PASSWORD`
//! from the environment, and [`JsonFileCredentialSource`] reads an unversioned JSON secrets file.

// std
use std::{fs, path::PathBuf};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	error::ConfigError,
};

/// Client and resource-owner credentials presented to the token endpoint.
#[derive(Clone)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Resource owner username.
	pub username: String,
	/// Resource owner password.
	pub password: TokenSecret,
}
impl Credentials {
	/// Validates and assembles a credential set.
	pub fn new(
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Result<Self, ConfigError> {
		Self::from_parts("inline credentials", RawCredentials {
			client_id: Some(client_id.as_ref().to_owned()),
			client_secret: Some(client_secret.into()),
			username: Some(username.into()),
			password: Some(password.into()),
		})
	}

	fn from_parts(source_name: &str, raw: RawCredentials) -> Result<Self, ConfigError> {
		let require = |field: &'static str, value: Option<String>| {
			value.filter(|v| !v.is_empty()).ok_or_else(|| ConfigError::MissingCredential {
				field,
				source_name: source_name.to_owned(),
			})
		};
		let client_id = ClientId::new(require("client_id", raw.client_id)?)?;
		let client_secret = TokenSecret::new(require("client_secret", raw.client_secret)?);
		let username = require("username", raw.username)?;
		let password = TokenSecret::new(require("password", raw.password)?);

		Ok(Self { client_id, client_secret, username, password })
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[derive(Default, Deserialize)]
struct RawCredentials {
	client_id: Option<String>,
	client_secret: Option<String>,
	username: Option<String>,
	password: Option<String>,
}

/// Anything that can produce [`Credentials`] at startup.
pub trait CredentialSource {
	/// Loads the credential set, failing when any field is missing.
	fn load(&self) -> Result<Credentials, ConfigError>;
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads credentials from prefixed environment variables.
#[derive(Clone)]
pub struct EnvCredentialSource {
	prefix: String,
	lookup: EnvLookup,
}
impl EnvCredentialSource {
	/// Prefix used when none is configured.
	pub const DEFAULT_PREFIX: &'static str = "CROWDLAB";

	/// Creates a source reading `<prefix>_CLIENT_ID` and friends from the process environment.
	pub fn new(prefix: impl Into<String>) -> Self {
		Self { prefix: prefix.into(), lookup: Arc::new(|key| std::env::var(key).ok()) }
	}

	/// Replaces the variable lookup, e.g., with a map captured from a secret manager.
	pub fn with_lookup<F>(mut self, lookup: F) -> Self
	where
		F: 'static + Fn(&str) -> Option<String> + Send + Sync,
	{
		self.lookup = Arc::new(lookup);

		self
	}

	fn var(&self, suffix: &str) -> Option<String> {
		(self.lookup)(&format!("{}_{suffix}", self.prefix))
	}
}
impl Default for EnvCredentialSource {
	fn default() -> Self {
		Self::new(Self::DEFAULT_PREFIX)
	}
}
impl Debug for EnvCredentialSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EnvCredentialSource").field("prefix", &self.prefix).finish()
	}
}
impl CredentialSource for EnvCredentialSource {
	fn load(&self) -> Result<Credentials, ConfigError> {
		let raw = RawCredentials {
			client_id: self.var("CLIENT_ID"),
			client_secret: self.var("CLIENT_SECRET"),
			username: self.var("USERNAME"),
			password: self.var("PASSWORD"),
		};

		Credentials::from_parts(&format!("environment ({}_*)", self.prefix), raw)
	}
}

/// Reads credentials from a JSON secrets file kept out of version control.
///
/// The file holds a single object with `client_id`, `client_secret`, `username`, and `password`
/// string fields; unknown fields are ignored.
#[derive(Clone, Debug)]
pub struct JsonFileCredentialSource {
	path: PathBuf,
}
impl JsonFileCredentialSource {
	/// Creates a source for the provided path. The file is read on [`CredentialSource::load`].
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}
impl CredentialSource for JsonFileCredentialSource {
	fn load(&self) -> Result<Credentials, ConfigError> {
		let display = self.path.display().to_string();
		let bytes = fs::read(&self.path)
			.map_err(|source| ConfigError::CredentialFileRead { path: display.clone(), source })?;
		let mut de = serde_json::Deserializer::from_slice(&bytes);
		let raw: RawCredentials = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::CredentialFileParse { path: display.clone(), source })?;

		Credentials::from_parts(&display, raw)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{collections::HashMap, env, process};
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"crowdlab_fetch_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn env_source_reads_prefixed_variables() {
		let vars = HashMap::from([
			("APP_CLIENT_ID".to_owned(), "client-1".to_owned()),
			("APP_CLIENT_SECRET".to_owned(), "secret-1".to_owned()),
			("APP_USERNAME".to_owned(), "agent@crowdlab.test".to_owned()),
			("APP_PASSWORD".to_owned(), "pw".to_owned()),
		]);
		let source = EnvCredentialSource::new("APP").with_lookup(move |key| vars.get(key).cloned());
		let credentials = source.load().expect("Environment credentials should load.");

		assert_eq!(credentials.client_id.as_ref(), "client-1");
		assert_eq!(credentials.client_secret.expose(), "secret-1");
		assert_eq!(credentials.username, "agent@crowdlab.test");
		assert_eq!(credentials.password.expose(), "pw");
	}

	#[test]
	fn env_source_reports_first_missing_field() {
		let source = EnvCredentialSource::default().with_lookup(|key| {
			(key == "CROWDLAB_CLIENT_ID").then(|| "client".to_owned())
		});
		let err = source.load().expect_err("Missing secret must fail.");

		assert!(matches!(err, ConfigError::MissingCredential { field: "client_secret", .. }));
	}

	#[test]
	fn file_source_loads_and_validates() {
		let path = temp_path("credentials");

		fs::write(
			&path,
			r#"{"client_id":"cid","client_secret":"cs","username":"u","password":"p","extra":1}"#,
		)
		.expect("Failed to write credential fixture.");

		let credentials =
			JsonFileCredentialSource::new(&path).load().expect("File credentials should load.");

		assert_eq!(credentials.client_id.as_ref(), "cid");

		fs::write(&path, r#"{"client_id":"cid","client_secret":"","username":"u"}"#)
			.expect("Failed to rewrite credential fixture.");

		let err = JsonFileCredentialSource::new(&path)
			.load()
			.expect_err("Empty secret must be rejected.");

		assert!(matches!(err, ConfigError::MissingCredential { field: "client_secret", .. }));

		fs::write(&path, r#"{"client_id":42}"#).expect("Failed to rewrite credential fixture.");

		let err = JsonFileCredentialSource::new(&path)
			.load()
			.expect_err("Wrong field types must be rejected.");

		match err {
			ConfigError::CredentialFileParse { source, .. } =>
				assert_eq!(source.path().to_string(), "client_id"),
			other => panic!("Unexpected error: {other:?}."),
		}

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove credential fixture {}: {e}", path.display())
		});
	}

	#[test]
	fn missing_file_is_a_read_error() {
		let err = JsonFileCredentialSource::new(temp_path("absent"))
			.load()
			.expect_err("Absent file must fail.");

		assert!(matches!(err, ConfigError::CredentialFileRead { .. }));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let credentials = Credentials::new("cid", "client-secret", "user", "pass-word")
			.expect("Inline credentials should be valid.");
		let rendered = format!("{credentials:?}");

		assert!(!rendered.contains("client-secret"));
		assert!(!rendered.contains("pass-word"));
		assert!(rendered.contains("user"));
	}
}
