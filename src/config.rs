//! Fetcher configuration and its validating builder.

// self
use crate::{_prelude::*, auth::TenantId, error::ConfigError};

/// Header carrying the tenant on every guarded request.
pub const TENANT_HEADER: &str = "x-crowdlab-tenant";

/// Immutable configuration consumed by the fetcher and the token issuer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
	/// Base URL every endpoint path is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Absolute token endpoint URL.
	pub token_url: Url,
	/// Tenant written to the tenant header.
	pub tenant: TenantId,
	/// Rewrites `snake_case` and `kebab-case` payload keys to `camelCase` when set.
	pub camel_case_fields: bool,
}
impl FetcherConfig {
	/// Token endpoint path used when none is configured.
	pub const DEFAULT_TOKEN_PATH: &'static str = "oauth/token";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: impl AsRef<str>) -> FetcherConfigBuilder {
		FetcherConfigBuilder::new(base_url)
	}

	/// Resolves an endpoint against the base URL.
	///
	/// Leading slashes are ignored so `"/agencies/1"` and `"agencies/1"` address the same
	/// resource below the base path. Absolute URLs are returned unchanged.
	pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
		if let Ok(absolute) = Url::parse(endpoint) {
			return Ok(absolute);
		}

		self.base_url.join(endpoint.trim_start_matches('/')).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source }
		})
	}
}

/// Builder for [`FetcherConfig`] values.
#[derive(Debug)]
pub struct FetcherConfigBuilder {
	/// Raw base URL supplied by the caller.
	pub base_url: String,
	/// Token endpoint path or absolute URL.
	pub token_path: String,
	/// Tenant written to the tenant header.
	pub tenant: TenantId,
	/// Enables camelCase key normalization.
	pub camel_case_fields: bool,
}
impl FetcherConfigBuilder {
	/// Creates a builder seeded with the provided base URL and the Crowdlab defaults.
	pub fn new(base_url: impl AsRef<str>) -> Self {
		Self {
			base_url: base_url.as_ref().to_owned(),
			token_path: FetcherConfig::DEFAULT_TOKEN_PATH.to_owned(),
			tenant: TenantId::default(),
			camel_case_fields: false,
		}
	}

	/// Overrides the token endpoint path (relative to the base URL) or absolute URL.
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.token_path = path.into();

		self
	}

	/// Overrides the tenant.
	pub fn tenant(mut self, tenant: TenantId) -> Self {
		self.tenant = tenant;

		self
	}

	/// Enables or disables camelCase key normalization of response payloads.
	pub fn camel_case_fields(mut self, enabled: bool) -> Self {
		self.camel_case_fields = enabled;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<FetcherConfig, ConfigError> {
		let mut base_url =
			Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		base_url.set_query(None);
		base_url.set_fragment(None);

		let mut config = FetcherConfig {
			token_url: base_url.clone(),
			base_url,
			tenant: self.tenant,
			camel_case_fields: self.camel_case_fields,
		};

		config.token_url = config.endpoint_url(&self.token_path)?;

		Ok(config)
	}
}
