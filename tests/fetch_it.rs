// crates.io
use httpmock::prelude::*;
// self
use crowdlab_fetch::{
	_preludet::*,
	auth::BearerToken,
	config::FetcherConfig,
	error::IssuanceError,
	fetch::RequestOptions,
	issuer::oauth2::http::{HeaderName, HeaderValue, Method as HttpMethod},
	store::{MemoryStore, StoreFuture, TokenStore},
};

const TOKEN_BODY: &str = "{\"access_token\":\"fresh-token\",\"token_type\":\"bearer\"}";

fn build_config(server: &MockServer) -> FetcherConfig {
	FetcherConfig::builder(server.url("/api/"))
		.build()
		.expect("Fetcher config should build for the mock server.")
}

/// Wraps a [`MemoryStore`] and counts `clear` calls.
#[derive(Clone, Default)]
struct CountingStore {
	inner: MemoryStore,
	clears: Arc<Mutex<usize>>,
}
impl CountingStore {
	fn clears(&self) -> usize {
		*self.clears.lock()
	}
}
impl TokenStore for CountingStore {
	fn load(&self) -> StoreFuture<'_, Option<BearerToken>> {
		self.inner.load()
	}

	fn save(&self, token: BearerToken) -> StoreFuture<'_, BearerToken> {
		self.inner.save(token)
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		*self.clears.lock() += 1;

		self.inner.clear()
	}
}

#[tokio::test]
async fn empty_store_issues_token_once_and_caches_it() {
	let server = MockServer::start_async().await;
	let (fetcher, store) = build_reqwest_test_fetcher(build_config(&server));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/oauth/token")
				.body_includes("grant_type=password")
				.body_includes("username=agent%40crowdlab.test")
				.body_includes("password=hunter2")
				.body_includes("client_id=test-client")
				.body_includes("client_secret=test-secret");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let agency_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/agencies/1")
				.header("authorization", "Bearer fresh-token")
				.header("x-crowdlab-tenant", "crowdlab");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"agency\":{\"id\":1,\"name\":\"Acme\"}}");
		})
		.await;
	let first = fetcher.get("agencies/1").await.expect("First fetch should succeed.");
	let second = fetcher.get("/agencies/1").await.expect("Second fetch should succeed.");

	assert_eq!(first.body, serde_json::json!({ "id": 1, "name": "Acme" }));
	assert_eq!(second.body, first.body);
	assert_eq!(first.status.as_u16(), 200);
	assert_eq!(first.status_text, "OK");
	assert_eq!(first.headers["content-type"], "application/json");

	token_mock.assert_calls_async(1).await;
	agency_mock.assert_calls_async(2).await;

	let cached = store
		.load()
		.await
		.expect("Loading the cached token should succeed.")
		.expect("Issued token should be cached.");

	assert_eq!(cached.access_token.expose(), "fresh-token");
	assert_eq!(fetcher.metrics.issuances(), 1);
	assert_eq!(fetcher.metrics.successes(), 2);
}

#[tokio::test]
async fn cached_token_skips_issuance() {
	let server = MockServer::start_async().await;
	let (fetcher, store) = build_reqwest_test_fetcher(build_config(&server));

	store.save(BearerToken::new("cached-token")).await.expect("Seeding the store should succeed.");

	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let clients_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/agencies/1/clients")
				.header("authorization", "Bearer cached-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"clients\":[{\"id\":7,\"name\":\"Globex\"}]}");
		})
		.await;
	let response = fetcher.get("agencies/1/clients").await.expect("Fetch should succeed.");

	assert_eq!(response.body, serde_json::json!([{ "id": 7, "name": "Globex" }]));

	token_mock.assert_calls_async(0).await;
	clients_mock.assert_async().await;
}

#[tokio::test]
async fn rejected_token_is_cleared_once_and_request_replayed() {
	let server = MockServer::start_async().await;
	let store = CountingStore::default();

	store.save(BearerToken::new("stale-token")).await.expect("Seeding the store should succeed.");

	let fetcher =
		build_reqwest_test_fetcher_with_store(build_config(&server), Arc::new(store.clone()));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let stale_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1").header("authorization", "Bearer stale-token");
			then.status(401);
		})
		.await;
	let fresh_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1").header("authorization", "Bearer fresh-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"agency\":{\"id\":1,\"name\":\"Acme\"}}");
		})
		.await;
	let response = fetcher.get("agencies/1").await.expect("Replayed fetch should succeed.");

	assert_eq!(response.body["name"], "Acme");
	assert_eq!(store.clears(), 1);
	assert_eq!(fetcher.metrics.retries(), 1);

	token_mock.assert_calls_async(1).await;
	stale_mock.assert_calls_async(1).await;
	fresh_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn second_unauthorized_response_exhausts_retry() {
	let server = MockServer::start_async().await;
	let (fetcher, store) = build_reqwest_test_fetcher(build_config(&server));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let guarded_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1");
			then.status(401);
		})
		.await;
	let err = fetcher.get("agencies/1").await.expect_err("Second 401 should surface.");

	assert!(matches!(err, Error::UnauthorizedRetryExhausted));
	assert!(err.is_unauthorized());
	assert_eq!(err.status(), Some(401));
	assert!(
		store.load().await.expect("Loading should succeed.").is_none(),
		"Rejected tokens must not stay cached."
	);
	assert_eq!(fetcher.metrics.failures(), 1);

	guarded_mock.assert_calls_async(2).await;
	token_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn other_statuses_fail_without_touching_the_store() {
	let server = MockServer::start_async().await;
	let store = CountingStore::default();

	store.save(BearerToken::new("cached-token")).await.expect("Seeding the store should succeed.");

	let fetcher =
		build_reqwest_test_fetcher_with_store(build_config(&server), Arc::new(store.clone()));
	let guarded_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1");
			then.status(500).body("{\"error\":\"boom\"}");
		})
		.await;
	let err = fetcher.get("agencies/1").await.expect_err("HTTP 500 should surface.");

	assert!(matches!(err, Error::HttpStatus { status: 500 }));
	assert!(!err.is_unauthorized());
	assert_eq!(store.clears(), 0);
	assert!(store.load().await.expect("Loading should succeed.").is_some());

	guarded_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn issuance_rejection_skips_guarded_request() {
	let server = MockServer::start_async().await;
	let (fetcher, store) = build_reqwest_test_fetcher(build_config(&server));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"Bad password\"}");
		})
		.await;
	let guarded_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1");
			then.status(200).body("{\"agency\":{}}");
		})
		.await;
	let err = fetcher.get("agencies/1").await.expect_err("Invalid grant should surface.");

	match &err {
		Error::Issuance(IssuanceError::Rejected { status, error, description }) => {
			assert_eq!(*status, Some(400));
			assert_eq!(error, "invalid_grant");
			assert_eq!(description.as_deref(), Some("Bad password"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(err.is_unauthorized());
	assert!(store.load().await.expect("Loading should succeed.").is_none());

	token_mock.assert_async().await;
	guarded_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn concurrent_fetches_share_one_issuance() {
	let server = MockServer::start_async().await;
	let (fetcher, _store) = build_reqwest_test_fetcher(build_config(&server));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let guarded_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"agency\":{\"id\":1,\"name\":\"Acme\"}}");
		})
		.await;
	let (first, second) = tokio::join!(fetcher.get("agencies/1"), fetcher.get("agencies/1"));

	first.expect("First concurrent fetch should succeed.");
	second.expect("Second concurrent fetch should succeed.");

	token_mock.assert_calls_async(1).await;
	guarded_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn caller_headers_and_body_are_forwarded_on_every_attempt() {
	let server = MockServer::start_async().await;
	let (fetcher, store) = build_reqwest_test_fetcher(build_config(&server));

	store.save(BearerToken::new("stale-token")).await.expect("Seeding the store should succeed.");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;

	let stale_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/agencies")
				.header("authorization", "Bearer stale-token")
				.header("x-request-id", "req-42")
				.body_includes("\"name\":\"Initech\"");
			then.status(401);
		})
		.await;
	let fresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/agencies")
				.header("authorization", "Bearer fresh-token")
				.header("x-crowdlab-tenant", "crowdlab")
				.header("x-request-id", "req-42")
				.header("content-type", "application/json")
				.body_includes("\"name\":\"Initech\"");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"agency\":{\"id\":2,\"name\":\"Initech\"}}");
		})
		.await;
	let options = RequestOptions::new(HttpMethod::POST)
		.header(HeaderName::from_static("x-request-id"), HeaderValue::from_static("req-42"))
		.json(&serde_json::json!({ "agency": { "name": "Initech" } }))
		.expect("Request body should serialize.");
	let response = fetcher.fetch("agencies", options).await.expect("Create should succeed.");

	assert_eq!(response.status.as_u16(), 201);
	assert_eq!(response.status_text, "Created");
	assert_eq!(response.body["id"], 2);

	stale_mock.assert_async().await;
	fresh_mock.assert_async().await;
}

#[tokio::test]
async fn malformed_envelope_is_reported() {
	let server = MockServer::start_async().await;
	let (fetcher, store) = build_reqwest_test_fetcher(build_config(&server));

	store.save(BearerToken::new("cached-token")).await.expect("Seeding the store should succeed.");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":1,\"name\":\"Acme\"}");
		})
		.await;

	let err = fetcher.get("agencies/1").await.expect_err("Two keys break the envelope.");

	assert!(matches!(err, Error::Envelope(_)));
}

#[tokio::test]
async fn camel_case_normalization_applies_to_payload() {
	let server = MockServer::start_async().await;
	let config = FetcherConfig::builder(server.url("/api"))
		.camel_case_fields(true)
		.build()
		.expect("Fetcher config should build.");
	let (fetcher, store) = build_reqwest_test_fetcher(config);

	store.save(BearerToken::new("cached-token")).await.expect("Seeding the store should succeed.");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/agencies/1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"agency\":{\"id\":1,\"created_at\":\"2025-11-10\"}}");
		})
		.await;

	let response = fetcher.get("agencies/1").await.expect("Fetch should succeed.");

	assert_eq!(response.body, serde_json::json!({ "id": 1, "createdAt": "2025-11-10" }));
}

#[tokio::test]
async fn transport_failures_surface_without_retry() {
	let server = MockServer::start_async().await;
	// Nothing listens on the discard port, so the connection is refused.
	let config = FetcherConfig::builder("http://127.0.0.1:9/api/")
		.token_path(server.url("/api/oauth/token"))
		.build()
		.expect("Fetcher config should build.");
	let (fetcher, _store) = build_reqwest_test_fetcher(config);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let err = fetcher.get("agencies/1").await.expect_err("Connection should be refused.");

	assert!(matches!(err, Error::Transport(_)));

	token_mock.assert_calls_async(1).await;
}
