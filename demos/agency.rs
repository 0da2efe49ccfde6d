//! Loads an agency and its clients through the authenticated fetcher, using a local mock of the
//! Crowdlab backend. The first guarded call is rejected to show the single 401 replay.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use crowdlab_fetch::{
	api::CrowdlabApi,
	auth::{BearerToken, Credentials},
	config::FetcherConfig,
	fetch::ReqwestFetcher,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").body_includes("grant_type=password");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"token_type\":\"bearer\"}");
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer expired-access");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/agencies/1")
				.header("authorization", "Bearer demo-access")
				.header("x-crowdlab-tenant", "crowdlab");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"agency\":{\"id\":1,\"name\":\"Acme Talent\"}}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/agencies/1/clients")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				"{\"clients\":[{\"id\":10,\"name\":\"Globex\"},{\"id\":11,\"name\":\"Initech\"}]}",
			);
		})
		.await;

	let store = Arc::new(MemoryStore::default());

	// Pretend a previous session left a token the backend no longer accepts.
	store.save(BearerToken::new("expired-access")).await?;

	let config = FetcherConfig::builder(server.base_url()).build()?;
	let credentials =
		Credentials::new("demo-client", "demo-secret", "agent@crowdlab.test", "hunter2")?;
	let fetcher = ReqwestFetcher::new(config, credentials, store);
	let api = CrowdlabApi::new(fetcher);
	let agency = api.agency(1).await?;

	println!("Id: {}", agency.id);
	println!("Name: {}", agency.name);
	println!("Clients:");

	for client in &agency.clients {
		println!("  Client Id: {}", client.id);
		println!("  Client Name: {}", client.name);
	}

	println!("Unauthorized retries: {}.", api.fetcher().metrics.retries());

	token_mock.assert_async().await;

	Ok(())
}
