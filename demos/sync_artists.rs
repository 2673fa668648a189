//! Runs one artist sync against a mocked platform.
//!
//! 1. Bootstraps a credential through the client-credentials grant.
//! 2. Starts the background refresh scheduler.
//! 3. Resolves every linked artist and merges the profile into the local record. One artist
//!    points at a profile the platform does not know, so the report shows a partial failure.
//! 4. Stops the scheduler.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;
// self
use artist_sync::{
	artist::{Artist, MemoryArtistRepository},
	auth::ArtistId,
	config::SyncConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("artist_sync=info")),
		)
		.init();

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"demo-access","refresh_token":"demo-refresh","expires_in":3600,"scope":"*"}"#,
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/resolve")
				.query_param("url", "https://soundcloud.com/ada")
				.header("authorization", "OAuth demo-access");
			then.status(200).header("content-type", "application/json").body(
				r#"{"id":1001,"username":"ada","full_name":"Ada L","avatar_url":"https://i.example/ada.jpg","city":"London","country":"GB","description":"modular","permalink":"ada"}"#,
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve").query_param("url", "https://soundcloud.com/nobody");
			then.status(404);
		})
		.await;

	let config = SyncConfig::builder("demo-client", "demo-secret")
		.token_endpoint(Url::parse(&server.url("/oauth2/token"))?)
		.api_base(Url::parse(&server.base_url())?)
		.refresh_interval(Duration::minutes(1))
		.build()?;
	let store = config.credential_store()?;
	let manager = config.credential_manager(store)?;
	let credential = manager.bootstrap().await?;

	println!("Credential valid until {}.", credential.access_token_expiry);

	let scheduler = config.scheduler(manager.clone())?.spawn();
	let repository = MemoryArtistRepository::default();

	repository.insert(
		Artist::new(ArtistId::new("artist-ada")?, "Ada").with_permalink("https://soundcloud.com/ada")?,
	);
	repository.insert(
		Artist::new(ArtistId::new("artist-nobody")?, "Nobody")
			.with_permalink("https://soundcloud.com/nobody")?,
	);

	let client = config.api_client(manager)?;
	let report = config.orchestrator(client, Arc::new(repository.clone()))?.run().await?;

	println!(
		"Attempted {}, succeeded {}, failed {}.",
		report.attempted,
		report.succeeded,
		report.failed()
	);

	for failure in &report.failures {
		println!("  {} failed at {}: {}", failure.artist_id, failure.stage.as_str(), failure.error);
	}

	if let Some(ada) = repository.get("artist-ada") {
		println!("Merged profile: {ada:?}");
	}

	scheduler.shutdown().await;
	token_mock.assert_calls_async(1).await;

	Ok(())
}
