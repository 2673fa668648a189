// crates.io
use httpmock::prelude::*;
// self
use artist_sync::{
	_preludet::*,
	artist::{Artist, ArtistRepository, MemoryArtistRepository, RepositoryFuture},
	auth::ArtistId,
	store::StoreError,
	sync::{SyncOrchestrator, SyncStage},
};

fn linked_artist(id: &str, permalink: &str) -> Artist {
	Artist::new(ArtistId::new(id).expect("Artist id fixture should be valid."), id)
		.with_permalink(permalink)
		.expect("Permalink fixture should be valid.")
}

/// Repository whose updates fail for one artist.
struct FailingUpdates {
	inner: MemoryArtistRepository,
	failing: &'static str,
}
impl ArtistRepository for FailingUpdates {
	fn find_all_with_external_permalink(&self) -> RepositoryFuture<'_, Vec<Artist>> {
		self.inner.find_all_with_external_permalink()
	}

	fn update(&self, artist: Artist) -> RepositoryFuture<'_, Artist> {
		if artist.id.as_ref() == self.failing {
			return Box::pin(async { Err(StoreError::Backend { message: "disk full".into() }) });
		}

		self.inner.update(artist)
	}
}

/// Repository that cannot list artists.
struct BrokenListing;
impl ArtistRepository for BrokenListing {
	fn find_all_with_external_permalink(&self) -> RepositoryFuture<'_, Vec<Artist>> {
		Box::pin(async { Err(StoreError::Backend { message: "connection refused".into() }) })
	}

	fn update(&self, artist: Artist) -> RepositoryFuture<'_, Artist> {
		Box::pin(async move { Ok(artist) })
	}
}

#[tokio::test]
async fn resolved_profiles_are_merged_into_local_artists() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve").query_param("url", "https://soundcloud.com/x");
			then.status(200).header("content-type", "application/json").body(
				r#"{"id":42,"username":"x","full_name":"X Y","avatar_url":"http://a","city":"Berlin","country":"DE","description":"bio"}"#,
			);
		})
		.await;
	let (store, _) = seed_store("access-valid", "refresh-valid", Duration::hours(1)).await;
	let repository = MemoryArtistRepository::default();

	repository.insert(linked_artist("artist-x", "https://soundcloud.com/x"));

	let client =
		mock_api_client(stub_manager(store, Arc::new(StubIssuer::granting(3600))), &server.base_url());
	let report = SyncOrchestrator::new(client, Arc::new(repository.clone()))
		.run()
		.await
		.expect("Sync run should complete.");

	mock.assert_calls_async(1).await;

	assert_eq!(report.attempted, 1);
	assert_eq!(report.succeeded, 1);
	assert!(report.is_complete());

	let artist = repository.get("artist-x").expect("Artist should still be stored.");

	assert_eq!(artist.external_id, Some(42));
	assert_eq!(artist.username.as_deref(), Some("x"));
	assert_eq!(artist.full_name.as_deref(), Some("X Y"));
	assert_eq!(artist.avatar_url.as_deref(), Some("http://a"));
	assert_eq!(artist.city.as_deref(), Some("Berlin"));
	assert_eq!(artist.country.as_deref(), Some("DE"));
	assert_eq!(artist.description.as_deref(), Some("bio"));
	assert_eq!(artist.permalink(), Some("https://soundcloud.com/x"));
}

#[tokio::test]
async fn repeated_401_is_reported_and_the_batch_continues() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve").query_param("url", "https://soundcloud.com/locked");
			then.status(401);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve").query_param("url", "https://soundcloud.com/open");
			then.status(200).header("content-type", "application/json").body(r#"{"id":7,"username":"open"}"#);
		})
		.await;
	// Expired and never refreshed by a scheduler.
	let (store, _) = seed_store("access-expired", "refresh-expired", Duration::minutes(-1)).await;
	let issuer = Arc::new(StubIssuer::granting(3600));
	let repository = MemoryArtistRepository::default();

	repository.insert(linked_artist("a-locked", "https://soundcloud.com/locked"));
	repository.insert(linked_artist("b-open", "https://soundcloud.com/open"));

	let client = mock_api_client(stub_manager(store, issuer.clone()), &server.base_url());
	let report = SyncOrchestrator::new(client, Arc::new(repository.clone()))
		.run()
		.await
		.expect("Per-artist failures should not fail the run.");

	rejected.assert_calls_async(2).await;
	accepted.assert_calls_async(1).await;

	// One lazy refresh for the expired credential, then one forced refresh after the first 401.
	assert_eq!(issuer.refresh_calls(), 2);
	assert_eq!(report.attempted, 2);
	assert_eq!(report.succeeded, 1);
	assert_eq!(report.failed(), 1);

	let failure = &report.failures[0];

	assert_eq!(failure.artist_id.as_ref(), "a-locked");
	assert_eq!(failure.stage, SyncStage::Fetch);
	assert!(matches!(failure.error, Error::Unauthorized));
	assert_eq!(repository.get("b-open").and_then(|artist| artist.external_id), Some(7));
	assert_eq!(repository.get("a-locked").and_then(|artist| artist.external_id), None);
}

#[tokio::test]
async fn not_found_and_update_failures_do_not_abort_the_batch() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve").query_param("url", "https://soundcloud.com/gone");
			then.status(404);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve").query_param("url", "https://soundcloud.com/full");
			then.status(200).header("content-type", "application/json").body(r#"{"id":1}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve").query_param("url", "https://soundcloud.com/fine");
			then.status(200).header("content-type", "application/json").body(r#"{"id":2}"#);
		})
		.await;

	let (store, _) = seed_store("access-valid", "refresh-valid", Duration::hours(1)).await;
	let inner = MemoryArtistRepository::default();

	inner.insert(linked_artist("a-gone", "https://soundcloud.com/gone"));
	inner.insert(linked_artist("b-full", "https://soundcloud.com/full"));
	inner.insert(linked_artist("c-fine", "https://soundcloud.com/fine"));
	inner.insert(Artist::new(ArtistId::new("d-unlinked").expect("Valid id."), "unlinked"));

	let repository = Arc::new(FailingUpdates { inner: inner.clone(), failing: "b-full" });
	let client =
		mock_api_client(stub_manager(store, Arc::new(StubIssuer::granting(3600))), &server.base_url());
	let report = SyncOrchestrator::new(client, repository)
		.with_concurrency(3)
		.expect("Positive concurrency should be accepted.")
		.run()
		.await
		.expect("Per-artist failures should not fail the run.");

	assert_eq!(report.attempted, 3, "Unlinked artists are not part of the input set.");
	assert_eq!(report.succeeded, 1);
	assert_eq!(report.failed(), 2);

	let mut failures = report
		.failures
		.iter()
		.map(|failure| (failure.artist_id.to_string(), failure.stage, failure.error.kind()))
		.collect::<Vec<_>>();

	failures.sort();

	assert_eq!(
		failures,
		vec![
			("a-gone".to_owned(), SyncStage::Fetch, "not_found"),
			("b-full".to_owned(), SyncStage::Update, "storage"),
		]
	);
	assert_eq!(inner.get("c-fine").and_then(|artist| artist.external_id), Some(2));
}

#[tokio::test]
async fn listing_failures_fail_the_run() {
	let (store, _) = seed_store("access-valid", "refresh-valid", Duration::hours(1)).await;
	let client = mock_api_client(
		stub_manager(store, Arc::new(StubIssuer::granting(3600))),
		"http://127.0.0.1:9",
	);
	let err = SyncOrchestrator::new(client, Arc::new(BrokenListing))
		.run()
		.await
		.expect_err("A repository that cannot list artists should fail the run.");

	assert!(err.is_storage());
}
