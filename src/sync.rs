//! Batch synchronization of linked artists with their platform profiles.

// crates.io
use futures::stream::{self, StreamExt};
// self
use crate::{
	_prelude::*,
	api::ArtistApiClient,
	artist::{Artist, ArtistRepository},
	auth::ArtistId,
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Step at which a single artist failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncStage {
	/// Platform lookup.
	Fetch,
	/// Repository write.
	Update,
}
impl SyncStage {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SyncStage::Fetch => "fetch",
			SyncStage::Update => "update",
		}
	}
}

/// One artist that could not be synchronized.
#[derive(Debug)]
pub struct SyncFailure {
	/// Artist that failed.
	pub artist_id: ArtistId,
	/// Step that failed.
	pub stage: SyncStage,
	/// Underlying error.
	pub error: Error,
}

/// Summary of a sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
	/// Artists attempted; every listed artist is attempted exactly once.
	pub attempted: usize,
	/// Artists fetched, merged, and persisted.
	pub succeeded: usize,
	/// Artists that failed, in completion order.
	pub failures: Vec<SyncFailure>,
}
impl SyncReport {
	/// Number of failed artists.
	pub fn failed(&self) -> usize {
		self.failures.len()
	}

	/// Returns `true` when every attempted artist succeeded.
	pub fn is_complete(&self) -> bool {
		self.failures.is_empty()
	}
}

/// Pulls platform profiles for every linked artist and persists the merged result.
#[derive(Clone)]
pub struct SyncOrchestrator {
	client: ArtistApiClient,
	repository: Arc<dyn ArtistRepository>,
	concurrency: usize,
}
impl SyncOrchestrator {
	/// Creates an orchestrator that processes artists one at a time.
	pub fn new(client: ArtistApiClient, repository: Arc<dyn ArtistRepository>) -> Self {
		Self { client, repository, concurrency: 1 }
	}

	/// Allows up to `concurrency` artists in flight at once.
	pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, ConfigError> {
		if concurrency == 0 {
			return Err(ConfigError::ZeroConcurrency);
		}

		self.concurrency = concurrency;

		Ok(self)
	}

	/// Maximum number of artists in flight.
	pub fn concurrency(&self) -> usize {
		self.concurrency
	}

	/// Runs one pass over the linked artists.
	///
	/// Per-artist failures are logged and collected in the report; only a failure to list the
	/// artists fails the run.
	pub async fn run(&self) -> Result<SyncReport> {
		const KIND: FlowKind = FlowKind::Sync;

		let span = FlowSpan::new(KIND, "run");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let artists =
					self.repository.find_all_with_external_permalink().await.map_err(|e| {
						tracing::error!(error = %e, "failed to list linked artists");

						Error::from(e)
					})?;
				let mut report = SyncReport { attempted: artists.len(), ..Default::default() };
				let mut outcomes = stream::iter(artists)
					.map(|artist| self.sync_one(artist))
					.buffer_unordered(self.concurrency);

				while let Some(outcome) = outcomes.next().await {
					match outcome {
						Ok(_) => report.succeeded += 1,
						Err(failure) => report.failures.push(failure),
					}
				}

				tracing::info!(
					attempted = report.attempted,
					succeeded = report.succeeded,
					failed = report.failed(),
					"artist sync finished"
				);

				Ok(report)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn sync_one(&self, mut artist: Artist) -> Result<Artist, SyncFailure> {
		let fetched = match artist.permalink() {
			Some(permalink) => self.client.fetch_by_permalink(permalink).await,
			None => Err(Error::NotFound { resource: format!("permalink of artist {}", artist.id) }),
		};
		let snapshot = match fetched {
			Ok(snapshot) => snapshot,
			Err(error) => return Err(Self::failure(&artist, SyncStage::Fetch, error)),
		};

		artist.merge_external(snapshot);

		let artist_id = artist.id.clone();
		let name = artist.name.clone();

		match self.repository.update(artist).await {
			Ok(updated) => {
				tracing::debug!(artist_id = %updated.id, "artist synchronized");

				Ok(updated)
			},
			Err(e) => {
				tracing::warn!(
					artist_id = %artist_id,
					artist = %name,
					stage = SyncStage::Update.as_str(),
					error = %e,
					"failed to persist synchronized artist"
				);

				Err(SyncFailure { artist_id, stage: SyncStage::Update, error: e.into() })
			},
		}
	}

	fn failure(artist: &Artist, stage: SyncStage, error: Error) -> SyncFailure {
		tracing::warn!(
			artist_id = %artist.id,
			artist = %artist.name,
			stage = stage.as_str(),
			kind = error.kind(),
			error = %error,
			"failed to synchronize artist"
		);

		SyncFailure { artist_id: artist.id.clone(), stage, error }
	}
}
impl Debug for SyncOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SyncOrchestrator")
			.field("client", &self.client)
			.field("concurrency", &self.concurrency)
			.finish()
	}
}
