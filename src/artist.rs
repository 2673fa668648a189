//! Local artist aggregate and the repository contract the sync run persists through.

// std
use std::collections::BTreeMap;
// self
use crate::{
	_prelude::*,
	api::ExternalArtistSnapshot,
	auth::ArtistId,
	store::StoreError,
};

/// Boxed future returned by [`ArtistRepository`] operations.
pub type RepositoryFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Validation failures on the artist aggregate.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ArtistError {
	/// A permalink must be either absent or non-empty.
	#[error("Permalink cannot be an empty string.")]
	EmptyPermalink,
}

/// Local artist record with the fields sourced from the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
	/// Local identifier.
	pub id: ArtistId,
	/// Display name maintained locally.
	pub name: String,
	/// Platform profile URL used as the lookup key.
	permalink: Option<String>,
	/// Platform user identifier.
	pub external_id: Option<u64>,
	/// Platform handle.
	pub username: Option<String>,
	/// Platform display name.
	pub full_name: Option<String>,
	/// Platform given name.
	pub first_name: Option<String>,
	/// Platform family name.
	pub last_name: Option<String>,
	/// Platform avatar URL.
	pub avatar_url: Option<String>,
	/// Platform city.
	pub city: Option<String>,
	/// Platform country.
	pub country: Option<String>,
	/// Platform profile description.
	pub description: Option<String>,
}
impl Artist {
	/// Creates an artist with no platform data.
	pub fn new(id: ArtistId, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			permalink: None,
			external_id: None,
			username: None,
			full_name: None,
			first_name: None,
			last_name: None,
			avatar_url: None,
			city: None,
			country: None,
			description: None,
		}
	}

	/// Builder-style variant of [`Artist::set_permalink`].
	pub fn with_permalink(mut self, permalink: impl Into<String>) -> Result<Self, ArtistError> {
		self.set_permalink(Some(permalink.into()))?;

		Ok(self)
	}

	/// Platform profile URL, if linked.
	pub fn permalink(&self) -> Option<&str> {
		self.permalink.as_deref()
	}

	/// Links or unlinks the platform profile; an empty string is rejected.
	pub fn set_permalink(&mut self, permalink: Option<String>) -> Result<(), ArtistError> {
		if permalink.as_deref().is_some_and(str::is_empty) {
			return Err(ArtistError::EmptyPermalink);
		}

		self.permalink = permalink;

		Ok(())
	}

	/// Overwrites every platform-sourced field with the snapshot's values.
	///
	/// Absent snapshot fields clear the local value. The local permalink is kept because it is
	/// the lookup key, while the snapshot only carries the platform slug.
	pub fn merge_external(&mut self, snapshot: ExternalArtistSnapshot) {
		self.external_id = Some(snapshot.external_id);
		self.username = snapshot.username;
		self.full_name = snapshot.full_name;
		self.first_name = snapshot.first_name;
		self.last_name = snapshot.last_name;
		self.avatar_url = snapshot.avatar_url;
		self.city = snapshot.city;
		self.country = snapshot.country;
		self.description = snapshot.description;
	}
}

/// Persistence contract for artists consumed by the sync run.
pub trait ArtistRepository
where
	Self: Send + Sync,
{
	/// Lists every artist carrying a non-empty platform permalink.
	fn find_all_with_external_permalink(&self) -> RepositoryFuture<'_, Vec<Artist>>;

	/// Replaces the stored artist with the same identifier and returns it.
	fn update(&self, artist: Artist) -> RepositoryFuture<'_, Artist>;
}

/// In-memory [`ArtistRepository`] keyed by artist identifier.
#[derive(Clone, Debug, Default)]
pub struct MemoryArtistRepository(Arc<RwLock<BTreeMap<ArtistId, Artist>>>);
impl MemoryArtistRepository {
	/// Inserts or replaces an artist outside of the sync contract.
	pub fn insert(&self, artist: Artist) {
		self.0.write().insert(artist.id.clone(), artist);
	}

	/// Returns a copy of the stored artist.
	pub fn get(&self, id: &str) -> Option<Artist> {
		self.0.read().get(id).cloned()
	}

	/// Number of stored artists.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no artist is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl ArtistRepository for MemoryArtistRepository {
	fn find_all_with_external_permalink(&self) -> RepositoryFuture<'_, Vec<Artist>> {
		Box::pin(async move {
			Ok(self
				.0
				.read()
				.values()
				.filter(|artist| artist.permalink().is_some_and(|p| !p.is_empty()))
				.cloned()
				.collect())
		})
	}

	fn update(&self, artist: Artist) -> RepositoryFuture<'_, Artist> {
		Box::pin(async move {
			let mut guard = self.0.write();
			let Some(slot) = guard.get_mut(&artist.id) else {
				return Err(StoreError::Backend { message: format!("Artist {} does not exist", artist.id) });
			};

			*slot = artist.clone();

			Ok(artist)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn artist(id: &str) -> Artist {
		Artist::new(ArtistId::new(id).expect("Artist id fixture should be valid."), id)
	}

	#[test]
	fn empty_permalinks_are_rejected() {
		let mut artist = artist("a-1");

		assert_eq!(artist.set_permalink(Some(String::new())), Err(ArtistError::EmptyPermalink));
		assert!(artist.permalink().is_none());

		artist.set_permalink(Some("https://soundcloud.com/x".into())).expect("URL should be accepted.");
		artist.set_permalink(None).expect("Unlinking should be accepted.");

		assert!(artist.permalink().is_none());
	}

	#[test]
	fn merge_overwrites_external_fields_but_keeps_the_permalink() {
		let mut artist = artist("a-1")
			.with_permalink("https://soundcloud.com/x")
			.expect("Permalink fixture should be valid.");

		artist.city = Some("Paris".into());
		artist.merge_external(ExternalArtistSnapshot {
			external_id: 42,
			username: Some("x".into()),
			permalink: Some("x".into()),
			..Default::default()
		});

		assert_eq!(artist.external_id, Some(42));
		assert_eq!(artist.username.as_deref(), Some("x"));
		assert!(artist.city.is_none());
		assert_eq!(artist.permalink(), Some("https://soundcloud.com/x"));
	}

	#[tokio::test]
	async fn repository_lists_linked_artists_and_updates_known_ones() {
		let repository = MemoryArtistRepository::default();

		repository.insert(artist("a-1").with_permalink("https://soundcloud.com/one").expect("Valid."));
		repository.insert(artist("a-2"));

		let linked = repository
			.find_all_with_external_permalink()
			.await
			.expect("Listing should succeed.");

		assert_eq!(linked.len(), 1);
		assert_eq!(linked[0].id.as_ref(), "a-1");

		let err = repository.update(artist("missing")).await.expect_err("Unknown ids should fail.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert_eq!(repository.len(), 2);
	}
}
