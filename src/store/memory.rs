//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture, TokenStore},
	token::TokenRecord,
};

type Slot = Arc<RwLock<Option<TokenRecord>>>;

/// Storage backend that keeps the record in-process; lost on restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store pre-populated with `record`.
	pub fn with_record(record: TokenRecord) -> Self {
		Self(Arc::new(RwLock::new(Some(record))))
	}

	/// Synchronous snapshot of the stored record.
	pub fn snapshot(&self) -> Option<TokenRecord> {
		self.0.read().clone()
	}

	fn save_now(slot: Slot, record: TokenRecord) -> Result<(), StoreError> {
		*slot.write() = Some(record);

		Ok(())
	}

	fn clear_now(slot: Slot) -> Result<(), StoreError> {
		slot.write().take();

		Ok(())
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::save_now(slot, record) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::clear_now(slot) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn save_load_clear_cycle() {
		let store = MemoryStore::default();

		assert!(store.load().await.expect("Empty load should succeed.").is_none());

		let record = TokenRecord::issued("memory-token", OffsetDateTime::UNIX_EPOCH, 60);

		store.save(record.clone()).await.expect("Save should succeed.");

		let loaded =
			store.load().await.expect("Load should succeed.").expect("Record should be stored.");

		assert_eq!(loaded, record);

		store.clear().await.expect("Clear should succeed.");

		assert!(store.snapshot().is_none());
		store.clear().await.expect("Clearing an empty store should succeed.");
	}

	#[tokio::test]
	async fn save_overwrites_previous_record() {
		let first = TokenRecord::issued("first", OffsetDateTime::UNIX_EPOCH, 60);
		let second = TokenRecord::issued("second", OffsetDateTime::UNIX_EPOCH, 120);
		let store = MemoryStore::with_record(first);

		store.save(second.clone()).await.expect("Overwrite should succeed.");

		assert_eq!(store.snapshot(), Some(second));
	}
}
