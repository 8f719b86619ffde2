use async_trait::async_trait;
use models::profile::Profile;
use uuid::Uuid;

use super::errors::ProfileError;

/// Read-only access to the profile rows. `Ok(None)` is the expected
/// "row not created yet" outcome, distinct from a failed fetch.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_by_subject(&self, subject_id: Uuid) -> Result<Option<Profile>, ProfileError>;
}

/// Scriptable in-memory store for tests and doc examples.
pub mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MockProfileStore {
        profiles: Mutex<HashMap<Uuid, Profile>>,
        scripted: Mutex<VecDeque<Result<Option<Profile>, ProfileError>>>,
        fetch_calls: AtomicUsize,
    }

    impl MockProfileStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, profile: Profile) {
            self.profiles.lock().unwrap().insert(profile.id, profile);
        }

        /// Queue an outcome consumed before the backing map is consulted.
        pub fn push_fetch_result(&self, result: Result<Option<Profile>, ProfileError>) {
            self.scripted.lock().unwrap().push_back(result);
        }

        pub fn fetch_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileStore for MockProfileStore {
        async fn fetch_by_subject(
            &self,
            subject_id: Uuid,
        ) -> Result<Option<Profile>, ProfileError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(scripted) = self.scripted.lock().unwrap().pop_front() {
                return scripted;
            }
            Ok(self.profiles.lock().unwrap().get(&subject_id).cloned())
        }
    }
}
