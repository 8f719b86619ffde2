use async_trait::async_trait;
use models::recovery::RecoverableAccountInfo;

use super::errors::RecoveryError;

/// Backend lookup against the soft-delete store. Independent of any active
/// session; the caller supplies only an email.
#[async_trait]
pub trait RecoveryEndpoint: Send + Sync {
    async fn check_by_email(&self, email: &str)
        -> Result<RecoverableAccountInfo, RecoveryError>;
}

/// Scriptable endpoint for tests; counts invocations so narrowing rules can
/// be asserted.
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MockRecoveryEndpoint {
        scripted: Mutex<VecDeque<Result<RecoverableAccountInfo, RecoveryError>>>,
        calls: AtomicUsize,
    }

    impl MockRecoveryEndpoint {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_result(&self, result: Result<RecoverableAccountInfo, RecoveryError>) {
            self.scripted.lock().unwrap().push_back(result);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecoveryEndpoint for MockRecoveryEndpoint {
        async fn check_by_email(
            &self,
            _email: &str,
        ) -> Result<RecoverableAccountInfo, RecoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.scripted
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RecoverableAccountInfo::none()))
        }
    }
}
