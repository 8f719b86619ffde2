use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use common::utils::deadline::with_deadline;
use models::recovery::RecoverableAccountInfo;

use super::endpoint::RecoveryEndpoint;
use super::errors::RecoveryError;

/// Normalizes recovery-window results. Nothing here is cached: every answer
/// is only as good as the check that produced it.
pub struct RecoveryChecker {
    endpoint: Arc<dyn RecoveryEndpoint>,
    check_timeout: Duration,
}

impl RecoveryChecker {
    pub fn new(endpoint: Arc<dyn RecoveryEndpoint>, check_timeout: Duration) -> Self {
        Self {
            endpoint,
            check_timeout,
        }
    }

    /// A closed window (`days_remaining == 0`) is reported as no recoverable
    /// account, so downstream never offers a recovery that would fail.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use service::recovery::RecoveryChecker;
    /// use service::recovery::endpoint::mock::MockRecoveryEndpoint;
    /// let endpoint = Arc::new(MockRecoveryEndpoint::new());
    /// let checker = RecoveryChecker::new(endpoint, Duration::from_secs(1));
    /// let info = tokio_test::block_on(checker.check_by_email("a@b.test")).unwrap();
    /// assert!(!info.has_recoverable_account);
    /// ```
    pub async fn check_by_email(
        &self,
        email: &str,
    ) -> Result<RecoverableAccountInfo, RecoveryError> {
        let info = with_deadline(self.check_timeout, self.endpoint.check_by_email(email))
            .await
            .map_err(|_| RecoveryError::Timeout)??;
        if !info.is_recoverable() {
            return Ok(RecoverableAccountInfo::none());
        }
        info!(days_remaining = info.days_remaining, "recoverable account found");
        Ok(info)
    }
}
