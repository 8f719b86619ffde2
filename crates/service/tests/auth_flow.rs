use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use configs::AuthConfig;
use models::profile::{Profile, Tier, UserType};
use models::recovery::RecoverableAccountInfo;
use models::route::Route;
use models::session::{Provider, Session};
use models::state::{AuthStage, ProfileStatus};
use service::orchestrator::AuthOrchestrator;
use service::profile::store::mock::MockProfileStore;
use service::profile::ProfileResolver;
use service::recovery::endpoint::mock::MockRecoveryEndpoint;
use service::recovery::RecoveryChecker;
use service::routing::{self, GuardAction};
use service::session::domain::{OAuthCallbackParams, PersistedSession, SignUpInput};
use service::session::provider::mock::MockIdentityProvider;
use service::session::storage::{MemorySessionStorage, SessionStorage};
use service::session::{SessionError, SessionStore};

struct Harness {
    provider: Arc<MockIdentityProvider>,
    profiles: Arc<MockProfileStore>,
    recovery: Arc<MockRecoveryEndpoint>,
    storage: Arc<MemorySessionStorage>,
    orchestrator: Arc<AuthOrchestrator>,
}

fn fast_cfg() -> AuthConfig {
    AuthConfig {
        profile_retry_base_delay_ms: 5,
        ..AuthConfig::default()
    }
}

fn harness() -> Harness {
    let provider = Arc::new(MockIdentityProvider::new());
    let profiles = Arc::new(MockProfileStore::new());
    let recovery = Arc::new(MockRecoveryEndpoint::new());
    let storage = Arc::new(MemorySessionStorage::new());
    let cfg = fast_cfg();
    let orchestrator = Arc::new(AuthOrchestrator::new(
        SessionStore::new(provider.clone(), storage.clone(), &cfg),
        ProfileResolver::new(profiles.clone(), &cfg),
        RecoveryChecker::new(recovery.clone(), Duration::from_secs(1)),
    ));
    Harness {
        provider,
        profiles,
        recovery,
        storage,
        orchestrator,
    }
}

fn profile_for(session: &Session, user_type: UserType, email_verified: bool) -> Profile {
    Profile {
        id: session.subject_id,
        user_type,
        tier: Tier::FreeTrial,
        business_name: match user_type {
            UserType::Business => Some("Acme Traders".into()),
            UserType::Individual => None,
        },
        email: session.email.clone(),
        email_verified,
        created_at: Utc::now(),
        deleted_at: None,
    }
}

fn recoverable(days_remaining: u32) -> RecoverableAccountInfo {
    RecoverableAccountInfo {
        has_recoverable_account: true,
        user_type: Some(UserType::Business),
        business_name: Some("Acme Traders".into()),
        deleted_at: Some(Utc::now()),
        days_remaining,
    }
}

#[tokio::test]
async fn p1_restore_is_idempotent() {
    let h = harness();
    let session = h.provider.register("owner@acme.test", "pw12345678");
    h.storage
        .save(&PersistedSession::now(session.clone()))
        .await
        .unwrap();

    let store = SessionStore::new(h.provider.clone(), h.storage.clone(), &fast_cfg());
    let first = store.restore().await;
    let second = store.restore().await;

    assert_eq!(first, Some(session));
    assert_eq!(first, second);
    // one provider confirmation per restore, no hidden extra traffic
    assert_eq!(h.provider.current_session_calls(), 2);
}

#[tokio::test]
async fn p2_last_initiated_sign_in_wins() {
    let h = harness();
    let slow = h.provider.register("slow@acme.test", "pw12345678");
    let fast = h.provider.register("fast@acme.test", "pw12345678");
    h.profiles.insert(profile_for(&slow, UserType::Business, true));
    h.profiles.insert(profile_for(&fast, UserType::Business, true));
    // the first-initiated attempt resolves last
    h.provider
        .set_sign_in_delay("slow@acme.test", Duration::from_millis(100));

    let (first, second) = tokio::join!(
        h.orchestrator.sign_in("slow@acme.test", "pw12345678", None),
        h.orchestrator.sign_in("fast@acme.test", "pw12345678", None),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());

    let state = h.orchestrator.current();
    assert_eq!(state.session().unwrap().email, "fast@acme.test");
}

#[tokio::test]
async fn p3_sign_out_publishes_before_remote_call_settles() {
    let h = harness();
    let session = h.provider.register("owner@acme.test", "pw12345678");
    h.profiles.insert(profile_for(&session, UserType::Business, true));
    h.orchestrator
        .sign_in("owner@acme.test", "pw12345678", None)
        .await
        .unwrap();

    let gate = h.provider.gate_sign_out();
    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.sign_out().await });

    // let the task run up to the gated remote call
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.orchestrator.current().stage, AuthStage::Unauthenticated);
    assert!(!h.provider.sign_out_completed());

    gate.notify_one();
    task.await.unwrap();
    assert!(h.provider.sign_out_completed());
}

#[tokio::test]
async fn p4_cross_type_sign_in_reports_actual_type() {
    let h = harness();
    let session = h.provider.register("biz@x.com", "pw12345678");
    h.profiles
        .insert(profile_for(&session, UserType::Individual, true));

    let err = h
        .orchestrator
        .sign_in("biz@x.com", "pw12345678", Some(UserType::Business))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::AccountTypeMismatch {
            actual: UserType::Individual
        }
    );
    // the fresh session was signed back out, locally and in storage
    assert_eq!(h.orchestrator.current().stage, AuthStage::Unauthenticated);
    assert!(h.storage.load().await.is_none());
    // recovery is never consulted for a type mismatch
    assert!(h
        .orchestrator
        .check_recovery_after_failure(&err, "biz@x.com")
        .await
        .is_none());
    assert_eq!(h.recovery.calls(), 0);
}

#[tokio::test]
async fn p5_recovery_check_only_after_credential_failure() {
    let h = harness();
    h.provider.register("a@x.com", "rightpw123");

    let err = h
        .orchestrator
        .sign_in("a@x.com", "wrongpw", None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::InvalidCredentials);

    h.recovery.push_result(Ok(recoverable(5)));
    let offered = h
        .orchestrator
        .check_recovery_after_failure(&err, "a@x.com")
        .await;
    assert!(matches!(offered, Some(Ok(info)) if info.is_recoverable()));
    assert_eq!(h.recovery.calls(), 1);

    for other in [
        SessionError::AccountTypeMismatch {
            actual: UserType::Individual,
        },
        SessionError::Network("down".into()),
        SessionError::Timeout,
    ] {
        assert!(h
            .orchestrator
            .check_recovery_after_failure(&other, "a@x.com")
            .await
            .is_none());
    }
    assert_eq!(h.recovery.calls(), 1);
}

#[tokio::test]
async fn p6_unverified_email_is_not_locked_out() {
    let h = harness();
    let session = h.provider.register("new@acme.test", "pw12345678");
    h.profiles
        .insert(profile_for(&session, UserType::Business, false));
    h.orchestrator
        .sign_in("new@acme.test", "pw12345678", Some(UserType::Business))
        .await
        .unwrap();

    let state = h.orchestrator.current();
    assert!(!state.email_verified());
    assert_eq!(h.orchestrator.dashboard_route(), Route::BusinessDashboard);
    assert_eq!(
        routing::decide(&state, "/dashboard/business"),
        GuardAction::Allow {
            verification_reminder: true
        }
    );
}

#[tokio::test]
async fn scenario_a_profile_retries_exhaust_to_unavailable() {
    let h = harness();
    let session = h.provider.register("u1@acme.test", "pw12345678");
    h.storage
        .save(&PersistedSession::now(session))
        .await
        .unwrap();
    for _ in 0..3 {
        h.profiles.push_fetch_result(Ok(None));
    }

    h.orchestrator.init().await;

    let state = h.orchestrator.current();
    assert!(matches!(
        state.stage,
        AuthStage::Authenticated {
            profile: ProfileStatus::Unavailable,
            ..
        }
    ));
    assert_eq!(h.profiles.fetch_calls(), 3);
    assert_eq!(h.orchestrator.dashboard_route(), Route::SettingUp);
}

#[tokio::test]
async fn scenario_b_mismatch_never_reaches_recovery() {
    let h = harness();
    let session = h.provider.register("biz@x.com", "pw12345678");
    h.profiles
        .insert(profile_for(&session, UserType::Individual, true));

    let err = h
        .orchestrator
        .sign_in("biz@x.com", "pw12345678", Some(UserType::Business))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::AccountTypeMismatch {
            actual: UserType::Individual
        }
    ));
    assert_eq!(h.recovery.calls(), 0);
}

#[tokio::test]
async fn scenario_c_recovery_offer_and_closed_window() {
    let h = harness();
    h.provider.register("a@x.com", "rightpw123");
    let err = h
        .orchestrator
        .sign_in("a@x.com", "wrongpw", None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::InvalidCredentials);

    // open window: offer Recover-or-Start-Fresh
    h.recovery.push_result(Ok(recoverable(5)));
    let info = h
        .orchestrator
        .check_recovery_after_failure(&err, "a@x.com")
        .await
        .unwrap()
        .unwrap();
    assert!(info.is_recoverable());
    assert_eq!(info.days_remaining, 5);

    // closed window: downstream must see no recoverable account at all
    h.recovery.push_result(Ok(recoverable(0)));
    let info = h
        .orchestrator
        .check_recovery_after_failure(&err, "a@x.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!info.has_recoverable_account);
}

#[tokio::test]
async fn scenario_d_google_session_is_trusted_verified() {
    let h = harness();
    let google = Session {
        subject_id: Uuid::new_v4(),
        email: "g@x.com".into(),
        access_token: "at-google".into(),
        refresh_token: "rt-google".into(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
        provider: Provider::Google,
    };
    h.provider.set_oauth_session(google.clone());
    // stored flag says unverified; the provider tag overrides it
    h.profiles
        .insert(profile_for(&google, UserType::Individual, false));

    let params = OAuthCallbackParams {
        access_token: Some(google.access_token.clone()),
        refresh_token: Some(google.refresh_token.clone()),
        expires_in: Some(3600),
        ..Default::default()
    };
    h.orchestrator.complete_oauth(&params).await.unwrap();

    let state = h.orchestrator.current();
    assert!(state.email_verified());
    assert_eq!(h.orchestrator.dashboard_route(), Route::IndividualDashboard);
}

#[tokio::test]
async fn init_without_persisted_session_lands_unauthenticated() {
    let h = harness();
    h.orchestrator.init().await;

    assert_eq!(h.orchestrator.current().stage, AuthStage::Unauthenticated);
    assert_eq!(h.orchestrator.dashboard_route(), Route::SignIn);
    assert_eq!(h.profiles.fetch_calls(), 0);
}

#[tokio::test]
async fn duplicate_sign_in_is_rejected_while_pending() {
    let h = harness();
    let session = h.provider.register("owner@acme.test", "pw12345678");
    h.profiles.insert(profile_for(&session, UserType::Business, true));
    h.provider
        .set_sign_in_delay("owner@acme.test", Duration::from_millis(50));

    let (first, second) = tokio::join!(
        h.orchestrator.sign_in("owner@acme.test", "pw12345678", None),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.orchestrator
                .sign_in("owner@acme.test", "pw12345678", None)
                .await
        }
    );
    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), SessionError::AlreadyInFlight);
}

#[tokio::test]
async fn sign_up_tolerates_profile_lag() {
    let h = harness();
    // the row appears only on the third read
    h.profiles.push_fetch_result(Ok(None));
    h.profiles.push_fetch_result(Ok(None));
    let late_profile = Profile {
        id: Uuid::new_v4(),
        user_type: UserType::Business,
        tier: Tier::FreeTrial,
        business_name: Some("Fresh Goods".into()),
        email: "fresh@acme.test".into(),
        email_verified: false,
        created_at: Utc::now(),
        deleted_at: None,
    };
    h.profiles.push_fetch_result(Ok(Some(late_profile)));

    let input = SignUpInput {
        email: "fresh@acme.test".into(),
        password: "pw12345678".into(),
        user_type: UserType::Business,
        business_name: Some("Fresh Goods".into()),
    };
    h.orchestrator.sign_up(&input).await.unwrap();

    assert!(matches!(
        h.orchestrator.current().stage,
        AuthStage::Authenticated {
            profile: ProfileStatus::Ready(_),
            ..
        }
    ));
    assert_eq!(h.profiles.fetch_calls(), 3);
}

#[tokio::test]
async fn failed_sign_in_surfaces_actionable_message() {
    let h = harness();
    h.provider.register("a@x.com", "rightpw123");

    let err = h
        .orchestrator
        .sign_in("a@x.com", "wrongpw", None)
        .await
        .unwrap_err();
    let state = h.orchestrator.current();
    assert_eq!(state.stage, AuthStage::Unauthenticated);
    assert_eq!(state.error, Some(err.user_message()));
}

#[tokio::test]
async fn subscribers_observe_resolved_profile() {
    let h = harness();
    let mut rx = h.orchestrator.subscribe();
    let session = h.provider.register("owner@acme.test", "pw12345678");
    h.profiles.insert(profile_for(&session, UserType::Business, true));

    h.orchestrator
        .sign_in("owner@acme.test", "pw12345678", None)
        .await
        .unwrap();

    rx.changed().await.unwrap();
    let state = rx.borrow_and_update().clone();
    assert!(matches!(
        state.stage,
        AuthStage::Authenticated {
            profile: ProfileStatus::Ready(_),
            ..
        }
    ));
}
