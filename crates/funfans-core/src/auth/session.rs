use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::credentials::Credentials;
use super::store::SessionStore;
use crate::error::StoreError;

/// Sessions expire one hour after login.
pub const SESSION_TTL_MINUTES: i64 = 60;

/// Key prefix used when none is configured
pub const DEFAULT_NAMESPACE: &str = "funfansplay";

/// Value stored under the auth key while a session is active
const AUTH_FLAG: &str = "authenticated";

pub fn session_ttl() -> Duration {
    Duration::minutes(SESSION_TTL_MINUTES)
}

/// A decoded session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    pub authenticated: bool,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.established_at + session_ttl()
    }

    /// Expired once the TTL has fully elapsed. A small backward clock step
    /// after login gives a negative elapsed time, which is still valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.established_at >= session_ttl()
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at() - now
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        minutes_remaining(self.established_at, now)
    }
}

/// Whole minutes left in a session established at `established_at`.
///
/// Clamped to `0..=SESSION_TTL_MINUTES`; a timestamp ahead of the clock never
/// shows more than a full session.
fn minutes_remaining(established_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = established_at + session_ttl() - now;
    remaining.num_minutes().clamp(0, SESSION_TTL_MINUTES)
}

/// Snapshot of the guard for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionStatus {
    pub authenticated: bool,
    pub minutes_remaining: i64,
    pub using_fallback_credentials: bool,
}

/// Gates privileged views behind the admin credentials, with a one-hour
/// session persisted in a [`SessionStore`].
///
/// Reads come in two flavours that must stay separate:
///
/// - [`is_authenticated`](Self::is_authenticated) enforces: when it sees an
///   expired session it clears the store before answering `false`.
/// - [`session_time_remaining`](Self::session_time_remaining) and
///   [`session`](Self::session) only peek and never write, even for an
///   expired record. Display code polls these and must not log anyone out.
pub struct SessionGuard<S, C = SystemClock> {
    credentials: Credentials,
    store: S,
    clock: C,
    auth_key: String,
    time_key: String,
}

impl<S: SessionStore> SessionGuard<S, SystemClock> {
    pub fn with_system_clock(credentials: Credentials, store: S) -> Self {
        Self::new(credentials, store, SystemClock)
    }
}

impl<S: SessionStore, C: Clock> SessionGuard<S, C> {
    pub fn new(credentials: Credentials, store: S, clock: C) -> Self {
        let (auth_key, time_key) = session_keys(DEFAULT_NAMESPACE);
        Self {
            credentials,
            store,
            clock,
            auth_key,
            time_key,
        }
    }

    /// Use a different key prefix for the persisted entries
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        let (auth_key, time_key) = session_keys(namespace);
        self.auth_key = auth_key;
        self.time_key = time_key;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn validate_credentials(&self, username: &str, password: &str) -> bool {
        self.credentials.matches(username, password)
    }

    /// Start (or restart) a session. Returns false on bad credentials, in
    /// which case the store is left untouched.
    pub fn login(&mut self, username: &str, password: &str) -> bool {
        if !self.validate_credentials(username, password) {
            info!("Admin login rejected");
            return false;
        }

        let now = self.clock.now();
        if let Err(e) = self.persist(now) {
            warn!(error = %e, "Failed to persist admin session");
            self.logout();
            return false;
        }

        info!(established_at = %now, "Admin session started");
        true
    }

    /// Enforce-and-read. Clears an expired session before returning false.
    pub fn is_authenticated(&mut self) -> bool {
        let Some(session) = self.session() else {
            return false;
        };

        let now = self.clock.now();
        if session.is_expired(now) {
            debug!(established_at = %session.established_at, "Admin session expired");
            self.logout();
            return false;
        }

        session.authenticated
    }

    /// Remove both session entries. Safe to call with no session.
    pub fn logout(&mut self) {
        for key in [&self.auth_key, &self.time_key] {
            if let Err(e) = self.store.clear(key) {
                warn!(key = %key, error = %e, "Failed to clear session entry");
            }
        }
        debug!("Admin session cleared");
    }

    /// Minutes left in the current session, 0 if there is none.
    ///
    /// Pure read: an expired record is reported as 0 but left in place.
    /// Only `is_authenticated` clears state.
    pub fn session_time_remaining(&self) -> i64 {
        match self.established_at() {
            Some(established_at) => minutes_remaining(established_at, self.clock.now()),
            None => 0,
        }
    }

    /// Peek at the stored session without enforcing expiry.
    ///
    /// Returns `None` when either entry is missing or the timestamp does not
    /// parse; malformed state is treated as no session.
    pub fn session(&self) -> Option<Session> {
        let flag = self.store.get(&self.auth_key)?;
        let established_at = self.established_at()?;
        Some(Session {
            authenticated: flag == AUTH_FLAG,
            established_at,
        })
    }

    /// Enforces expiry, then reports the current state.
    pub fn status(&mut self) -> SessionStatus {
        let authenticated = self.is_authenticated();
        SessionStatus {
            authenticated,
            minutes_remaining: self.session_time_remaining(),
            using_fallback_credentials: self.credentials.is_fallback(),
        }
    }

    fn established_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.get(&self.time_key)?;
        let millis: i64 = raw.trim().parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    fn persist(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.set(&self.auth_key, AUTH_FLAG)?;
        self.store
            .set(&self.time_key, &now.timestamp_millis().to_string())?;
        Ok(())
    }
}

/// `(<namespace>_admin_auth, <namespace>_admin_auth_time)`
pub fn session_keys(namespace: &str) -> (String, String) {
    (
        format!("{}_admin_auth", namespace),
        format!("{}_admin_auth_time", namespace),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::store::{FileStore, MemoryStore};

    const AUTH_KEY: &str = "funfansplay_admin_auth";
    const TIME_KEY: &str = "funfansplay_admin_auth_time";

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap()
    }

    fn guard() -> (SessionGuard<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(start());
        let guard = SessionGuard::new(
            Credentials::new("ops", "s3cret"),
            MemoryStore::new(),
            clock.clone(),
        );
        (guard, clock)
    }

    #[test]
    fn test_login_requires_exact_credentials() {
        let (mut guard, _) = guard();
        assert!(!guard.login("ops", "wrong"));
        assert!(!guard.login("OPS", "s3cret"));
        assert!(!guard.login("", ""));
        assert!(!guard.login("admin", "password"));
        assert!(guard.store().is_empty());

        assert!(guard.login("ops", "s3cret"));
    }

    #[test]
    fn test_validate_credentials_has_no_side_effects() {
        let (guard, _) = guard();
        assert!(guard.validate_credentials("ops", "s3cret"));
        assert!(!guard.validate_credentials("ops", "nope"));
        assert!(guard.store().is_empty());
    }

    #[test]
    fn test_ops_scenario() {
        let (mut guard, clock) = guard();

        assert!(!guard.login("ops", "wrong"));
        assert!(!guard.is_authenticated());
        assert!(guard.session().is_none());

        assert!(guard.login("ops", "s3cret"));
        assert_eq!(guard.session_time_remaining(), 60);
        assert!(guard.is_authenticated());

        clock.advance(Duration::seconds(3601));
        assert!(!guard.is_authenticated());
        assert_eq!(guard.session_time_remaining(), 0);
    }

    #[test]
    fn test_login_writes_expected_entries() {
        let (mut guard, _) = guard();
        assert!(guard.login("ops", "s3cret"));

        assert_eq!(guard.store().get(AUTH_KEY).as_deref(), Some("authenticated"));
        assert_eq!(
            guard.store().get(TIME_KEY),
            Some(start().timestamp_millis().to_string())
        );
    }

    #[test]
    fn test_authenticated_until_ttl_boundary() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));

        clock.advance(Duration::seconds(3599));
        assert!(guard.is_authenticated());

        clock.advance(Duration::milliseconds(999));
        assert!(guard.is_authenticated());

        // Exactly one hour is expired
        clock.advance(Duration::milliseconds(1));
        assert!(!guard.is_authenticated());
        assert!(guard.session().is_none());
    }

    #[test]
    fn test_expiry_clears_store() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));
        clock.advance(Duration::hours(2));

        assert!(!guard.is_authenticated());
        assert_eq!(guard.store().get(AUTH_KEY), None);
        assert_eq!(guard.store().get(TIME_KEY), None);

        // Stays cleared on repeated reads
        assert!(!guard.is_authenticated());
        assert!(guard.store().is_empty());
    }

    #[test]
    fn test_time_remaining_does_not_clear_expired_session() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));
        clock.advance(Duration::minutes(61));

        assert_eq!(guard.session_time_remaining(), 0);
        // The stale record is still there for is_authenticated to enforce
        assert!(guard.session().is_some());
        assert_eq!(guard.store().get(AUTH_KEY).as_deref(), Some("authenticated"));

        assert!(!guard.is_authenticated());
        assert!(guard.session().is_none());
    }

    #[test]
    fn test_time_remaining_floors_to_minutes() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));

        clock.advance(Duration::milliseconds(1));
        assert_eq!(guard.session_time_remaining(), 59);

        clock.advance(Duration::minutes(30));
        assert_eq!(guard.session_time_remaining(), 29);

        clock.set(start() + Duration::seconds(3599));
        assert_eq!(guard.session_time_remaining(), 0);
    }

    #[test]
    fn test_time_remaining_non_increasing() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));

        let mut previous = guard.session_time_remaining();
        for _ in 0..90 {
            clock.advance(Duration::seconds(47));
            let current = guard.session_time_remaining();
            assert!(current <= previous);
            assert!(current >= 0);
            previous = current;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_time_remaining_without_session() {
        let (guard, _) = guard();
        assert_eq!(guard.session_time_remaining(), 0);
    }

    #[test]
    fn test_relogin_resets_timer() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));

        clock.advance(Duration::minutes(50));
        assert_eq!(guard.session_time_remaining(), 10);

        assert!(guard.login("ops", "s3cret"));
        assert_eq!(guard.session_time_remaining(), 60);

        clock.advance(Duration::minutes(30));
        assert!(guard.is_authenticated());
    }

    #[test]
    fn test_failed_login_keeps_existing_session() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));
        clock.advance(Duration::minutes(5));

        assert!(!guard.login("ops", "wrong"));
        assert!(guard.is_authenticated());
        assert_eq!(guard.session_time_remaining(), 55);
    }

    #[test]
    fn test_logout_then_not_authenticated() {
        let (mut guard, _) = guard();
        assert!(guard.login("ops", "s3cret"));

        guard.logout();
        assert!(!guard.is_authenticated());
        assert_eq!(guard.session_time_remaining(), 0);
        assert!(guard.store().is_empty());
    }

    #[test]
    fn test_logout_without_session_is_noop() {
        let (mut guard, _) = guard();
        guard.logout();
        guard.logout();
        assert!(guard.store().is_empty());
        assert!(!guard.is_authenticated());
    }

    #[test]
    fn test_malformed_state_is_no_session() {
        let (mut guard, _) = guard();

        // Flag without timestamp
        guard.store.set(AUTH_KEY, "authenticated").unwrap();
        assert!(guard.session().is_none());
        assert!(!guard.is_authenticated());

        // Unparseable timestamp
        guard.store.set(TIME_KEY, "yesterday").unwrap();
        assert!(!guard.is_authenticated());
        assert_eq!(guard.session_time_remaining(), 0);
    }

    #[test]
    fn test_unexpected_flag_value_is_not_authenticated() {
        let (mut guard, _) = guard();
        guard.store.set(AUTH_KEY, "maybe").unwrap();
        guard
            .store
            .set(TIME_KEY, &start().timestamp_millis().to_string())
            .unwrap();

        let session = guard.session().unwrap();
        assert!(!session.authenticated);
        assert!(!guard.is_authenticated());
    }

    #[test]
    fn test_backward_clock_step_keeps_session() {
        let (mut guard, clock) = guard();
        assert!(guard.login("ops", "s3cret"));

        clock.advance(Duration::milliseconds(-1));
        assert!(guard.is_authenticated());
        assert_eq!(guard.session_time_remaining(), 60);
        assert!(!guard.store().is_empty());

        // A larger correction still counts from the stored time
        clock.advance(Duration::minutes(-10));
        assert!(guard.is_authenticated());
        assert_eq!(guard.session_time_remaining(), 60);

        clock.set(start() + Duration::minutes(59));
        assert!(guard.is_authenticated());
        clock.set(start() + Duration::minutes(60));
        assert!(!guard.is_authenticated());
    }

    #[test]
    fn test_future_timestamp_remaining_capped_at_ttl() {
        let (mut guard, _) = guard();
        let future = start() + Duration::hours(5);
        guard.store.set(AUTH_KEY, "authenticated").unwrap();
        guard
            .store
            .set(TIME_KEY, &future.timestamp_millis().to_string())
            .unwrap();

        assert_eq!(guard.session_time_remaining(), 60);
        assert!(guard.is_authenticated());
    }

    #[test]
    fn test_namespace_changes_keys() {
        let clock = ManualClock::new(start());
        let mut guard = SessionGuard::new(Credentials::fallback(), MemoryStore::new(), clock)
            .with_namespace("staging");

        assert!(guard.login("admin", "password"));
        assert!(guard.store().get("staging_admin_auth").is_some());
        assert!(guard.store().get("staging_admin_auth_time").is_some());
        assert!(guard.store().get(AUTH_KEY).is_none());
    }

    #[test]
    fn test_status_reports_fallback_and_enforces() {
        let clock = ManualClock::new(start());
        let mut guard =
            SessionGuard::new(Credentials::fallback(), MemoryStore::new(), clock.clone());

        let status = guard.status();
        assert!(!status.authenticated);
        assert_eq!(status.minutes_remaining, 0);
        assert!(status.using_fallback_credentials);

        assert!(guard.login("admin", "password"));
        clock.advance(Duration::minutes(15));
        let status = guard.status();
        assert!(status.authenticated);
        assert_eq!(status.minutes_remaining, 45);

        clock.advance(Duration::minutes(45));
        let status = guard.status();
        assert!(!status.authenticated);
        assert_eq!(status.minutes_remaining, 0);
        assert!(guard.store().is_empty());
    }

    #[test]
    fn test_session_status_serializes_flat() {
        let status = SessionStatus {
            authenticated: true,
            minutes_remaining: 42,
            using_fallback_credentials: false,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"authenticated":true,"minutes_remaining":42,"using_fallback_credentials":false}"#
        );
    }

    #[test]
    fn test_session_survives_new_guard_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(start());
        let creds = Credentials::new("ops", "s3cret");

        let mut first = SessionGuard::new(creds.clone(), FileStore::new(dir.path()), clock.clone());
        assert!(first.login("ops", "s3cret"));

        clock.advance(Duration::minutes(20));
        let mut second = SessionGuard::new(creds, FileStore::new(dir.path()), clock.clone());
        assert!(second.is_authenticated());
        assert_eq!(second.session_time_remaining(), 40);

        second.logout();
        assert!(!first.is_authenticated());
    }

    #[test]
    fn test_session_expiry_helpers() {
        let session = Session {
            authenticated: true,
            established_at: start(),
        };
        assert_eq!(session.expires_at(), start() + Duration::hours(1));
        assert!(!session.is_expired(start()));
        assert!(!session.is_expired(start() - Duration::seconds(1)));
        assert!(session.is_expired(start() + Duration::hours(1)));
        assert_eq!(
            session.time_until_expiry(start() + Duration::minutes(10)),
            Duration::minutes(50)
        );
        assert_eq!(session.minutes_until_expiry(start() + Duration::minutes(10)), 50);
        assert_eq!(session.minutes_until_expiry(start() + Duration::hours(3)), 0);
    }
}
