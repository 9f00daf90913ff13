use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use subtle::ConstantTimeEq;
use tracing::warn;

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-api-key";
/// Query parameter accepted as an alternative to the header.
pub const ADMIN_KEY_QUERY: &str = "admin_key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("admin api key missing, send it in the X-API-Key header or the admin_key query parameter")]
    MissingKey,
    #[error("admin api key is invalid")]
    InvalidKey,
    #[error("too many failed attempts, try again in {remaining_minutes} minutes")]
    LockedOut { remaining_minutes: u64 },
}

#[derive(Debug, Clone, Copy)]
struct FailureWindow {
    failures: u32,
    started: Instant,
}

/// Tracks failed admin authentications per client.
///
/// A client is locked once `max_attempts` failures land inside one lockout
/// window. The window opens at the first failure and expires `lockout` later;
/// a successful authentication clears it.
#[derive(Debug)]
pub struct LoginAttemptLimiter {
    max_attempts: u32,
    lockout: Duration,
    windows: Mutex<HashMap<String, FailureWindow>>,
}

impl LoginAttemptLimiter {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client: &str) -> Result<(), AuthError> {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> Result<(), AuthError> {
        let mut windows = self.windows.lock().expect("login limiter poisoned");
        self.prune(&mut windows, now);

        match windows.get(client) {
            Some(window) if window.failures >= self.max_attempts => {
                let elapsed = now.saturating_duration_since(window.started);
                let remaining = self.lockout.saturating_sub(elapsed);
                Err(AuthError::LockedOut {
                    remaining_minutes: remaining.as_secs() / 60,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn record_failure(&self, client: &str) {
        self.record_failure_at(client, Instant::now());
    }

    pub fn record_failure_at(&self, client: &str, now: Instant) {
        let mut windows = self.windows.lock().expect("login limiter poisoned");
        self.prune(&mut windows, now);

        let window = windows
            .entry(client.to_string())
            .or_insert(FailureWindow {
                failures: 0,
                started: now,
            });
        window.failures += 1;

        if window.failures == self.max_attempts {
            warn!(client, "admin access locked after repeated failures");
        }
    }

    pub fn record_success(&self, client: &str) {
        let mut windows = self.windows.lock().expect("login limiter poisoned");
        windows.remove(client);
    }

    pub fn failures(&self, client: &str) -> u32 {
        let windows = self.windows.lock().expect("login limiter poisoned");
        windows.get(client).map_or(0, |window| window.failures)
    }

    fn prune(&self, windows: &mut HashMap<String, FailureWindow>, now: Instant) {
        windows.retain(|_, window| now.saturating_duration_since(window.started) < self.lockout);
    }
}

/// Static admin key check backed by the attempt limiter.
#[derive(Debug)]
pub struct AdminGuard {
    api_key: String,
    limiter: LoginAttemptLimiter,
    trust_forwarded_for: bool,
}

impl AdminGuard {
    pub fn new(api_key: impl Into<String>, limiter: LoginAttemptLimiter) -> Self {
        Self {
            api_key: api_key.into(),
            limiter,
            trust_forwarded_for: false,
        }
    }

    /// Identify clients by `X-Forwarded-For` instead of the socket peer.
    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    pub fn authorize(&self, client: &str, presented: Option<&str>) -> Result<(), AuthError> {
        self.authorize_at(client, presented, Instant::now())
    }

    pub fn authorize_at(
        &self,
        client: &str,
        presented: Option<&str>,
        now: Instant,
    ) -> Result<(), AuthError> {
        self.limiter.check_at(client, now)?;

        let presented = presented.ok_or(AuthError::MissingKey)?;
        if bool::from(presented.as_bytes().ct_eq(self.api_key.as_bytes())) {
            self.limiter.record_success(client);
            Ok(())
        } else {
            self.limiter.record_failure_at(client, now);
            warn!(client, "rejected admin api key");
            Err(AuthError::InvalidKey)
        }
    }

    pub fn limiter(&self) -> &LoginAttemptLimiter {
        &self.limiter
    }
}
