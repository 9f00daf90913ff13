use std::time::{Duration, Instant};

use super::common::*;

use crate::intake::guard::{AdminGuard, AuthError, LoginAttemptLimiter};

const LOCKOUT: Duration = Duration::from_secs(900);

#[test]
fn missing_key_is_unauthorized_without_counting() {
    let guard = admin_guard();

    assert_eq!(guard.authorize("10.0.0.1", None), Err(AuthError::MissingKey));
    assert_eq!(guard.limiter().failures("10.0.0.1"), 0);
}

#[test]
fn wrong_key_is_forbidden_and_counted() {
    let guard = admin_guard();

    assert_eq!(
        guard.authorize("10.0.0.1", Some("guess")),
        Err(AuthError::InvalidKey)
    );
    assert_eq!(guard.limiter().failures("10.0.0.1"), 1);
    assert_eq!(guard.authorize("10.0.0.1", Some(ADMIN_KEY)), Ok(()));
    assert_eq!(guard.limiter().failures("10.0.0.1"), 0);
}

#[test]
fn locks_after_max_failures_and_reports_remaining_minutes() {
    let guard = AdminGuard::new(ADMIN_KEY, LoginAttemptLimiter::new(5, LOCKOUT));
    let start = Instant::now();

    for _ in 0..5 {
        assert_eq!(
            guard.authorize_at("10.0.0.2", Some("guess"), start),
            Err(AuthError::InvalidKey)
        );
    }

    let later = start + Duration::from_secs(5 * 60);
    assert_eq!(
        guard.authorize_at("10.0.0.2", Some(ADMIN_KEY), later),
        Err(AuthError::LockedOut {
            remaining_minutes: 10
        })
    );
    assert_eq!(guard.authorize_at("10.0.0.3", Some(ADMIN_KEY), later), Ok(()));
}

#[test]
fn lockout_expires_after_window() {
    let limiter = LoginAttemptLimiter::new(2, LOCKOUT);
    let start = Instant::now();

    limiter.record_failure_at("10.0.0.4", start);
    limiter.record_failure_at("10.0.0.4", start);
    assert!(limiter.check_at("10.0.0.4", start).is_err());

    let expired = start + LOCKOUT;
    assert!(limiter.check_at("10.0.0.4", expired).is_ok());
    assert_eq!(limiter.failures("10.0.0.4"), 0);
}

#[test]
fn failures_outside_window_start_a_new_count() {
    let limiter = LoginAttemptLimiter::new(3, LOCKOUT);
    let start = Instant::now();

    limiter.record_failure_at("10.0.0.5", start);
    limiter.record_failure_at("10.0.0.5", start);
    limiter.record_failure_at("10.0.0.5", start + LOCKOUT + Duration::from_secs(1));

    assert_eq!(limiter.failures("10.0.0.5"), 1);
}
