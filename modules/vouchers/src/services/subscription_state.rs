//! Subscription window math for managers
//!
//! Pure functions over the `Manager` model so the state machine can be tested
//! without a database. All date math is UTC; a billing "month" is a fixed 30
//! days, matching how subscription time is sold.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Manager, ManagerStatus};

/// Seconds in a day, used for ceiling division in `days_left`.
pub const DAY_SECS: i64 = 86_400;

/// A purchased month extends the paid window by exactly 30 days.
pub const MONTH_DAYS: i64 = 30;

/// The window that currently governs the manager's access: the trial window
/// while on trial, the paid window otherwise (if one was ever set).
pub fn governing_window_end(manager: &Manager) -> Option<DateTime<Utc>> {
    match manager.status {
        ManagerStatus::Trial => Some(manager.trial_ends_at),
        _ => manager.subscription_ends_at,
    }
}

/// Whole days remaining in the governing window, rounded up.
///
/// Negative once the window has elapsed; callers clamp for display, the
/// engine itself never does. Managers with no paid window outside trial
/// report 0.
pub fn days_left(manager: &Manager, now: DateTime<Utc>) -> i64 {
    let end = match governing_window_end(manager) {
        Some(end) => end,
        None => return 0,
    };
    let secs = (end - now).num_seconds();
    (secs + DAY_SECS - 1).div_euclid(DAY_SECS)
}

/// Whether the manager may currently operate.
///
/// Suspension always wins; otherwise the governing window must still be open.
pub fn is_active(manager: &Manager, now: DateTime<Utc>) -> bool {
    match manager.status {
        ManagerStatus::Suspended => false,
        ManagerStatus::Trial => manager.trial_ends_at > now,
        ManagerStatus::Active => manager
            .subscription_ends_at
            .is_some_and(|end| end > now),
        ManagerStatus::Expired => false,
    }
}

/// New paid-window end after purchasing `months`.
///
/// Always additive on top of remaining paid time: the base is the current end
/// if still in the future, otherwise now. Two consecutive extensions from a
/// non-expired state therefore stack from the original end, never from now.
pub fn extended_end(
    current_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    months: i32,
) -> DateTime<Utc> {
    let base = current_end.map_or(now, |end| end.max(now));
    base + Duration::days(months as i64 * MONTH_DAYS)
}

/// Whether the normal activation path may run from this state.
///
/// `suspended` has no activation edge: a suspended manager cannot be cured by
/// payment, only by an explicit reinstatement.
pub fn can_activate(status: ManagerStatus) -> bool {
    !matches!(status, ManagerStatus::Suspended)
}

/// Status a suspended manager returns to on reinstatement, recomputed from
/// the stored windows at the time of the call.
pub fn reinstated_status(manager: &Manager, now: DateTime<Utc>) -> ManagerStatus {
    if manager
        .subscription_ends_at
        .is_some_and(|end| end > now)
    {
        ManagerStatus::Active
    } else if manager.trial_ends_at > now {
        ManagerStatus::Trial
    } else {
        ManagerStatus::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn manager_fixture(status: ManagerStatus, now: DateTime<Utc>) -> Manager {
        Manager {
            id: Uuid::new_v4(),
            email: "shop@example.com".to_string(),
            display_name: "Shop".to_string(),
            status,
            trial_started_at: now,
            trial_ends_at: now + Duration::days(30),
            subscription_started_at: None,
            subscription_ends_at: None,
            dormant: false,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fresh_trial_has_thirty_days_left() {
        let now = Utc::now();
        let m = manager_fixture(ManagerStatus::Trial, now);
        assert_eq!(days_left(&m, now), 30);
        assert!(is_active(&m, now));
    }

    #[test]
    fn test_days_left_rounds_partial_days_up() {
        let now = Utc::now();
        let mut m = manager_fixture(ManagerStatus::Trial, now);
        m.trial_ends_at = now + Duration::seconds(1);
        assert_eq!(days_left(&m, now), 1);
    }

    #[test]
    fn test_days_left_negative_after_expiry() {
        let now = Utc::now();
        let mut m = manager_fixture(ManagerStatus::Active, now);
        m.subscription_ends_at = Some(now - Duration::days(3));
        assert_eq!(days_left(&m, now), -3);
        assert!(!is_active(&m, now));
    }

    #[test]
    fn test_days_left_zero_just_after_window_close() {
        let now = Utc::now();
        let mut m = manager_fixture(ManagerStatus::Active, now);
        m.subscription_ends_at = Some(now - Duration::seconds(1));
        assert_eq!(days_left(&m, now), 0);
    }

    #[test]
    fn test_days_left_zero_without_paid_window() {
        let now = Utc::now();
        let m = manager_fixture(ManagerStatus::Expired, now);
        assert_eq!(days_left(&m, now), 0);
    }

    #[test]
    fn test_suspended_is_never_active() {
        let now = Utc::now();
        let mut m = manager_fixture(ManagerStatus::Suspended, now);
        m.subscription_ends_at = Some(now + Duration::days(365));
        assert!(!is_active(&m, now));
    }

    #[test]
    fn test_extension_stacks_on_remaining_time() {
        let now = Utc::now();
        let first = extended_end(None, now, 1);
        assert_eq!(first, now + Duration::days(30));

        // A second purchase before expiry extends from the old end, not now.
        let second = extended_end(Some(first), now, 2);
        assert_eq!(second, now + Duration::days(90));
    }

    #[test]
    fn test_extension_from_lapsed_window_starts_at_now() {
        let now = Utc::now();
        let lapsed = Some(now - Duration::days(10));
        assert_eq!(extended_end(lapsed, now, 1), now + Duration::days(30));
    }

    #[test]
    fn test_activation_edges() {
        assert!(can_activate(ManagerStatus::Trial));
        assert!(can_activate(ManagerStatus::Active));
        assert!(can_activate(ManagerStatus::Expired));
        assert!(!can_activate(ManagerStatus::Suspended));
    }

    #[test]
    fn test_reinstatement_prefers_open_paid_window() {
        let now = Utc::now();
        let mut m = manager_fixture(ManagerStatus::Suspended, now);
        m.subscription_ends_at = Some(now + Duration::days(5));
        assert_eq!(reinstated_status(&m, now), ManagerStatus::Active);
    }

    #[test]
    fn test_reinstatement_falls_back_to_trial_then_expired() {
        let now = Utc::now();
        let mut m = manager_fixture(ManagerStatus::Suspended, now);
        assert_eq!(reinstated_status(&m, now), ManagerStatus::Trial);

        m.trial_ends_at = now - Duration::days(1);
        assert_eq!(reinstated_status(&m, now), ManagerStatus::Expired);
    }
}
