use chrono::{DateTime, TimeDelta, Utc};

pub const EDIT_WINDOW_SECS: i64 = 24 * 60 * 60;

pub fn edit_window() -> TimeDelta {
    TimeDelta::seconds(EDIT_WINDOW_SECS)
}

/// A response may be mutated while strictly less than 24h have elapsed since it
/// was created. Exactly 24h is already outside the window.
pub fn is_editable(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(created_at) < edit_window()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap()
    }

    #[test]
    fn editable_just_before_window_closes() {
        let created = t0();
        assert!(is_editable(created, created));
        assert!(is_editable(
            created,
            created + TimeDelta::hours(23) + TimeDelta::minutes(59) + TimeDelta::seconds(59)
        ));
        assert!(is_editable(
            created,
            created + edit_window() - TimeDelta::milliseconds(1)
        ));
    }

    #[test]
    fn not_editable_at_exactly_24_hours() {
        let created = t0();
        assert!(!is_editable(created, created + TimeDelta::hours(24)));
        assert!(!is_editable(created, created + TimeDelta::days(30)));
    }

    #[test]
    fn creation_in_the_future_is_still_editable() {
        let created = t0();
        assert!(is_editable(created, created - TimeDelta::minutes(5)));
    }
}
