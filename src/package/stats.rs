//! Human-readable rendering of release dates

use chrono::{NaiveDateTime, TimeDelta};

/// Formats `released_at` relative to `now`.
///
/// - under a day: `"{h}h ago"`, never less than `"1h ago"`
/// - under 30 days: `"1 day ago"`, `"{d} days ago"`
/// - otherwise the date itself, as `"09 Aug 2021"`
pub fn humanize_release_date(released_at: NaiveDateTime, now: NaiveDateTime) -> String {
    let age = now - released_at;

    if age < TimeDelta::hours(24) {
        let hours = age.num_hours().max(1);
        format!("{hours}h ago")
    } else if age < TimeDelta::days(30) {
        let days = age.num_days();
        if days == 1 {
            "1 day ago".to_string()
        } else {
            format!("{days} days ago")
        }
    } else {
        released_at.format("%d %b %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[rstest]
    #[case::just_released(TimeDelta::zero(), "1h ago")]
    #[case::half_an_hour(TimeDelta::minutes(30), "1h ago")]
    #[case::almost_two_hours(TimeDelta::minutes(119), "1h ago")]
    #[case::eight_hours(TimeDelta::hours(8), "8h ago")]
    #[case::almost_a_day(TimeDelta::hours(24) - TimeDelta::seconds(1), "23h ago")]
    #[case::exactly_a_day(TimeDelta::hours(24), "1 day ago")]
    #[case::almost_two_days(TimeDelta::hours(47), "1 day ago")]
    #[case::two_days(TimeDelta::days(2), "2 days ago")]
    #[case::sixteen_days(TimeDelta::days(16), "16 days ago")]
    #[case::almost_thirty_days(TimeDelta::days(30) - TimeDelta::seconds(1), "29 days ago")]
    fn humanize_relative_ages(#[case] age: TimeDelta, #[case] expected: &str) {
        assert_eq!(humanize_release_date(now() - age, now()), expected);
    }

    #[test]
    fn humanize_exactly_thirty_days_shows_date() {
        assert_eq!(
            humanize_release_date(now() - TimeDelta::days(30), now()),
            "14 Feb 2024"
        );
    }

    #[test]
    fn humanize_thirty_one_days_shows_date() {
        assert_eq!(
            humanize_release_date(now() - TimeDelta::days(31), now()),
            "13 Feb 2024"
        );
    }

    #[test]
    fn humanize_old_release_uses_two_digit_day() {
        let released_at = NaiveDate::from_ymd_opt(2021, 8, 9)
            .unwrap()
            .and_hms_opt(14, 27, 16)
            .unwrap();

        assert_eq!(humanize_release_date(released_at, now()), "09 Aug 2021");
    }

    #[test]
    fn humanize_future_release_reads_one_hour() {
        assert_eq!(
            humanize_release_date(now() + TimeDelta::hours(3), now()),
            "1h ago"
        );
    }
}
