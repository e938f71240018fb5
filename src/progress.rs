//! Progress-bar arithmetic for the transport display.

/// Percentage plus `m:ss` labels for one time update.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub percent: f64,
    pub elapsed: String,
    pub total: String,
}

impl Default for Progress {
    fn default() -> Self {
        progress(0.0, None)
    }
}

/// Maps elapsed/duration seconds to a percentage in `[0, 100]`.
///
/// An unknown, zero, negative or non-finite duration yields 0%.
pub fn progress(current_seconds: f64, duration_seconds: Option<f64>) -> Progress {
    let current = sanitize_seconds(current_seconds);
    let duration = duration_seconds
        .map(sanitize_seconds)
        .filter(|duration| *duration > 0.0);

    let percent = match duration {
        Some(duration) => (current / duration * 100.0).clamp(0.0, 100.0),
        None => 0.0,
    };

    Progress {
        percent,
        elapsed: format_time(current),
        total: format_time(duration.unwrap_or(0.0)),
    }
}

/// Formats seconds as `minutes:seconds`, seconds zero-padded to two digits.
pub fn format_time(seconds: f64) -> String {
    let whole = sanitize_seconds(seconds).floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

fn sanitize_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_of_two_minutes() {
        let p = progress(30.0, Some(120.0));
        assert_eq!(p.percent, 25.0);
        assert_eq!(p.elapsed, "0:30");
        assert_eq!(p.total, "2:00");
    }

    #[test]
    fn seconds_are_zero_padded() {
        assert_eq!(progress(125.0, Some(130.0)).elapsed, "2:05");
        assert_eq!(format_time(61.9), "1:01");
        assert_eq!(format_time(3600.0), "60:00");
    }

    #[test]
    fn unusable_duration_gives_zero_percent() {
        assert_eq!(progress(10.0, Some(0.0)).percent, 0.0);
        assert_eq!(progress(10.0, None).percent, 0.0);
        assert_eq!(progress(10.0, Some(f64::NAN)).percent, 0.0);
        assert_eq!(progress(10.0, Some(-5.0)).percent, 0.0);
        assert_eq!(progress(10.0, None).elapsed, "0:10");
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(progress(200.0, Some(100.0)).percent, 100.0);
        assert_eq!(progress(-3.0, Some(100.0)).percent, 0.0);
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }

    proptest::proptest! {
        #[test]
        fn percent_stays_in_bounds(current in -1e6f64..1e6, duration in -1e6f64..1e6) {
            let p = progress(current, Some(duration));
            proptest::prop_assert!((0.0..=100.0).contains(&p.percent));
        }
    }
}
