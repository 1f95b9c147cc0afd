/// Unix timestamp of Monday 1970-01-05, the start of week 1
const WEEK_EPOCH: i64 = 4 * 86_400;
const SECS_PER_WEEK: i64 = 7 * 86_400;

/// Format a Unix timestamp as YYYY-MM-DD string
pub fn format_timestamp(timestamp: i64) -> String {
    use time::OffsetDateTime;
    use time::macros::format_description;

    if timestamp == 0 {
        return "unknown".to_string();
    }

    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| {
            let format = format_description!("[year]-[month]-[day]");
            dt.format(&format).ok()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Week number counted from Monday 1970-01-05 (week 1)
pub fn weeknum(timestamp: i64) -> i64 {
    (timestamp - WEEK_EPOCH).div_euclid(SECS_PER_WEEK) + 1
}

/// Activity score weighting recent weeks more heavily
pub fn score(stats: &[i64]) -> i64 {
    let n = stats.len() as f64;
    if n == 0.0 {
        return 0;
    }
    let total: f64 = stats
        .iter()
        .enumerate()
        .map(|(i, &count)| ((i + 1) as f64).sqrt() / n.sqrt() * count as f64)
        .sum();
    total as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        let ts = 1700000000; // Nov 14, 2023 approximately
        let formatted = format_timestamp(ts);
        assert!(formatted.starts_with("2023-"));

        assert_eq!(format_timestamp(0), "unknown");
    }

    #[test]
    fn test_weeknum() {
        assert_eq!(weeknum(WEEK_EPOCH), 1);
        assert_eq!(weeknum(WEEK_EPOCH + SECS_PER_WEEK - 1), 1);
        assert_eq!(weeknum(WEEK_EPOCH + SECS_PER_WEEK), 2);
        // Thursday 1970-01-01 falls in the week before week 1
        assert_eq!(weeknum(0), 0);
    }

    #[test]
    fn test_score_weights_recent_weeks() {
        assert_eq!(score(&[]), 0);
        assert_eq!(score(&[0, 0, 0, 4]), 4);
        assert!(score(&[0, 0, 0, 4]) > score(&[4, 0, 0, 0]));
    }
}
