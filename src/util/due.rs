use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Parse a `YYYY-MM-DD` date as midnight UTC.
pub fn parse_due(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Whole days from `today` to the due date (negative when overdue)
pub fn days_until(due: DateTime<Utc>, today: NaiveDate) -> i64 {
    (due.date_naive() - today).num_days()
}

/// "due today", "due in 3 days", "overdue 1 day"
pub fn due_label(due: DateTime<Utc>, today: NaiveDate) -> String {
    let days = days_until(due, today);
    let plural = |n: i64| if n == 1 { "day" } else { "days" };
    match days {
        0 => "due today".to_string(),
        d if d > 0 => format!("due in {} {}", d, plural(d)),
        d => format!("overdue {} {}", -d, plural(-d)),
    }
}

/// `due_label` against the local calendar date
pub fn due_label_now(due: DateTime<Utc>) -> String {
    due_label(due, chrono::Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_plain_dates() {
        let due = parse_due("2026-03-14").unwrap();
        assert_eq!(due.to_rfc3339(), "2026-03-14T00:00:00+00:00");
        assert!(parse_due("14/03/2026").is_err());
    }

    #[test]
    fn labels() {
        let due = parse_due("2026-03-14").unwrap();
        assert_eq!(due_label(due, day("2026-03-14")), "due today");
        assert_eq!(due_label(due, day("2026-03-13")), "due in 1 day");
        assert_eq!(due_label(due, day("2026-03-09")), "due in 5 days");
        assert_eq!(due_label(due, day("2026-03-15")), "overdue 1 day");
        assert_eq!(due_label(due, day("2026-03-24")), "overdue 10 days");
    }
}
