use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

const CST_OFFSET_SECS: i32 = 8 * 3600;

/// Report date: the explicit `YYYY-MM-DD` argument, else today's date in China Standard Time.
pub fn resolve_report_date(
    report_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = report_date_arg {
        return NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid report date (expected YYYY-MM-DD): {s}"));
    }

    let cst = chrono::FixedOffset::east_opt(CST_OFFSET_SECS).context("invalid CST offset")?;
    Ok(now_utc.with_timezone(&cst).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn uses_cst_calendar_day() {
        // 2026-01-05 17:00 UTC = 2026-01-06 01:00 CST
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 17, 0, 0).unwrap();
        let d = resolve_report_date(None, now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
    }

    #[test]
    fn same_day_before_utc_midnight_shift() {
        // 2026-01-05 15:59 UTC = 23:59 CST
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 15, 59, 0).unwrap();
        let d = resolve_report_date(None, now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
    }

    #[test]
    fn explicit_argument_wins() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let d = resolve_report_date(Some("2025-12-31"), now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(resolve_report_date(Some("31/12/2025"), now).is_err());
    }
}
