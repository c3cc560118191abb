use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Bars needed to derive MA20 plus a previous close.
pub const MIN_BARS: usize = 21;

/// One trading day as reported by the kline endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub amount: f64,
    pub amplitude_pct: f64,
    pub change_pct: f64,
    pub change_amount: f64,
    pub turnover_rate_pct: f64,
}

impl DailyBar {
    /// Parses `date,open,close,high,low,volume,amount,amplitude,chg%,chg,turnover,...`.
    pub fn parse(line: &str) -> Result<Self, PipelineError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 11 {
            return Err(PipelineError::malformed(format!(
                "kline has {} fields, expected at least 11: {line}",
                fields.len()
            )));
        }

        let num = |idx: usize| -> Result<f64, PipelineError> {
            fields[idx].parse::<f64>().map_err(|_| {
                PipelineError::malformed(format!("kline field {idx} is not numeric: {line}"))
            })
        };

        Ok(Self {
            date: fields[0].to_string(),
            open: num(1)?,
            close: num(2)?,
            high: num(3)?,
            low: num(4)?,
            volume: num(5)?,
            amount: num(6)?,
            amplitude_pct: num(7)?,
            change_pct: num(8)?,
            change_amount: num(9)?,
            turnover_rate_pct: num(10)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub previous_close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub turnover_amount: f64,
    pub amplitude_pct: f64,
    pub change_pct: f64,
    pub change_amount: f64,
    pub turnover_rate_pct: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
}

impl QuoteSnapshot {
    /// Builds the snapshot from raw kline lines in ascending date order.
    ///
    /// Only the trailing 21 lines are read: the first of them supplies the previous close,
    /// the remaining 20 supply the day's fields and the moving averages.
    pub fn from_klines(code: &str, klines: &[String]) -> Result<Self, PipelineError> {
        if klines.len() < MIN_BARS {
            return Err(PipelineError::DataUnavailable {
                code: code.to_string(),
                required: MIN_BARS,
                available: klines.len(),
            });
        }

        let last21 = klines[klines.len() - MIN_BARS..]
            .iter()
            .map(|line| DailyBar::parse(line))
            .collect::<Result<Vec<_>, _>>()?;
        let last20 = &last21[1..];
        let closes: Vec<f64> = last20.iter().map(|b| b.close).collect();

        let today = &last20[last20.len() - 1];
        let yesterday = &last21[0];

        Ok(Self {
            date: today.date.clone(),
            open: today.open,
            close: today.close,
            previous_close: yesterday.close,
            high: today.high,
            low: today.low,
            volume: today.volume,
            turnover_amount: today.amount,
            amplitude_pct: today.amplitude_pct,
            change_pct: today.change_pct,
            change_amount: today.change_amount,
            turnover_rate_pct: today.turnover_rate_pct,
            ma5: trailing_mean(&closes, 5),
            ma10: trailing_mean(&closes, 10),
            ma20: trailing_mean(&closes, 20),
        })
    }
}

/// Simple mean of the last `n` values. Callers guarantee `values.len() >= n > 0`.
fn trailing_mean(values: &[f64], n: usize) -> f64 {
    let tail = &values[values.len() - n..];
    tail.iter().sum::<f64>() / n as f64
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Ascending synthetic bars; close of bar `i` is `10 + i`.
    pub(crate) fn synthetic_klines(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                let close = 10.0 + i as f64;
                format!(
                    "2026-01-{:02},{:.2},{:.2},{:.2},{:.2},{},{},{:.2},{:.2},{:.2},{:.2},0",
                    (i % 28) + 1,
                    close - 0.5,
                    close,
                    close + 1.0,
                    close - 1.0,
                    1000 + i,
                    250_000_000.0 + i as f64,
                    3.1,
                    1.2,
                    0.12,
                    0.8
                )
            })
            .collect()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn moving_averages_use_trailing_closes() {
        let klines = synthetic_klines(60);
        let snap = QuoteSnapshot::from_klines("603087", &klines).unwrap();

        // Closes of the last 20 bars are 50..=69.
        assert_close(snap.close, 69.0);
        assert_close(snap.ma5, (65..=69).map(f64::from).sum::<f64>() / 5.0);
        assert_close(snap.ma10, (60..=69).map(f64::from).sum::<f64>() / 10.0);
        assert_close(snap.ma20, (50..=69).map(f64::from).sum::<f64>() / 20.0);
        assert_close(snap.previous_close, 49.0);
    }

    #[test]
    fn exactly_twenty_one_bars_is_enough() {
        let klines = synthetic_klines(21);
        let snap = QuoteSnapshot::from_klines("000001", &klines).unwrap();
        assert_close(snap.previous_close, 10.0);
        assert_close(snap.close, 30.0);
        assert_close(snap.open, 29.5);
        assert_close(snap.high, 31.0);
        assert_close(snap.low, 29.0);
        assert_close(snap.volume, 1020.0);
        assert_close(snap.turnover_amount, 250_000_020.0);
        assert_close(snap.turnover_rate_pct, 0.8);
    }

    #[test]
    fn fewer_than_twenty_one_bars_is_data_unavailable() {
        let klines = synthetic_klines(20);
        let err = QuoteSnapshot::from_klines("999999", &klines).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DataUnavailable {
                code: "999999".to_string(),
                required: 21,
                available: 20,
            }
        );
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let mut klines = synthetic_klines(21);
        klines[20] = "2026-02-01,x,1,1,1,1,1,1,1,1,1".to_string();
        let err = QuoteSnapshot::from_klines("000001", &klines).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedResponse);
    }

    #[test]
    fn bars_before_the_trailing_window_are_not_parsed() {
        let mut klines = synthetic_klines(30);
        klines[0] = "garbage".to_string();
        assert!(QuoteSnapshot::from_klines("000001", &klines).is_ok());
    }
}
