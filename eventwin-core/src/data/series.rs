//! Typed per-asset price series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cleaned observation: timestamp and closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// A labelled close-price history, sorted by timestamp ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub label: String,
    pub points: Vec<PricePoint>,
}

impl AssetSeries {
    /// Build a series, sorting points by timestamp.
    ///
    /// The sort is stable, so rows sharing a timestamp keep file order.
    pub fn new(label: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self {
            label: label.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }

    /// (min, max) close, ignoring non-finite values.
    pub fn close_range(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .map(|p| p.close)
            .filter(|c| c.is_finite())
            .fold(None, |acc, c| match acc {
                None => Some((c, c)),
                Some((lo, hi)) => Some((lo.min(c), hi.max(c))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            timestamp: Utc.with_ymd_and_hms(2022, 3, day, 0, 0, 0).unwrap(),
            close,
        }
    }

    #[test]
    fn new_sorts_newest_first_exports() {
        let series = AssetSeries::new("BTC", vec![point(3, 3.0), point(1, 1.0), point(2, 2.0)]);
        let closes: Vec<f64> = series.points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.first_timestamp(), Some(point(1, 0.0).timestamp));
        assert_eq!(series.last_timestamp(), Some(point(3, 0.0).timestamp));
    }

    #[test]
    fn close_range_skips_nan() {
        let series = AssetSeries::new("X", vec![point(1, 5.0), point(2, f64::NAN), point(3, 2.0)]);
        assert_eq!(series.close_range(), Some((2.0, 5.0)));
        assert_eq!(AssetSeries::new("E", vec![]).close_range(), None);
    }
}
