//! Multi-asset inner join on timestamp.
//!
//! Unlike a union alignment there is no void filling: a timestamp survives
//! only if every asset has a close for it. Holidays, outages and listing
//! gaps therefore shrink the table rather than introduce NaNs.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use super::series::AssetSeries;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("asset label '{0}' appears more than once")]
    DuplicateLabel(String),
}

/// Wide close-price table: one column per asset, one row per shared timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    /// Column names, in merge order.
    pub labels: Vec<String>,
    /// Join key, ascending.
    pub timestamps: Vec<DateTime<Utc>>,
    /// `columns[i][row]` is the close of `labels[i]` at `timestamps[row]`.
    pub columns: Vec<Vec<f64>>,
}

impl AlignedTable {
    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, label: &str) -> Option<&[f64]> {
        let idx = self.labels.iter().position(|l| l == label)?;
        Some(&self.columns[idx])
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[index]).collect())
    }
}

/// Inner-join `series` on timestamp, first asset first.
///
/// When one series holds the same timestamp twice, the first occurrence is
/// used. An empty input yields an empty table.
pub fn align_series(series: &[AssetSeries]) -> Result<AlignedTable, AlignError> {
    let mut seen = HashSet::new();
    for s in series {
        if !seen.insert(s.label.as_str()) {
            return Err(AlignError::DuplicateLabel(s.label.clone()));
        }
    }

    let Some((first, rest)) = series.split_first() else {
        return Ok(AlignedTable {
            labels: Vec::new(),
            timestamps: Vec::new(),
            columns: Vec::new(),
        });
    };

    // Rows of the running merge: (timestamp, one value per merged asset).
    let mut merged: Vec<(DateTime<Utc>, Vec<f64>)> = Vec::with_capacity(first.len());
    let mut first_seen = HashSet::new();
    for p in &first.points {
        if first_seen.insert(p.timestamp) {
            merged.push((p.timestamp, vec![p.close]));
        }
    }
    let mut labels = vec![first.label.clone()];

    for next in rest {
        let mut lookup: HashMap<DateTime<Utc>, f64> = HashMap::with_capacity(next.len());
        for p in &next.points {
            lookup.entry(p.timestamp).or_insert(p.close);
        }

        let before = merged.len();
        merged.retain_mut(|(ts, values)| match lookup.get(ts) {
            Some(close) => {
                values.push(*close);
                true
            }
            None => false,
        });
        if merged.len() < before {
            debug!(
                asset = %next.label,
                dropped = before - merged.len(),
                "timestamps missing from asset dropped from join"
            );
        }
        labels.push(next.label.clone());
    }

    merged.sort_by_key(|(ts, _)| *ts);

    let mut timestamps = Vec::with_capacity(merged.len());
    let mut columns = vec![Vec::with_capacity(merged.len()); labels.len()];
    for (ts, values) in merged {
        timestamps.push(ts);
        for (col, v) in columns.iter_mut().zip(values) {
            col.push(v);
        }
    }

    Ok(AlignedTable {
        labels,
        timestamps,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::series::PricePoint;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn series(label: &str, days: &[(i64, f64)]) -> AssetSeries {
        AssetSeries::new(
            label,
            days.iter()
                .map(|&(d, close)| PricePoint {
                    timestamp: day(d),
                    close,
                })
                .collect(),
        )
    }

    #[test]
    fn three_overlapping_dates_give_three_matched_rows() {
        let btc = series("Bitcoin", &[(0, 100.0), (1, 101.0), (2, 102.0), (3, 103.0)]);
        let eth = series("Ethereum", &[(1, 11.0), (2, 12.0), (3, 13.0), (4, 14.0)]);

        let table = align_series(&[btc, eth]).unwrap();

        assert_eq!(table.labels, vec!["Bitcoin", "Ethereum"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.timestamps, vec![day(1), day(2), day(3)]);
        assert_eq!(table.column("Bitcoin").unwrap(), &[101.0, 102.0, 103.0]);
        assert_eq!(table.column("Ethereum").unwrap(), &[11.0, 12.0, 13.0]);
        assert_eq!(table.row(2), Some(vec![103.0, 13.0]));
        assert_eq!(table.row(3), None);
    }

    #[test]
    fn self_join_is_identity() {
        let btc = series("Bitcoin", &[(0, 1.0), (1, 2.0), (5, 3.0)]);
        let mut copy = btc.clone();
        copy.label = "Bitcoin (copy)".into();

        let table = align_series(&[btc.clone(), copy]).unwrap();

        assert_eq!(table.row_count(), btc.len());
        let closes: Vec<f64> = btc.points.iter().map(|p| p.close).collect();
        assert_eq!(table.columns[0], closes);
        assert_eq!(table.columns[1], closes);
    }

    #[test]
    fn disjoint_ranges_give_zero_rows() {
        let a = series("A", &[(0, 1.0), (1, 1.0)]);
        let b = series("B", &[(10, 1.0), (11, 1.0)]);

        let table = align_series(&[a, b]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.labels, vec!["A", "B"]);
        assert!(table.columns.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn gap_in_any_asset_drops_the_date() {
        let a = series("A", &[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let b = series("B", &[(0, 4.0), (1, 5.0), (2, 6.0)]);
        let c = series("C", &[(0, 7.0), (2, 9.0)]);

        let table = align_series(&[a, b, c]).unwrap();
        assert_eq!(table.timestamps, vec![day(0), day(2)]);
        assert_eq!(table.row(1), Some(vec![3.0, 6.0, 9.0]));
    }

    #[test]
    fn duplicate_timestamp_keeps_first_value() {
        let a = series("A", &[(0, 1.0), (0, 99.0), (1, 2.0)]);
        let b = series("B", &[(0, 5.0), (1, 6.0), (1, 66.0)]);

        let table = align_series(&[a, b]).unwrap();
        assert_eq!(table.column("A").unwrap(), &[1.0, 2.0]);
        assert_eq!(table.column("B").unwrap(), &[5.0, 6.0]);
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let a = series("A", &[(0, 1.0)]);
        assert_eq!(
            align_series(&[a.clone(), a]),
            Err(AlignError::DuplicateLabel("A".into()))
        );
    }

    #[test]
    fn no_assets_is_an_empty_table() {
        let table = align_series(&[]).unwrap();
        assert!(table.is_empty());
        assert!(table.labels.is_empty());
    }

    fn arb_series(label: &'static str) -> impl Strategy<Value = AssetSeries> {
        proptest::collection::btree_set(0i64..60, 0..40).prop_map(move |days| {
            let pts: Vec<(i64, f64)> = days.into_iter().map(|d| (d, d as f64 + 1.0)).collect();
            series(label, &pts)
        })
    }

    proptest! {
        #[test]
        fn row_count_bounded_by_shortest_series(
            a in arb_series("A"),
            b in arb_series("B"),
            c in arb_series("C"),
        ) {
            let table = align_series(&[a.clone(), b.clone(), c.clone()]).unwrap();
            let shortest = a.len().min(b.len()).min(c.len());
            prop_assert!(table.row_count() <= shortest);
        }

        #[test]
        fn merge_order_does_not_change_rows(a in arb_series("A"), b in arb_series("B")) {
            let ab = align_series(&[a.clone(), b.clone()]).unwrap();
            let ba = align_series(&[b, a]).unwrap();
            prop_assert_eq!(&ab.timestamps, &ba.timestamps);
            prop_assert_eq!(ab.column("A"), ba.column("A"));
            prop_assert_eq!(ab.column("B"), ba.column("B"));
        }
    }
}
