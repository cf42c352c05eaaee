//! Reference events and their symmetric day-offset markers.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A day offset drawn on both sides of every reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOffset {
    pub days: u32,
    /// Marker color (name or `#rrggbb`).
    pub color: String,
}

impl EventOffset {
    pub fn new(days: u32, color: impl Into<String>) -> Self {
        Self {
            days,
            color: color.into(),
        }
    }

    /// Legend text, e.g. `±7 days`.
    pub fn legend_label(&self) -> String {
        format!("±{} days", self.days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSide {
    Before,
    After,
}

/// One vertical marker: `reference ± offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMarker {
    pub reference: NaiveDate,
    pub date: NaiveDate,
    pub offset_days: u32,
    pub side: MarkerSide,
    pub color: String,
}

impl EventMarker {
    /// Marker position on a timestamp axis (midnight UTC).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.date.and_time(NaiveTime::MIN).and_utc()
    }
}

/// A fixed date of interest with the offsets to mark around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEvent {
    pub date: NaiveDate,
    pub offsets: Vec<EventOffset>,
}

impl ReferenceEvent {
    pub fn new(date: NaiveDate, offsets: Vec<EventOffset>) -> Self {
        Self { date, offsets }
    }

    /// Dates of [`markers`](Self::markers), in the same order.
    pub fn marker_dates(&self) -> Vec<NaiveDate> {
        self.markers().into_iter().map(|m| m.date).collect()
    }

    /// `date - offset` then `date + offset`, for each offset in order.
    pub fn markers(&self) -> Vec<EventMarker> {
        let mut out = Vec::with_capacity(self.offsets.len() * 2);
        for offset in &self.offsets {
            let delta = Duration::days(i64::from(offset.days));
            for (side, date) in [
                (MarkerSide::Before, self.date - delta),
                (MarkerSide::After, self.date + delta),
            ] {
                out.push(EventMarker {
                    reference: self.date,
                    date,
                    offset_days: offset.days,
                    side,
                    color: offset.color.clone(),
                });
            }
        }
        out
    }
}

/// All markers for a set of events, grouped by offset first.
///
/// Offsets are taken from the first event; every event of a study shares
/// the same offset list.
pub fn event_markers(events: &[ReferenceEvent]) -> Vec<EventMarker> {
    let mut out = Vec::new();
    let Some(first) = events.first() else {
        return out;
    };
    for offset in &first.offsets {
        for event in events {
            let single = ReferenceEvent::new(event.date, vec![offset.clone()]);
            out.extend(single.markers());
        }
    }
    out
}
