use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use log::debug;

use crate::models::{RevenueBucket, RevenueKpis};

const MONTHLY_BUCKETS: usize = 12;
const DAILY_BUCKETS: usize = 30;
const SYNTHETIC_DAYS: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeView {
    Month,
    Day,
}

impl TimeView {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "month" => Some(TimeView::Month),
            "day" => Some(TimeView::Day),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeView::Month => "month",
            TimeView::Day => "day",
        }
    }
}

/// Pair two arrays index-wise up to the shorter length. Upstream sometimes
/// disagrees with itself about universe size; a mismatch is a diagnostic, not
/// an error.
pub fn zip_by_min<'a, A, B>(left: &'a [A], right: &'a [B], label: &str) -> Vec<(&'a A, &'a B)> {
    if left.len() != right.len() {
        debug!(
            "{}: array length mismatch left={} right={}, pairing first {}",
            label,
            left.len(),
            right.len(),
            left.len().min(right.len())
        );
    }
    left.iter().zip(right.iter()).collect()
}

/// 24h change in percent. A non-positive previous price yields 0, never
/// NaN or infinity.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

fn utc_date(timestamp_secs: i64) -> Option<DateTime<Utc>> {
    let date = DateTime::from_timestamp(timestamp_secs, 0);
    if date.is_none() {
        debug!("dropping point with unrepresentable timestamp {}", timestamp_secs);
    }
    date
}

fn month_key(timestamp_secs: i64) -> Option<String> {
    utc_date(timestamp_secs).map(|d| format!("{:04}-{:02}", d.year(), d.month()))
}

fn day_key(timestamp_secs: i64) -> Option<String> {
    utc_date(timestamp_secs).map(|d| format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
}

/// Fold the fees and revenue series into one map of UTC calendar buckets.
///
/// Bucket keys are zero-padded and date-ordered, so the map's lexicographic
/// order is chronological. A bucket present in only one series keeps the
/// other field at 0. Monthly buckets sum their days; daily buckets carry the
/// day's value directly (last write per day wins). The most recent 12
/// monthly / 30 daily buckets are retained.
pub fn build_revenue_buckets(
    fees: &[(i64, f64)],
    revenue: &[(i64, f64)],
    view: TimeView,
) -> Vec<RevenueBucket> {
    // Upstream series are not guaranteed sorted.
    let mut fees = fees.to_vec();
    fees.sort_by_key(|point| point.0);
    let mut revenue = revenue.to_vec();
    revenue.sort_by_key(|point| point.0);

    match view {
        TimeView::Month => monthly_buckets(&fees, &revenue),
        TimeView::Day => daily_buckets(&fees, &revenue),
    }
}

fn monthly_buckets(fees: &[(i64, f64)], revenue: &[(i64, f64)]) -> Vec<RevenueBucket> {
    let mut buckets: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for &(ts, value) in fees {
        if let Some(key) = month_key(ts) {
            buckets.entry(key).or_insert((0.0, 0.0)).0 += value;
        }
    }
    for &(ts, value) in revenue {
        if let Some(key) = month_key(ts) {
            buckets.entry(key).or_insert((0.0, 0.0)).1 += value;
        }
    }

    tail_buckets(buckets, MONTHLY_BUCKETS)
        .map(|(key, (fees, revenue))| RevenueBucket {
            period: key,
            fees,
            revenue,
        })
        .collect()
}

fn daily_buckets(fees: &[(i64, f64)], revenue: &[(i64, f64)]) -> Vec<RevenueBucket> {
    let mut buckets: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for &(ts, value) in fees {
        if let Some(key) = day_key(ts) {
            buckets.insert(key, (value, 0.0));
        }
    }
    for &(ts, value) in revenue {
        if let Some(key) = day_key(ts) {
            buckets.entry(key).or_insert((0.0, 0.0)).1 = value;
        }
    }

    tail_buckets(buckets, DAILY_BUCKETS)
        .map(|(key, (fees, revenue))| RevenueBucket {
            // Day buckets are keyed YYYY-MM-DD internally but displayed MM-DD.
            period: key[5..].to_string(),
            fees,
            revenue,
        })
        .collect()
}

fn tail_buckets(
    buckets: BTreeMap<String, (f64, f64)>,
    keep: usize,
) -> impl Iterator<Item = (String, (f64, f64))> {
    let skip = buckets.len().saturating_sub(keep);
    buckets.into_iter().skip(skip)
}

/// Snap a target axis increment to a human-friendly value.
///
/// The target is normalized into [1, 10) on its order of magnitude and
/// snapped to the nearest of {1, 2, 2.5, 5, 10} (ties keep the earlier
/// candidate); a snap to 10 is promoted to the next magnitude's 1 so the top
/// gridline is never duplicated.
pub fn nice_tick(target: f64) -> f64 {
    if target <= 0.0 {
        return 1.0;
    }
    let exponent = target.log10().floor();
    let power = 10f64.powf(exponent);
    let normalized = target / power;

    const CANDIDATES: [f64; 5] = [1.0, 2.0, 2.5, 5.0, 10.0];
    let mut best = CANDIDATES[0];
    let mut min_diff = (normalized - best).abs();
    for &candidate in &CANDIDATES {
        let diff = (normalized - candidate).abs();
        if diff < min_diff {
            min_diff = diff;
            best = candidate;
        }
    }

    if best == 10.0 {
        power * 10.0
    } else {
        best * power
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisScale {
    pub y_max: f64,
    pub ticks: Vec<f64>,
}

/// Gridline layout for a chart with the given maximum data value: six-ish
/// steps of a nice tick, top tick rounded up to a tick multiple, ticks listed
/// descending to zero.
pub fn axis_scale(max_value: f64) -> AxisScale {
    if max_value <= 0.0 {
        return AxisScale {
            y_max: 10_000_000.0,
            ticks: vec![10_000_000.0, 7_500_000.0, 5_000_000.0, 2_500_000.0, 0.0],
        };
    }

    let tick = nice_tick(max_value / 6.0);
    let y_max = (max_value / tick).ceil() * tick;
    let steps = (y_max / tick).ceil() as usize + 1;
    let ticks = (0..steps).map(|i| y_max - i as f64 * tick).collect();

    AxisScale { y_max, ticks }
}

/// Trailing revenue figures over completed UTC days.
///
/// A day is "completed" when its timestamp is strictly before today's UTC
/// start. The 24h figure is the last completed day, falling back to the most
/// recent non-zero point of the whole series when that day is zero or
/// absent. 7d/30d are sums over the trailing N completed points, not
/// calendar-aligned windows.
pub fn revenue_kpis(chart: &[(i64, f64)], now: DateTime<Utc>) -> RevenueKpis {
    if chart.is_empty() {
        return RevenueKpis {
            total_24h: 0.0,
            total_7d: 0.0,
            total_30d: 0.0,
        };
    }

    let mut sorted = chart.to_vec();
    sorted.sort_by_key(|point| point.0);

    let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc().timestamp();
    let completed: Vec<(i64, f64)> = sorted
        .iter()
        .copied()
        .filter(|&(ts, _)| ts < today_start)
        .collect();

    let mut last_completed = completed.last().copied();
    if last_completed.map_or(true, |(_, value)| value == 0.0) {
        if let Some(&non_zero) = sorted.iter().rev().find(|&&(_, value)| value > 0.0) {
            last_completed = Some(non_zero);
        }
    }

    let trailing_sum = |n: usize| -> f64 {
        completed.iter().rev().take(n).map(|&(_, value)| value).sum()
    };

    RevenueKpis {
        total_24h: last_completed.map_or(0.0, |(_, value)| value),
        total_7d: trailing_sum(7),
        total_30d: trailing_sum(30),
    }
}

/// Deterministic placeholder revenue series: 181 daily points ending now,
/// a sine wave around $3M with bounded jitter. Consumers must always see it
/// paired with the `isMockData` flag.
pub fn synthetic_revenue_series(now: DateTime<Utc>) -> Vec<(i64, f64)> {
    let now_secs = now.timestamp();
    let mut data = Vec::with_capacity(SYNTHETIC_DAYS as usize + 1);

    for i in (0..=SYNTHETIC_DAYS).rev() {
        let timestamp = now_secs - i * 86_400;
        let base = 3_000_000.0;
        let variation =
            (i as f64 / 10.0).sin() * 1_000_000.0 + rand::random::<f64>() * 500_000.0;
        data.push((timestamp, (base + variation).floor()));
    }

    data
}
