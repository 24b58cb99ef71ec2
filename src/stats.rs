use chrono::{DateTime, Duration, NaiveTime, Utc};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::model::{HistoryPoint, ItemGroup};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryStats {
    pub avg_volume: f64,
    pub avg_isk_traded: f64,
    pub real_roi_7d: f64,
}

/// Points dated on or after `now - (days + 1)`, newest first.
pub fn last_days(history: &[HistoryPoint], days: i64, now: DateTime<Utc>) -> Vec<&HistoryPoint> {
    let oldest = now - Duration::days(days + 1);

    history
        .iter()
        .rev()
        .filter(|h| h.date.and_time(NaiveTime::MIN).and_utc() >= oldest)
        .collect()
}

pub fn history_stats(history: &[HistoryPoint], cost: f64, now: DateTime<Utc>) -> HistoryStats {
    let mut stats = HistoryStats::default();

    let history_30d = last_days(history, 30, now);
    if !history_30d.is_empty() {
        let avg_price_30d = history_30d.iter().map(|h| h.average).mean();
        let avg_volume_30d = history_30d.iter().map(|h| h.volume as f64).mean();

        stats.avg_volume = avg_volume_30d;
        stats.avg_isk_traded = avg_price_30d * avg_volume_30d;
    }

    let history_7d = last_days(history, 7, now);
    if !history_7d.is_empty() {
        let avg_highest_7d = history_7d.iter().map(|h| h.highest).mean();
        let avg_lowest_7d = history_7d.iter().map(|h| h.lowest).mean();

        // Nothing traded low enough to measure against; report no return.
        if avg_lowest_7d > 0.0 {
            let real_margin_7d = avg_highest_7d - avg_lowest_7d - cost;
            stats.real_roi_7d = real_margin_7d / avg_lowest_7d * 100.0;
        }
    }

    stats
}

pub fn enrich(group: &mut ItemGroup, history: Option<&[HistoryPoint]>, now: DateTime<Utc>) {
    let stats = match history {
        Some(h) => history_stats(h, group.cost, now),
        None => HistoryStats::default(),
    };

    group.avg_volume = stats.avg_volume;
    group.avg_isk_traded = stats.avg_isk_traded;
    group.real_roi_7d = stats.real_roi_7d;
}

pub fn enrich_all(
    groups: &mut BTreeMap<i32, ItemGroup>,
    histories: &HashMap<i32, Option<Vec<HistoryPoint>>>,
    now: DateTime<Utc>,
) {
    for (id, group) in groups.iter_mut() {
        let history = histories.get(id).and_then(|h| h.as_deref());
        if history.is_none() {
            debug!(type_id = id, "no history, using zeroed stats");
        }
        enrich(group, history, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 11, 0, 0).unwrap()
    }

    fn point(day: u32, average: f64, highest: f64, lowest: f64, volume: i64) -> HistoryPoint {
        point_in(3, day, average, highest, lowest, volume)
    }

    fn point_in(month: u32, day: u32, average: f64, highest: f64, lowest: f64, volume: i64) -> HistoryPoint {
        HistoryPoint {
            date: NaiveDate::from_ymd_opt(2024, month, day).unwrap(),
            average,
            highest,
            lowest,
            volume,
        }
    }

    fn group_with_cost(cost: f64) -> ItemGroup {
        ItemGroup {
            cost,
            ..ItemGroup::new(34)
        }
    }

    #[test]
    fn window_is_anchored_to_run_time() {
        let history: Vec<HistoryPoint> = (1..=30).map(|d| point(d, 1.0, 1.0, 1.0, 1)).collect();

        // now - 8 days = 03-23 11:00, so 03-24 00:00 is the first day in.
        let week = last_days(&history, 7, now());
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
        assert_eq!(week[6].date, NaiveDate::from_ymd_opt(2024, 3, 24).unwrap());

        // now - 31 days = 02-29 11:00; all of March is inside.
        assert_eq!(last_days(&history, 30, now()).len(), 30);
    }

    #[test]
    fn computes_thirty_and_seven_day_stats() {
        let mut history = vec![
            // Too old for either window.
            point_in(2, 20, 1000.0, 1000.0, 1000.0, 1000),
            point(10, 100.0, 120.0, 80.0, 10),
        ];
        history.push(point(28, 110.0, 130.0, 90.0, 20));
        history.push(point(29, 120.0, 150.0, 110.0, 30));

        let stats = history_stats(&history, 5.0, now());

        // 30d: days 10, 28, 29.
        assert!((stats.avg_volume - 20.0).abs() < 1e-9);
        assert!((stats.avg_isk_traded - 110.0 * 20.0).abs() < 1e-6);

        // 7d: days 28, 29. highest 140, lowest 100.
        let expected = (140.0 - 100.0 - 5.0) / 100.0 * 100.0;
        assert!((stats.real_roi_7d - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_history_gives_zero_stats() {
        let mut group = group_with_cost(3.0);
        enrich(&mut group, Some(&[]), now());
        assert_eq!(group.avg_volume, 0.0);
        assert_eq!(group.avg_isk_traded, 0.0);
        assert_eq!(group.real_roi_7d, 0.0);

        let mut missing = group_with_cost(3.0);
        enrich(&mut missing, None, now());
        assert_eq!(missing.avg_volume, 0.0);
        assert_eq!(missing.avg_isk_traded, 0.0);
        assert_eq!(missing.real_roi_7d, 0.0);
    }

    #[test]
    fn stale_history_gives_zero_stats() {
        let history = vec![point_in(2, 28, 10.0, 12.0, 8.0, 100)];
        assert_eq!(history_stats(&history, 1.0, now()), HistoryStats::default());
    }

    #[test]
    fn only_thirty_day_window_populated() {
        let history = vec![point(15, 10.0, 12.0, 8.0, 100)];
        let stats = history_stats(&history, 1.0, now());
        assert_eq!(stats.avg_volume, 100.0);
        assert_eq!(stats.avg_isk_traded, 1000.0);
        assert_eq!(stats.real_roi_7d, 0.0);
    }

    #[test]
    fn zero_lowest_price_gives_zero_real_roi() {
        let history = vec![point(30, 5.0, 10.0, 0.0, 50)];
        let stats = history_stats(&history, 1.0, now());
        assert_eq!(stats.real_roi_7d, 0.0);
        assert!(stats.real_roi_7d.is_finite());
        assert_eq!(stats.avg_volume, 50.0);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let history = vec![
            point(20, 100.0, 120.0, 80.0, 10),
            point(30, 110.0, 125.0, 95.0, 14),
        ];
        let mut groups = BTreeMap::new();
        groups.insert(34, group_with_cost(4.0));
        groups.insert(35, group_with_cost(1.0));

        let mut histories = HashMap::new();
        histories.insert(34, Some(history));
        histories.insert(35, None);

        enrich_all(&mut groups, &histories, now());
        let first: Vec<_> = groups
            .values()
            .map(|g| (g.avg_volume, g.avg_isk_traded, g.real_roi_7d))
            .collect();

        enrich_all(&mut groups, &histories, now());
        let second: Vec<_> = groups
            .values()
            .map(|g| (g.avg_volume, g.avg_isk_traded, g.real_roi_7d))
            .collect();

        assert_eq!(first, second);
        assert_eq!(groups[&35].avg_volume, 0.0);
        assert!(groups[&34].avg_volume > 0.0);
    }
}
