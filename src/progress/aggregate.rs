use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::models::{DailyLog, WeightLog, WeightUnit};

use super::ProgressWindow;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HeatLevel {
    None,
    Logged,
    Completed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub label: String,
    pub level: HeatLevel,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub has_log: bool,
    pub completed: bool,
    pub weight: Option<f64>,
}

/// Weight delta expressed in the unit of the first entry. No conversion is done.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightChange {
    pub amount: f64,
    pub unit: WeightUnit,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub window: ProgressWindow,
    pub completion_percent: u8,
    pub weight_change: WeightChange,
    pub weight_change_label: String,
    pub streak_days: u32,
    pub heatmap: Vec<HeatmapCell>,
}

/// Share of logged days whose workout was completed, rounded to a whole percent.
pub fn completion_percent(logs: &[DailyLog]) -> u8 {
    if logs.is_empty() {
        return 0;
    }
    let completed = logs.iter().filter(|log| log.workout_completed).count();
    ((completed as f64 / logs.len() as f64) * 100.0).round() as u8
}

/// Last weight minus first weight. Fewer than two entries yield zero.
pub fn weight_change(weights: &[WeightLog]) -> WeightChange {
    let unit = weights.first().map(|w| w.unit).unwrap_or_default();
    let amount = match (weights.first(), weights.last()) {
        (Some(first), Some(last)) if weights.len() >= 2 => last.weight - first.weight,
        _ => 0.0,
    };
    WeightChange { amount, unit }
}

/// "+1.5 kg" when the change is positive, otherwise "-2.0 kg" or "0.0 kg".
pub fn format_weight_change(change: &WeightChange) -> String {
    let unit = change.unit.as_str();
    if change.amount > 0.0 {
        format!("+{:.1} {unit}", change.amount)
    } else if change.amount == 0.0 {
        format!("{:.1} {unit}", 0.0)
    } else {
        format!("{:.1} {unit}", change.amount)
    }
}

/// Consecutive completed workouts counted back from the most recent log.
///
/// Only existing logs are inspected: a date with no log does not end the streak,
/// the first log with an incomplete workout does.
pub fn streak_days(logs: &[DailyLog]) -> u32 {
    let mut ordered: Vec<&DailyLog> = logs.iter().collect();
    ordered.sort_by(|a, b| b.log_date.cmp(&a.log_date));
    ordered
        .into_iter()
        .take_while(|log| log.workout_completed)
        .count() as u32
}

pub fn heatmap(window: &ProgressWindow, logs: &[DailyLog]) -> Vec<HeatmapCell> {
    let by_date: HashMap<NaiveDate, &DailyLog> =
        logs.iter().map(|log| (log.log_date, log)).collect();

    window
        .days()
        .into_iter()
        .zip(window.labels())
        .map(|(date, label)| {
            let level = match by_date.get(&date) {
                Some(log) if log.workout_completed => HeatLevel::Completed,
                Some(_) => HeatLevel::Logged,
                None => HeatLevel::None,
            };
            HeatmapCell { date, label, level }
        })
        .collect()
}

pub fn calendar(window: &ProgressWindow, logs: &[DailyLog], weights: &[WeightLog]) -> Vec<CalendarCell> {
    let by_date: HashMap<NaiveDate, &DailyLog> =
        logs.iter().map(|log| (log.log_date, log)).collect();
    let weight_by_date: HashMap<NaiveDate, f64> =
        weights.iter().map(|w| (w.log_date, w.weight)).collect();

    window
        .days()
        .into_iter()
        .map(|date| {
            let log = by_date.get(&date);
            CalendarCell {
                date,
                has_log: log.is_some(),
                completed: log.is_some_and(|log| log.workout_completed),
                weight: weight_by_date.get(&date).copied(),
            }
        })
        .collect()
}

/// Aggregate the logs that fall inside `window`. Inputs outside it are ignored.
pub fn summarize(window: ProgressWindow, logs: &[DailyLog], weights: &[WeightLog]) -> ProgressSummary {
    let mut logs: Vec<DailyLog> = logs
        .iter()
        .filter(|log| window.contains(log.log_date))
        .cloned()
        .collect();
    logs.sort_by_key(|log| log.log_date);
    let mut weights: Vec<WeightLog> = weights
        .iter()
        .filter(|w| window.contains(w.log_date))
        .cloned()
        .collect();
    weights.sort_by_key(|w| w.log_date);

    let change = weight_change(&weights);
    ProgressSummary {
        window,
        completion_percent: completion_percent(&logs),
        weight_change_label: format_weight_change(&change),
        weight_change: change,
        streak_days: streak_days(&logs),
        heatmap: heatmap(&window, &logs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log(on: NaiveDate, completed: bool) -> DailyLog {
        DailyLog {
            id: format!("log-{on}"),
            owner_id: "u1".into(),
            log_date: on,
            workout_completed: completed,
            completed_exercises: Default::default(),
            notes: String::new(),
            revision: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn weight(on: NaiveDate, kg: f64) -> WeightLog {
        WeightLog {
            id: format!("w-{on}"),
            owner_id: "u1".into(),
            log_date: on,
            weight: kg,
            unit: WeightUnit::Kg,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn streak_stops_at_first_incomplete_log() {
        let today = date(2024, 5, 10);
        let logs = vec![
            log(date(2024, 5, 7), false),
            log(date(2024, 5, 8), true),
            log(date(2024, 5, 9), true),
            log(today, true),
        ];
        assert_eq!(streak_days(&logs), 3);
    }

    #[test]
    fn missing_days_do_not_break_the_streak() {
        let logs = vec![
            log(date(2024, 5, 1), true),
            log(date(2024, 5, 4), true),
            log(date(2024, 5, 9), true),
        ];
        assert_eq!(streak_days(&logs), 3);
        assert_eq!(streak_days(&[]), 0);
        assert_eq!(streak_days(&[log(date(2024, 5, 9), false)]), 0);
    }

    #[test]
    fn weight_change_is_last_minus_first() {
        let weights = vec![weight(date(2024, 5, 1), 80.0), weight(date(2024, 5, 5), 78.0)];
        let change = weight_change(&weights);
        assert_eq!(change.amount, -2.0);
        assert_eq!(format_weight_change(&change), "-2.0 kg");

        let gained = WeightChange { amount: 1.5, unit: WeightUnit::Lbs };
        assert_eq!(format_weight_change(&gained), "+1.5 lbs");
    }

    #[test]
    fn weight_change_needs_two_entries() {
        assert_eq!(weight_change(&[]).amount, 0.0);
        let single = weight_change(&[weight(date(2024, 5, 1), 80.0)]);
        assert_eq!(single.amount, 0.0);
        assert_eq!(format_weight_change(&single), "0.0 kg");
    }

    #[test]
    fn completion_percent_rounds_and_never_divides_by_zero() {
        assert_eq!(completion_percent(&[]), 0);

        let logs = vec![
            log(date(2024, 5, 1), true),
            log(date(2024, 5, 2), true),
            log(date(2024, 5, 3), true),
            log(date(2024, 5, 4), false),
        ];
        assert_eq!(completion_percent(&logs), 75);

        let thirds = vec![
            log(date(2024, 5, 1), true),
            log(date(2024, 5, 2), true),
            log(date(2024, 5, 3), false),
        ];
        assert_eq!(completion_percent(&thirds), 67);
    }

    #[test]
    fn heatmap_marks_days_without_logs_as_none() {
        let window = ProgressWindow::Week(date(2024, 5, 8));
        let cells = heatmap(
            &window,
            &[log(date(2024, 5, 6), true), log(date(2024, 5, 8), false)],
        );

        assert_eq!(cells.len(), 7);
        assert_eq!(cells[0].label, "Mon");
        assert_eq!(cells[0].level, HeatLevel::Completed);
        assert_eq!(cells[1].level, HeatLevel::None);
        assert_eq!(cells[2].level, HeatLevel::Logged);
    }

    #[test]
    fn calendar_joins_logs_and_weights() {
        let window = ProgressWindow::Month(date(2024, 5, 15));
        let cells = calendar(
            &window,
            &[log(date(2024, 5, 2), true)],
            &[weight(date(2024, 5, 3), 79.4)],
        );

        assert_eq!(cells.len(), 31);
        assert!(cells[1].has_log && cells[1].completed);
        assert_eq!(cells[2].weight, Some(79.4));
        assert!(!cells[0].has_log && cells[0].weight.is_none());
    }

    #[test]
    fn summary_only_counts_the_window() {
        let window = ProgressWindow::Week(date(2024, 5, 8));
        let logs = vec![
            log(date(2024, 4, 30), false),
            log(date(2024, 5, 6), true),
            log(date(2024, 5, 7), true),
        ];
        let weights = vec![
            weight(date(2024, 5, 1), 90.0),
            weight(date(2024, 5, 6), 80.0),
            weight(date(2024, 5, 10), 80.5),
        ];

        let summary = summarize(window, &logs, &weights);
        assert_eq!(summary.completion_percent, 100);
        assert_eq!(summary.streak_days, 2);
        assert!((summary.weight_change.amount - 0.5).abs() < 1e-9);
        assert_eq!(summary.weight_change_label, "+0.5 kg");
        assert_eq!(summary.heatmap.len(), 7);
    }
}
