use serde::Serialize;

use crate::grid::slot_utils::period_label;
use crate::grid::{Assignment, ConflictGroup, Grid};

/// How long a notification stays on screen before it dismisses itself
pub const TOAST_DISMISS_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient notification for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub level: ToastLevel,
    pub dismiss_after_ms: u64,
}

impl Toast {
    pub fn new(level: ToastLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level,
            dismiss_after_ms: TOAST_DISMISS_MS,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, title, message)
    }
}

/// Day name for display. Numeric days are read as 1-based positions in `days`.
pub fn day_label(day: &str, days: &[String]) -> String {
    match day.trim().parse::<usize>() {
        Ok(n) => days
            .get(n.wrapping_sub(1))
            .cloned()
            .unwrap_or_else(|| format!("Day {}", day)),
        Err(_) => day.to_string(),
    }
}

/// Cell text: "Subject (Teacher)", or just the subject while no teacher is chosen
pub fn format_assignment(assignment: &Assignment) -> String {
    match (assignment.teacher(), assignment.teacher_name.as_deref()) {
        (Some(_), Some(teacher)) => format!("{} ({})", assignment.subject_name, teacher),
        _ => assignment.subject_name.clone(),
    }
}

/// Heading and batch lines for each conflict, numbered from 1
pub fn conflict_report(conflicts: &[ConflictGroup], days: &[String]) -> Vec<String> {
    if conflicts.is_empty() {
        return vec!["Your timetable has no teacher assignment conflicts.".to_string()];
    }
    let mut lines = Vec::new();
    for (i, conflict) in conflicts.iter().enumerate() {
        lines.push(format!(
            "Conflict #{}: {} assigned to multiple batches on {}, Period {}",
            i + 1,
            conflict.teacher_name,
            day_label(&conflict.day, days),
            conflict.period
        ));
        for entry in &conflict.entries {
            lines.push(format!("  -> Batch: {}", entry.batch_name));
        }
    }
    lines
}

/// Prints every batch of the grid as a day-by-period table
pub fn print_timetable(grid: &Grid, period_times: &[String]) {
    for timetable in grid.batches() {
        println!("\n=== Timetable for {} ===", timetable.batch.label());
        for (day, periods) in grid.days().iter().zip(timetable.slots()) {
            println!("{}:", day);
            for (period, slot) in periods.iter().enumerate() {
                let time = period_times.get(period).map(String::as_str).unwrap_or("");
                match slot {
                    Some(assignment) => println!(
                        "  {} {} -> {}",
                        period_label(period),
                        time,
                        format_assignment(assignment)
                    ),
                    None => println!("  {} {} -> [FREE]", period_label(period), time),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::conflicts::ConflictEntry;
    use crate::grid::default_days;

    #[test]
    fn numeric_days_map_to_names() {
        let days = default_days();
        assert_eq!(day_label("1", &days), "Monday");
        assert_eq!(day_label("6", &days), "Saturday");
        assert_eq!(day_label("9", &days), "Day 9");
        assert_eq!(day_label("0", &days), "Day 0");
        assert_eq!(day_label("Friday", &days), "Friday");
    }

    #[test]
    fn assignment_text_shows_teacher_when_chosen() {
        let partial = Assignment::new("1", "Math");
        assert_eq!(format_assignment(&partial), "Math");
        assert_eq!(format_assignment(&partial.with_teacher("10", "Alice")), "Math (Alice)");
    }

    #[test]
    fn report_lists_each_conflict_with_its_batches() {
        let conflicts = vec![ConflictGroup {
            teacher_id: "10".into(),
            teacher_name: "Alice".into(),
            day: "Monday".into(),
            period: 0,
            entries: vec![
                ConflictEntry {
                    batch_id: "A".into(),
                    batch_name: "Batch A".into(),
                    subject_name: "Math".into(),
                },
                ConflictEntry {
                    batch_id: "B".into(),
                    batch_name: "Batch B".into(),
                    subject_name: "Physics".into(),
                },
            ],
        }];

        let lines = conflict_report(&conflicts, &default_days());
        assert_eq!(
            lines,
            vec![
                "Conflict #1: Alice assigned to multiple batches on Monday, Period 0",
                "  -> Batch: Batch A",
                "  -> Batch: Batch B",
            ]
        );
        assert_eq!(conflict_report(&[], &default_days()).len(), 1);
    }

    #[test]
    fn toasts_carry_the_dismiss_hint() {
        let toast = Toast::error("Error", "Failed");
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.dismiss_after_ms, TOAST_DISMISS_MS);
        let value = serde_json::to_value(&toast).unwrap();
        assert_eq!(value["level"], "error");
    }
}
