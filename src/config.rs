use std::env;

use crate::error::{EditorError, Result};
use crate::grid::{default_days, DEFAULT_PERIODS_PER_DAY, MAX_PERIODS_PER_DAY};

const MAX_IDLE_MINUTES: u64 = 60 * 24 * 365;

/// Process-wide settings, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    pub bind: String,
    pub port: u16,
    /// Used when a page does not supply its own day list
    pub days: Vec<String>,
    /// Used when a page does not supply its own period count
    pub periods_per_day: usize,
    pub print_base_url: String,
    /// Number of periods before the lunch break, if there is one
    pub lunch_after: Option<usize>,
    pub day_start: String,
    /// Editors untouched for this long are dropped; also the session cookie lifetime
    pub editor_idle_minutes: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            days: default_days(),
            periods_per_day: DEFAULT_PERIODS_PER_DAY,
            print_base_url: "/print_timetable".to_string(),
            lunch_after: Some(4),
            day_start: "09:00".to_string(),
            editor_idle_minutes: 12 * 60,
        }
    }
}

impl EditorConfig {
    /// Reads `TIMETABLE_*` variables, loading a `.env` file first if one exists
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("TIMETABLE_BIND") {
            config.bind = bind;
        }
        if let Some(port) = lookup("TIMETABLE_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| EditorError::Config(format!("TIMETABLE_PORT is not a port: {}", port)))?;
        }
        if let Some(days) = lookup("TIMETABLE_DAYS") {
            let days: Vec<String> = days
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            if days.is_empty() {
                return Err(EditorError::Config("TIMETABLE_DAYS lists no days".to_string()));
            }
            if days.iter().enumerate().any(|(i, day)| days[..i].contains(day)) {
                return Err(EditorError::Config(format!("TIMETABLE_DAYS repeats a day: {}", days.join(","))));
            }
            config.days = days;
        }
        if let Some(periods) = lookup("TIMETABLE_PERIODS_PER_DAY") {
            config.periods_per_day = match periods.trim().parse::<usize>() {
                Ok(n) if (1..=MAX_PERIODS_PER_DAY).contains(&n) => n,
                _ => {
                    return Err(EditorError::Config(format!(
                        "TIMETABLE_PERIODS_PER_DAY must be between 1 and {}: {}",
                        MAX_PERIODS_PER_DAY, periods
                    )))
                }
            };
        }
        if let Some(url) = lookup("TIMETABLE_PRINT_URL") {
            config.print_base_url = url;
        }
        if let Some(lunch) = lookup("TIMETABLE_LUNCH_AFTER") {
            let after: usize = lunch
                .trim()
                .parse()
                .map_err(|_| EditorError::Config(format!("TIMETABLE_LUNCH_AFTER is not a number: {}", lunch)))?;
            config.lunch_after = (after > 0).then_some(after);
        }
        if let Some(start) = lookup("TIMETABLE_DAY_START") {
            if crate::grid::slot_utils::parse_time_to_minutes(&start).is_none() {
                return Err(EditorError::Config(format!("TIMETABLE_DAY_START is not HH:MM: {}", start)));
            }
            config.day_start = start;
        }
        if let Some(minutes) = lookup("TIMETABLE_EDITOR_IDLE_MINUTES") {
            config.editor_idle_minutes = match minutes.trim().parse::<u64>() {
                Ok(n) if (1..=MAX_IDLE_MINUTES).contains(&n) => n,
                _ => {
                    return Err(EditorError::Config(format!(
                        "TIMETABLE_EDITOR_IDLE_MINUTES must be between 1 and {}: {}",
                        MAX_IDLE_MINUTES, minutes
                    )))
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = EditorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.days.len(), 6);
        assert_eq!(config.periods_per_day, 6);
    }

    #[test]
    fn reads_overrides() {
        let config = EditorConfig::from_lookup(lookup(&[
            ("TIMETABLE_PORT", "9000"),
            ("TIMETABLE_DAYS", "Monday, Tuesday ,Wednesday"),
            ("TIMETABLE_PERIODS_PER_DAY", "7"),
            ("TIMETABLE_LUNCH_AFTER", "0"),
            ("TIMETABLE_PRINT_URL", "/print"),
            ("TIMETABLE_EDITOR_IDLE_MINUTES", "30"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.days, vec!["Monday", "Tuesday", "Wednesday"]);
        assert_eq!(config.periods_per_day, 7);
        assert_eq!(config.lunch_after, None);
        assert_eq!(config.print_base_url, "/print");
        assert_eq!(config.editor_idle_minutes, 30);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(EditorConfig::from_lookup(lookup(&[("TIMETABLE_PORT", "http")])).is_err());
        assert!(EditorConfig::from_lookup(lookup(&[("TIMETABLE_PERIODS_PER_DAY", "0")])).is_err());
        assert!(EditorConfig::from_lookup(lookup(&[("TIMETABLE_PERIODS_PER_DAY", "25")])).is_err());
        assert!(EditorConfig::from_lookup(lookup(&[("TIMETABLE_DAYS", " , ")])).is_err());
        assert!(EditorConfig::from_lookup(lookup(&[("TIMETABLE_DAYS", "Monday,Monday")])).is_err());
        assert!(EditorConfig::from_lookup(lookup(&[("TIMETABLE_EDITOR_IDLE_MINUTES", "0")])).is_err());
        assert!(EditorConfig::from_lookup(lookup(&[("TIMETABLE_DAY_START", "9am")])).is_err());
    }
}
