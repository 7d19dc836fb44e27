/// Length of one teaching period in minutes
pub const PERIOD_MINUTES: u32 = 55;
/// Changeover between two periods
pub const BREAK_MINUTES: u32 = 5;
/// Extra time added by the lunch break
pub const LUNCH_MINUTES: u32 = 30;

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<u32> {
    let (hours, minutes) = time_str.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight to time string (HH:MM)
pub fn minutes_to_time_string(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    format!("{:02}:{:02}", hours % 24, mins)
}

/// Clock ranges for each period of a day, e.g. "09:00 - 09:55"
///
/// Period 1 starts at `day_start`; each following period starts
/// `PERIOD_MINUTES + BREAK_MINUTES` later. When `lunch_after` is set, the
/// period after that many periods starts `LUNCH_MINUTES` later still.
pub fn period_times(day_start: &str, periods_per_day: usize, lunch_after: Option<usize>) -> Vec<String> {
    let mut current = parse_time_to_minutes(day_start).unwrap_or(9 * 60);
    let mut times = Vec::with_capacity(periods_per_day);

    for period in 0..periods_per_day {
        if period > 0 && lunch_after == Some(period) {
            current += LUNCH_MINUTES;
        }
        times.push(format!(
            "{} - {}",
            minutes_to_time_string(current),
            minutes_to_time_string(current + PERIOD_MINUTES)
        ));
        current += PERIOD_MINUTES + BREAK_MINUTES;
    }

    times
}

/// Header label for a zero-based period index
pub fn period_label(period: usize) -> String {
    format!("Period {}", period + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_clock_times() {
        assert_eq!(parse_time_to_minutes("09:30"), Some(570));
        assert_eq!(parse_time_to_minutes("24:00"), None);
        assert_eq!(parse_time_to_minutes("nine"), None);
        assert_eq!(minutes_to_time_string(570), "09:30");
        assert_eq!(minutes_to_time_string(24 * 60 + 5), "00:05");
    }

    #[test]
    fn six_periods_with_lunch_after_the_fourth() {
        assert_eq!(
            period_times("09:00", 6, Some(4)),
            vec![
                "09:00 - 09:55",
                "10:00 - 10:55",
                "11:00 - 11:55",
                "12:00 - 12:55",
                "13:30 - 14:25",
                "14:30 - 15:25",
            ]
        );
    }

    #[test]
    fn no_lunch_keeps_a_steady_rhythm() {
        let times = period_times("08:00", 3, None);
        assert_eq!(times, vec!["08:00 - 08:55", "09:00 - 09:55", "10:00 - 10:55"]);
    }

    #[test]
    fn labels_are_one_based() {
        assert_eq!(period_label(0), "Period 1");
    }
}
