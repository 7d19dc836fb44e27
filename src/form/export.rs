use std::io::Write;

use csv::WriterBuilder;

use crate::display::format_assignment;
use crate::error::Result;
use crate::grid::slot_utils::period_label;
use crate::grid::Grid;

/// Download name for an export taken at `now`
pub fn export_filename(now: chrono::NaiveDateTime) -> String {
    format!("timetable_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Writes every batch as a block of rows: a title, a header, one row per day, then a blank row.
///
/// `lunch_after` inserts a lunch column after that many periods.
pub fn write_timetable_csv<W: Write>(grid: &Grid, lunch_after: Option<usize>, mut writer: W) -> Result<()> {
    let periods = grid.periods_per_day();
    let lunch_at = lunch_after.filter(|&n| n > 0 && n < periods);

    for timetable in grid.batches() {
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(&mut writer);

        wtr.write_record([format!("Timetable for {}", timetable.batch.label())])?;

        let mut header = vec!["Day".to_string()];
        for period in 0..periods {
            if lunch_at == Some(period) {
                header.push("Lunch".to_string());
            }
            header.push(period_label(period));
        }
        wtr.write_record(&header)?;

        for (day, slots) in grid.days().iter().zip(timetable.slots()) {
            let mut row = vec![day.clone()];
            for (period, slot) in slots.iter().enumerate() {
                if lunch_at == Some(period) {
                    row.push("LUNCH".to_string());
                }
                row.push(match slot {
                    Some(assignment) => format_assignment(assignment),
                    None => "FREE".to_string(),
                });
            }
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        drop(wtr);
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(())
}

/// Renders the CSV export into memory
pub fn timetable_csv(grid: &Grid, lunch_after: Option<usize>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_timetable_csv(grid, lunch_after, &mut buffer)?;
    Ok(buffer)
}
