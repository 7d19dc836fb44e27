use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};
use crate::parser::{optional_id, parse_batch_string};

/// One cell of the submitted `timetable_data` field
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedCell {
    #[serde(default, deserialize_with = "optional_id")]
    pub subject_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub teacher_id: Option<String>,
}

/// `timetable_data` as it comes back with the form
pub type SubmittedTimetable = HashMap<String, HashMap<String, Vec<Option<SubmittedCell>>>>;

/// A complete assignment ready to be stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentRow {
    pub course_id: String,
    pub year: String,
    pub semester: String,
    pub batch_id: String,
    pub day: String,
    pub period: usize,
    pub subject_id: String,
    pub teacher_id: String,
}

pub fn parse_submission(timetable_data: &str) -> Result<SubmittedTimetable> {
    if timetable_data.trim().is_empty() {
        return Err(EditorError::Submission("No timetable data received".to_string()));
    }
    Ok(serde_json::from_str(timetable_data)?)
}

/// Validates submitted data and flattens it into rows.
///
/// Cells missing a subject or a teacher are skipped. Rows come out sorted by
/// batch, then by the position of the day in `days` (unknown days last, by
/// name), then by period.
pub fn submission_rows(submitted: &SubmittedTimetable, days: &[String]) -> Result<Vec<AssignmentRow>> {
    if submitted.is_empty() {
        return Err(EditorError::Submission("No timetable data received".to_string()));
    }

    let mut batches: Vec<&String> = submitted.keys().collect();
    batches.sort();

    let mut rows = Vec::new();
    for batch in batches {
        let key = parse_batch_string(batch)
            .map_err(|_| EditorError::Submission(format!("Unrecognised batch: {}", batch)))?;

        let batch_days = &submitted[batch];
        let mut day_names: Vec<&String> = batch_days.keys().collect();
        let rank = |d: &str| days.iter().position(|known| known == d).unwrap_or(usize::MAX);
        day_names.sort_by(|a, b| rank(a.as_str()).cmp(&rank(b.as_str())).then_with(|| a.cmp(b)));

        for day in day_names {
            for (period, cell) in batch_days[day].iter().enumerate() {
                let Some(cell) = cell else { continue };
                let (Some(subject_id), Some(teacher_id)) = (&cell.subject_id, &cell.teacher_id) else {
                    continue;
                };
                rows.push(AssignmentRow {
                    course_id: key.course_id.clone(),
                    year: key.year.clone(),
                    semester: key.semester.clone(),
                    batch_id: key.batch_id.clone(),
                    day: day.clone(),
                    period,
                    subject_id: subject_id.clone(),
                    teacher_id: teacher_id.clone(),
                });
            }
        }
    }

    Ok(rows)
}
