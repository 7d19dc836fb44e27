use std::collections::{BTreeMap, HashMap};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EditorError, Result};
use crate::grid::{Assignment, Batch, Grid, SlotRef, MAX_PERIODS_PER_DAY};

/// Accepts an id written either as a JSON string or a number
pub fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected an id, got {}", other))),
    }
}

/// Like [`id_string`], but `null` and `""` mean "not chosen"
pub fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected an id, got {}", other))),
    }
}

/// Values the server renders into the editor page's hidden inputs.
///
/// `all_subjects`, `all_days` and `periods_per_day` may arrive either as the
/// raw input text (JSON inside a string) or already decoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInputs {
    #[serde(default)]
    pub all_subjects: Option<Value>,
    #[serde(default)]
    pub current_batch: Option<String>,
    #[serde(default)]
    pub all_days: Option<Value>,
    #[serde(default)]
    pub periods_per_day: Option<Value>,
    #[serde(default)]
    pub batches: Vec<String>,
    #[serde(default)]
    pub batch_names: HashMap<String, String>,
    #[serde(default)]
    pub timetable: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTeacher {
    #[serde(deserialize_with = "id_string")]
    pub teacher_id: String,
    pub teacher_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSubject {
    #[serde(deserialize_with = "id_string")]
    pub subject_id: String,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub teachers: Vec<CatalogTeacher>,
}

/// A subject as listed in the side panel of the active batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectView {
    pub name: String,
    pub subject_id: String,
    pub subject_code: Option<String>,
    pub teachers: Vec<CatalogTeacher>,
}

/// Batch → subject name → subject, as supplied by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(HashMap<String, BTreeMap<String, CatalogSubject>>);

impl Catalog {
    /// Decodes the catalog input. Malformed data is logged and yields an empty catalog.
    pub fn from_input(input: Option<&Value>) -> Self {
        let Some(input) = input else {
            return Self::default();
        };
        let decoded = match input {
            Value::String(text) if text.trim().is_empty() => return Self::default(),
            Value::String(text) => serde_json::from_str(text),
            other => serde_json::from_value(other.clone()),
        };
        match decoded {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(error = %e, "could not read subject catalog, continuing without it");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn batch_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Subjects for `batch` in name order; empty when the batch is not in the catalog
    pub fn subjects(&self, batch: &str) -> Vec<SubjectView> {
        self.0
            .get(batch)
            .map(|subjects| {
                subjects
                    .iter()
                    .map(|(name, subject)| SubjectView {
                        name: name.clone(),
                        subject_id: subject.subject_id.clone(),
                        subject_code: subject.subject_code.clone(),
                        teachers: subject.teachers.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Looks a subject up by id, returning its display name alongside it
    pub fn subject(&self, batch: &str, subject_id: &str) -> Option<(&str, &CatalogSubject)> {
        self.0
            .get(batch)?
            .iter()
            .find(|(_, subject)| subject.subject_id == subject_id)
            .map(|(name, subject)| (name.as_str(), subject))
    }

    pub fn teacher_name(&self, batch: &str, subject_id: &str, teacher_id: &str) -> Option<&str> {
        let (_, subject) = self.subject(batch, subject_id)?;
        subject
            .teachers
            .iter()
            .find(|t| t.teacher_id == teacher_id)
            .map(|t| t.teacher_name.as_str())
    }
}

/// The pieces of a composite batch identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchKey {
    pub course_id: String,
    pub year: String,
    pub semester: String,
    pub batch_id: String,
}

impl BatchKey {
    pub fn query_string(&self) -> String {
        format!(
            "course_id={}&year={}&semester={}&batch_id={}",
            self.course_id, self.year, self.semester, self.batch_id
        )
    }
}

/// Splits "course,year, semester, batch" into its parts
pub fn parse_batch_string(batch_string: &str) -> Result<BatchKey> {
    let parts: Vec<&str> = batch_string.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return Err(EditorError::InvalidBatchKey(batch_string.to_string()));
    }
    let course_id = parts[0].replace(['{', '}'], "");
    Ok(BatchKey {
        course_id,
        year: parts[1].to_string(),
        semester: parts[2].to_string(),
        batch_id: parts[3].to_string(),
    })
}

/// Data carried from a drag start to the matching drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    #[serde(deserialize_with = "id_string")]
    pub subject_id: String,
    pub subject_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_code: Option<String>,
    #[serde(default, deserialize_with = "optional_id", skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_cell: bool,
}

impl DragPayload {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn parse_drag_payload(text: &str) -> Result<DragPayload> {
    serde_json::from_str(text).map_err(|e| EditorError::InvalidPayload(e.to_string()))
}

/// A pre-filled cell as rendered by the server
#[derive(Debug, Deserialize)]
struct CellSeed {
    #[serde(deserialize_with = "id_string")]
    subject_id: String,
    subject_name: String,
    #[serde(default, deserialize_with = "optional_id")]
    teacher_id: Option<String>,
    #[serde(default)]
    teacher_name: Option<String>,
}

impl From<CellSeed> for Assignment {
    fn from(seed: CellSeed) -> Self {
        let teacher_name = seed.teacher_id.as_ref().and(seed.teacher_name);
        Assignment {
            subject_id: seed.subject_id,
            subject_name: seed.subject_name,
            teacher_id: seed.teacher_id,
            teacher_name,
        }
    }
}

/// Everything the editor needs from a freshly rendered page
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub catalog: Catalog,
    pub current_batch: String,
    pub grid: Grid,
}

fn decode_text_or_value<T: serde::de::DeserializeOwned>(value: &Value) -> std::result::Result<T, serde_json::Error> {
    match value {
        Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    }
}

fn parse_days(input: Option<&Value>, default_days: &[String]) -> Vec<String> {
    let days = match input.map(decode_text_or_value::<Vec<String>>) {
        Some(Ok(days)) => days,
        Some(Err(e)) => {
            tracing::error!(error = %e, "could not read day list, using configured days");
            return default_days.to_vec();
        }
        None => return default_days.to_vec(),
    };
    let repeated = days.iter().enumerate().any(|(i, day)| days[..i].contains(day));
    if days.is_empty() || repeated {
        tracing::error!(days = ?days, "day list is empty or repeats a day, using configured days");
        return default_days.to_vec();
    }
    days
}

fn parse_periods(input: Option<&Value>, default_periods: usize) -> usize {
    let parsed = match input {
        None => return default_periods,
        Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(Value::String(text)) => text.trim().parse::<usize>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(periods) if (1..=MAX_PERIODS_PER_DAY).contains(&periods) => periods,
        _ => {
            tracing::error!(input = ?input, "could not read periods per day, using configured value");
            default_periods
        }
    }
}

/// Fills `grid` from the server-rendered `{batch: {day: [cell | "" | null]}}` structure
pub fn seed_cells(grid: &mut Grid, timetable: &Value) {
    let Some(batches) = timetable.as_object() else {
        tracing::warn!("pre-rendered timetable is not an object, starting empty");
        return;
    };
    for (batch, days) in batches {
        let Some(days) = days.as_object() else { continue };
        for (day, cells) in days {
            let Some(cells) = cells.as_array() else { continue };
            for (period, cell) in cells.iter().enumerate() {
                if !cell.is_object() {
                    continue;
                }
                let seed = match serde_json::from_value::<CellSeed>(cell.clone()) {
                    Ok(seed) => seed,
                    Err(e) => {
                        tracing::warn!(batch = %batch, day = %day, period, error = %e, "skipping unreadable cell");
                        continue;
                    }
                };
                let at = SlotRef::new(batch.as_str(), day.as_str(), period);
                if let Err(e) = grid.assign(&at, seed.into(), true) {
                    tracing::warn!(error = %e, "skipping cell outside the grid");
                }
            }
        }
    }
}

/// Builds the editor's starting state from the page inputs.
///
/// Days and periods fall back to the given defaults when missing or malformed.
/// Batches are registered in the order the page lists them; when the page
/// lists none, the pre-rendered timetable and then the catalog supply them.
pub fn load_page(inputs: &PageInputs, default_days: &[String], default_periods: usize) -> Result<LoadedPage> {
    let catalog = Catalog::from_input(inputs.all_subjects.as_ref());
    let days = parse_days(inputs.all_days.as_ref(), default_days);
    let periods_per_day = parse_periods(inputs.periods_per_day.as_ref(), default_periods);
    let mut grid = Grid::new(days, periods_per_day)?;

    let mut batch_ids: Vec<String> = inputs.batches.clone();
    if batch_ids.is_empty() {
        if let Some(rendered) = inputs.timetable.as_ref().and_then(Value::as_object) {
            batch_ids.extend(rendered.keys().cloned());
        }
    }
    if batch_ids.is_empty() {
        let mut from_catalog: Vec<String> = catalog.batch_ids().map(str::to_string).collect();
        from_catalog.sort();
        batch_ids = from_catalog;
    }
    for id in batch_ids {
        let batch = match inputs.batch_names.get(&id) {
            Some(name) => Batch::named(id.as_str(), name.as_str()),
            None => Batch::new(id.as_str()),
        };
        if let Err(e) = grid.add_batch(batch) {
            tracing::warn!(error = %e, "ignoring repeated batch");
        }
    }

    if let Some(timetable) = &inputs.timetable {
        seed_cells(&mut grid, timetable);
    }

    let requested = inputs.current_batch.clone().unwrap_or_default();
    let current_batch = if grid.has_batch(&requested) {
        requested
    } else {
        let fallback = grid
            .batches()
            .first()
            .map(|b| b.batch.id.clone())
            .unwrap_or_default();
        if !requested.is_empty() {
            tracing::warn!(requested = %requested, fallback = %fallback, "active batch not in timetable");
        }
        fallback
    };

    tracing::info!(
        batches = grid.batches().len(),
        days = grid.days().len(),
        periods = grid.periods_per_day(),
        subjects_loaded = !catalog.is_empty(),
        "timetable page loaded"
    );

    Ok(LoadedPage {
        catalog,
        current_batch,
        grid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::default_days;
    use serde_json::json;

    fn catalog_json() -> Value {
        json!({
            "1,2024, 1, A": {
                "Physics": {"subject_id": 2, "subject_code": "PH101",
                            "teachers": [{"teacher_id": 11, "teacher_name": "Bob"}]},
                "Math": {"subject_id": 1, "subject_code": "MA101",
                         "teachers": [{"teacher_id": 10, "teacher_name": "Alice"},
                                      {"teacher_id": 12, "teacher_name": "Carol"}]}
            }
        })
    }

    #[test]
    fn catalog_accepts_numeric_ids_and_lists_subjects_by_name() {
        let text = Value::String(catalog_json().to_string());
        let catalog = Catalog::from_input(Some(&text));

        let subjects = catalog.subjects("1,2024, 1, A");
        let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Math", "Physics"]);
        assert_eq!(subjects[0].subject_id, "1");
        assert_eq!(subjects[0].teachers[1].teacher_id, "12");

        assert_eq!(catalog.teacher_name("1,2024, 1, A", "1", "12"), Some("Carol"));
        assert_eq!(catalog.subject("1,2024, 1, A", "2").map(|(name, _)| name), Some("Physics"));
        assert!(catalog.subjects("unknown").is_empty());
    }

    #[test]
    fn malformed_catalog_leaves_it_empty() {
        let catalog = Catalog::from_input(Some(&Value::String("{not json".into())));
        assert!(catalog.is_empty());
        assert!(Catalog::from_input(Some(&json!([1, 2, 3]))).is_empty());
        assert!(Catalog::from_input(None).is_empty());
    }

    #[test]
    fn batch_strings_split_into_their_parts() {
        let key = parse_batch_string("3,2024, 2, B").unwrap();
        assert_eq!(key.query_string(), "course_id=3&year=2024&semester=2&batch_id=B");

        let braced = parse_batch_string("{3}, 2024, 2, B").unwrap();
        assert_eq!(braced.course_id, "3");
        assert!(matches!(parse_batch_string("3,2024"), Err(EditorError::InvalidBatchKey(_))));
    }

    #[test]
    fn drag_payload_reads_cell_and_subject_variants() {
        let from_list = parse_drag_payload(r#"{"subjectId":"1","subjectName":"Math","subjectCode":"MA101"}"#).unwrap();
        assert!(!from_list.from_cell);
        assert_eq!(from_list.teacher_id, None);

        let from_cell = parse_drag_payload(
            r#"{"subjectId":1,"subjectName":"Math","teacherId":"","teacherName":"","fromCell":true}"#,
        )
        .unwrap();
        assert!(from_cell.from_cell);
        assert_eq!(from_cell.subject_id, "1");
        assert_eq!(from_cell.teacher_id, None);

        assert!(matches!(parse_drag_payload("undefined"), Err(EditorError::InvalidPayload(_))));
        assert!(parse_drag_payload(r#"{"subjectName":"Math"}"#).is_err());
    }

    #[test]
    fn page_load_seeds_cells_and_skips_placeholders() {
        let inputs = PageInputs {
            all_subjects: Some(catalog_json()),
            current_batch: Some("1,2024, 1, A".into()),
            all_days: Some(Value::String(r#"["Monday","Tuesday"]"#.into())),
            periods_per_day: Some(Value::String("3".into())),
            batches: vec!["1,2024, 1, A".into(), "1,2024, 1, B".into()],
            batch_names: HashMap::new(),
            timetable: Some(json!({
                "1,2024, 1, A": {
                    "Monday": [
                        {"display": "Math (Alice)", "subject_id": 1, "subject_name": "Math",
                         "teacher_id": 10, "teacher_name": "Alice"},
                        "",
                        null
                    ],
                    "Tuesday": ["", "", {"subject_id": 2, "subject_name": "Physics"}],
                    "Sunday": [{"subject_id": 2, "subject_name": "Physics"}]
                }
            })),
        };

        let page = load_page(&inputs, &default_days(), 6).unwrap();
        assert_eq!(page.grid.days(), ["Monday".to_string(), "Tuesday".to_string()]);
        assert_eq!(page.grid.periods_per_day(), 3);
        assert_eq!(page.grid.batches().len(), 2);
        assert_eq!(page.current_batch, "1,2024, 1, A");

        let monday = page.grid.slot(&SlotRef::new("1,2024, 1, A", "Monday", 0)).unwrap();
        assert_eq!(monday.as_ref().and_then(|a| a.teacher_name.as_deref()), Some("Alice"));
        assert!(page.grid.slot(&SlotRef::new("1,2024, 1, A", "Monday", 1)).unwrap().is_none());
        let tuesday = page.grid.slot(&SlotRef::new("1,2024, 1, A", "Tuesday", 2)).unwrap();
        assert_eq!(tuesday.as_ref().map(|a| a.subject_name.as_str()), Some("Physics"));
    }

    #[test]
    fn malformed_inputs_fall_back_to_defaults() {
        let inputs = PageInputs {
            all_subjects: Some(Value::String("oops".into())),
            current_batch: Some("missing".into()),
            all_days: Some(Value::String("Monday".into())),
            periods_per_day: Some(Value::String("six".into())),
            batches: vec!["A".into()],
            ..PageInputs::default()
        };

        let page = load_page(&inputs, &default_days(), 6).unwrap();
        assert!(page.catalog.is_empty());
        assert_eq!(page.grid.days().len(), 6);
        assert_eq!(page.grid.periods_per_day(), 6);
        assert_eq!(page.current_batch, "A");
    }

    #[test]
    fn empty_or_repeated_day_lists_fall_back_to_defaults() {
        for days in [json!([]), json!(["Monday", "Monday"]), Value::String("[]".into())] {
            let inputs = PageInputs {
                all_days: Some(days),
                batches: vec!["A".into()],
                ..PageInputs::default()
            };
            let page = load_page(&inputs, &default_days(), 6).unwrap();
            assert_eq!(page.grid.days(), default_days().as_slice());
        }
    }

    #[test]
    fn oversized_period_counts_fall_back_to_defaults() {
        for periods in [
            Value::String("100000000000000000".into()),
            json!(100000000000000000u64),
            json!(MAX_PERIODS_PER_DAY + 1),
            Value::String("0".into()),
        ] {
            let inputs = PageInputs {
                periods_per_day: Some(periods),
                batches: vec!["A".into()],
                ..PageInputs::default()
            };
            let page = load_page(&inputs, &default_days(), 6).unwrap();
            assert_eq!(page.grid.periods_per_day(), 6);
        }

        let inputs = PageInputs {
            periods_per_day: Some(json!(MAX_PERIODS_PER_DAY)),
            batches: vec!["A".into()],
            ..PageInputs::default()
        };
        assert_eq!(load_page(&inputs, &default_days(), 6).unwrap().grid.periods_per_day(), MAX_PERIODS_PER_DAY);
    }

    #[test]
    fn batches_come_from_the_catalog_when_the_page_lists_none() {
        let inputs = PageInputs {
            all_subjects: Some(catalog_json()),
            ..PageInputs::default()
        };
        let page = load_page(&inputs, &default_days(), 6).unwrap();
        assert!(page.grid.has_batch("1,2024, 1, A"));
        assert_eq!(page.current_batch, "1,2024, 1, A");
    }
}
