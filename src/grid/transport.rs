use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::types::{Assignment, Grid};
use crate::error::Result;

/// Wire form of a filled cell in the `timetable_data` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDto {
    pub subject_id: String,
    pub teacher_id: Option<String>,
    pub subject_name: String,
    pub teacher_name: Option<String>,
}

impl From<&Assignment> for AssignmentDto {
    fn from(a: &Assignment) -> Self {
        Self {
            subject_id: a.subject_id.clone(),
            teacher_id: a.teacher_id.clone(),
            subject_name: a.subject_name.clone(),
            teacher_name: a.teacher_name.clone(),
        }
    }
}

type DayRow = (String, Vec<Option<AssignmentDto>>);

/// `{ batch: { day: [cell | null; periods_per_day] } }`, keyed in grid order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportGrid {
    batches: Vec<(String, Vec<DayRow>)>,
}

impl TransportGrid {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

struct Days<'a>(&'a [DayRow]);

impl Serialize for Days<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (day, cells) in self.0 {
            map.serialize_entry(day, cells)?;
        }
        map.end()
    }
}

impl Serialize for TransportGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.batches.len()))?;
        for (batch, days) in &self.batches {
            map.serialize_entry(batch, &Days(days))?;
        }
        map.end()
    }
}

impl Grid {
    /// Snapshot of every slot in wire form
    pub fn to_transport(&self) -> TransportGrid {
        let batches = self
            .batches()
            .iter()
            .map(|timetable| {
                let days = self
                    .days()
                    .iter()
                    .zip(timetable.slots())
                    .map(|(day, periods)| {
                        let cells = periods
                            .iter()
                            .map(|slot| slot.as_ref().map(AssignmentDto::from))
                            .collect();
                        (day.clone(), cells)
                    })
                    .collect();
                (timetable.batch.id.clone(), days)
            })
            .collect();
        TransportGrid { batches }
    }
}
