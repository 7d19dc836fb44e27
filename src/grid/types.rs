use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};

/// One subject placed in a cell, with its teacher once one has been chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub subject_id: String,
    pub subject_name: String,
    pub teacher_id: Option<String>,
    pub teacher_name: Option<String>,
}

impl Assignment {
    pub fn new(subject_id: impl Into<String>, subject_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_name: subject_name.into(),
            teacher_id: None,
            teacher_name: None,
        }
    }

    pub fn with_teacher(mut self, teacher_id: impl Into<String>, teacher_name: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self.teacher_name = Some(teacher_name.into());
        self
    }

    /// Teacher id, ignoring the empty placeholder value
    pub fn teacher(&self) -> Option<&str> {
        self.teacher_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn state(&self) -> SlotState {
        if self.teacher().is_some() {
            SlotState::FullyAssigned
        } else {
            SlotState::PartiallyAssigned
        }
    }
}

pub type Slot = Option<Assignment>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    PartiallyAssigned,
    FullyAssigned,
}

/// Address of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub batch: String,
    pub day: String,
    pub period: usize,
}

impl SlotRef {
    pub fn new(batch: impl Into<String>, day: impl Into<String>, period: usize) -> Self {
        Self {
            batch: batch.into(),
            day: day.into(),
            period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub name: Option<String>,
}

impl Batch {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: None }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Batch {}", self.id),
        }
    }
}

/// A batch together with its cells, indexed `[day][period]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTimetable {
    pub batch: Batch,
    pub(crate) slots: Vec<Vec<Slot>>,
}

impl BatchTimetable {
    pub fn slots(&self) -> &[Vec<Slot>] {
        &self.slots
    }
}

/// Batch × day × period grid of optional assignments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    days: Vec<String>,
    periods_per_day: usize,
    batches: Vec<BatchTimetable>,
}

impl Grid {
    pub fn new(days: Vec<String>, periods_per_day: usize) -> Result<Self> {
        if days.is_empty() {
            return Err(EditorError::InvalidGrid("at least one day is required".to_string()));
        }
        if periods_per_day == 0 || periods_per_day > MAX_PERIODS_PER_DAY {
            return Err(EditorError::InvalidGrid(format!(
                "periods per day must be between 1 and {}",
                MAX_PERIODS_PER_DAY
            )));
        }
        for (i, day) in days.iter().enumerate() {
            if days[..i].contains(day) {
                return Err(EditorError::InvalidGrid(format!("day listed twice: {}", day)));
            }
        }
        Ok(Self {
            days,
            periods_per_day,
            batches: Vec::new(),
        })
    }

    pub fn days(&self) -> &[String] {
        &self.days
    }

    pub fn periods_per_day(&self) -> usize {
        self.periods_per_day
    }

    pub fn batches(&self) -> &[BatchTimetable] {
        &self.batches
    }

    pub fn batch(&self, batch_id: &str) -> Option<&BatchTimetable> {
        self.batches.iter().find(|b| b.batch.id == batch_id)
    }

    pub fn has_batch(&self, batch_id: &str) -> bool {
        self.batch(batch_id).is_some()
    }

    /// Registers an empty timetable for `batch`. Registration order is traversal order.
    pub fn add_batch(&mut self, batch: Batch) -> Result<()> {
        if self.has_batch(&batch.id) {
            return Err(EditorError::DuplicateBatch(batch.id));
        }
        let slots = vec![vec![None; self.periods_per_day]; self.days.len()];
        self.batches.push(BatchTimetable { batch, slots });
        Ok(())
    }

    pub fn day_index(&self, day: &str) -> Option<usize> {
        self.days.iter().position(|d| d == day)
    }

    /// Resolves a reference to `(batch, day, period)` indices
    pub(crate) fn locate(&self, at: &SlotRef) -> Result<(usize, usize, usize)> {
        let invalid = || EditorError::InvalidSlot {
            batch: at.batch.clone(),
            day: at.day.clone(),
            period: at.period,
        };
        let b = self
            .batches
            .iter()
            .position(|t| t.batch.id == at.batch)
            .ok_or_else(invalid)?;
        let d = self.day_index(&at.day).ok_or_else(invalid)?;
        if at.period >= self.periods_per_day {
            return Err(invalid());
        }
        Ok((b, d, at.period))
    }

    pub fn slot(&self, at: &SlotRef) -> Result<&Slot> {
        let (b, d, p) = self.locate(at)?;
        Ok(&self.batches[b].slots[d][p])
    }

    pub fn slot_state(&self, at: &SlotRef) -> Result<SlotState> {
        Ok(self
            .slot(at)?
            .as_ref()
            .map(Assignment::state)
            .unwrap_or(SlotState::Empty))
    }

    pub(crate) fn slot_mut(&mut self, at: &SlotRef) -> Result<&mut Slot> {
        let (b, d, p) = self.locate(at)?;
        Ok(&mut self.batches[b].slots[d][p])
    }

    pub(crate) fn slot_at_mut(&mut self, (b, d, p): (usize, usize, usize)) -> &mut Slot {
        &mut self.batches[b].slots[d][p]
    }

    /// Every cell in traversal order: batch registration, then day, then period
    pub fn cells(&self) -> impl Iterator<Item = (&Batch, &str, usize, &Slot)> + '_ {
        self.batches.iter().flat_map(move |t| {
            self.days.iter().zip(t.slots.iter()).flat_map(move |(day, periods)| {
                periods
                    .iter()
                    .enumerate()
                    .map(move |(period, slot)| (&t.batch, day.as_str(), period, slot))
            })
        })
    }
}

pub fn default_days() -> Vec<String> {
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

pub const DEFAULT_PERIODS_PER_DAY: usize = 6;
pub const MAX_PERIODS_PER_DAY: usize = 24;
