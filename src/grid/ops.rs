use serde::Serialize;

use super::types::{Assignment, Grid, SlotRef};
use crate::error::{EditorError, Result};

/// Result of a grid operation that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Unchanged,
    /// The target holds content and the caller has not confirmed replacing it
    NeedsConfirmation,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

impl Grid {
    /// Places `assignment` at `at`. An occupied slot is only overwritten when `confirmed`.
    pub fn assign(&mut self, at: &SlotRef, assignment: Assignment, confirmed: bool) -> Result<Outcome> {
        let slot = self.slot_mut(at)?;
        if slot.is_some() && !confirmed {
            return Ok(Outcome::NeedsConfirmation);
        }
        *slot = Some(assignment);
        Ok(Outcome::Applied)
    }

    /// Exchanges the contents of two slots. A swap with an empty slot is a move.
    pub fn swap(&mut self, a: &SlotRef, b: &SlotRef) -> Result<Outcome> {
        let first = self.locate(a)?;
        let second = self.locate(b)?;
        if first == second {
            return Ok(Outcome::Unchanged);
        }

        let moved = self.slot_at_mut(first).take();
        let displaced = std::mem::replace(self.slot_at_mut(second), moved);
        *self.slot_at_mut(first) = displaced;

        if self.slot_at_mut(first).is_none() && self.slot_at_mut(second).is_none() {
            Ok(Outcome::Unchanged)
        } else {
            Ok(Outcome::Applied)
        }
    }

    /// Clears a slot. Removing from an empty slot does nothing.
    pub fn remove(&mut self, at: &SlotRef, confirmed: bool) -> Result<Outcome> {
        let slot = self.slot_mut(at)?;
        if slot.is_none() {
            return Ok(Outcome::Unchanged);
        }
        if !confirmed {
            return Ok(Outcome::NeedsConfirmation);
        }
        *slot = None;
        Ok(Outcome::Applied)
    }

    /// Replaces the teacher of an existing assignment; `None` clears the choice.
    pub fn set_teacher(&mut self, at: &SlotRef, teacher: Option<(String, String)>) -> Result<Outcome> {
        let slot = self.slot_mut(at)?;
        let Some(assignment) = slot.as_mut() else {
            return Err(EditorError::EmptySlot {
                batch: at.batch.clone(),
                day: at.day.clone(),
                period: at.period,
            });
        };

        let (teacher_id, teacher_name) = match teacher {
            Some((id, name)) if !id.is_empty() => (Some(id), Some(name)),
            _ => (None, None),
        };
        if assignment.teacher_id == teacher_id && assignment.teacher_name == teacher_name {
            return Ok(Outcome::Unchanged);
        }
        assignment.teacher_id = teacher_id;
        assignment.teacher_name = teacher_name;
        Ok(Outcome::Applied)
    }
}
