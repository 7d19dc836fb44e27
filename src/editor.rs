use serde::Serialize;

use crate::display::{day_label, Toast};
use crate::error::{EditorError, Result};
use crate::grid::{Assignment, Command, ConflictGroup, Grid, Outcome, SlotRef, SlotState};
use crate::parser::{self, Catalog, DragPayload, LoadedPage, PageInputs, SubjectView};

pub const REPLACE_PROMPT: &str = "Replace existing assignment?";
pub const REMOVE_PROMPT: &str = "Remove this assignment?";

/// Page-level inputs the editor works against
#[derive(Debug, Clone)]
pub struct EditorContext {
    pub catalog: Catalog,
    pub current_batch: String,
}

/// What the page should do after a gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Feedback {
    /// The gesture finished; show the toast
    Done { toast: Toast },
    /// Ask the user, then repeat the gesture with confirmation
    Confirm { prompt: String },
    /// Nothing to do
    Ignored,
}

impl Feedback {
    fn done(toast: Toast) -> Self {
        Feedback::Done { toast }
    }

    fn confirm(prompt: &str) -> Self {
        Feedback::Confirm {
            prompt: prompt.to_string(),
        }
    }
}

/// Editing state for one open timetable page.
///
/// Owns the grid and keeps the hidden `timetable_data` value in step with it:
/// every applied mutation re-serializes before control returns.
#[derive(Debug, Clone)]
pub struct TimetableEditor {
    context: EditorContext,
    grid: Grid,
    timetable_data: String,
    selected: Option<SlotRef>,
    drag_source: Option<SlotRef>,
}

impl TimetableEditor {
    pub fn new(context: EditorContext, grid: Grid) -> Result<Self> {
        let mut editor = Self {
            context,
            grid,
            timetable_data: String::new(),
            selected: None,
            drag_source: None,
        };
        editor.sync()?;
        Ok(editor)
    }

    pub fn from_page(inputs: &PageInputs, default_days: &[String], default_periods: usize) -> Result<Self> {
        let LoadedPage {
            catalog,
            current_batch,
            grid,
        } = parser::load_page(inputs, default_days, default_periods)?;
        Self::new(EditorContext { catalog, current_batch }, grid)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn current_batch(&self) -> &str {
        &self.context.current_batch
    }

    pub fn selected(&self) -> Option<&SlotRef> {
        self.selected.as_ref()
    }

    /// Current value of the hidden `timetable_data` field
    pub fn timetable_data(&self) -> &str {
        &self.timetable_data
    }

    fn sync(&mut self) -> Result<()> {
        self.timetable_data = self.grid.to_transport().to_json()?;
        Ok(())
    }

    /// Applies one command, re-serializing when the grid changed
    pub fn apply(&mut self, command: Command) -> Result<Outcome> {
        tracing::debug!(?command, "applying command");
        let outcome = self.grid.apply(command)?;
        if outcome.is_applied() {
            self.sync()?;
        }
        Ok(outcome)
    }

    /// Applies commands in order, stopping at the first error
    pub fn apply_all(&mut self, commands: Vec<Command>) -> Result<Vec<Outcome>> {
        commands.into_iter().map(|c| self.apply(c)).collect()
    }

    pub fn conflicts(&self) -> Vec<ConflictGroup> {
        self.grid.detect_conflicts()
    }

    pub fn subjects(&self) -> Vec<SubjectView> {
        self.context.catalog.subjects(&self.context.current_batch)
    }

    /// Makes `batch_id` the active batch and returns its subject list
    pub fn switch_batch(&mut self, batch_id: &str) -> Result<Vec<SubjectView>> {
        if !self.grid.has_batch(batch_id) {
            return Err(EditorError::UnknownBatch(batch_id.to_string()));
        }
        self.context.current_batch = batch_id.to_string();
        self.selected = None;
        Ok(self.subjects())
    }

    /// Marks an empty cell as the target for the subject buttons.
    /// Returns `false` when the cell already holds an assignment.
    pub fn select_cell(&mut self, at: SlotRef) -> Result<bool> {
        if self.grid.slot_state(&at)? != SlotState::Empty {
            return Ok(false);
        }
        self.selected = Some(at);
        Ok(true)
    }

    fn assigned_toast(&self, subject_name: &str, at: &SlotRef) -> Toast {
        Toast::success(
            "Assignment Added",
            format!(
                "{} assigned to {}, Period {}",
                subject_name,
                day_label(&at.day, self.grid.days()),
                at.period
            ),
        )
    }

    /// Subject button: places a catalog subject, with the chosen teacher, in the selected cell
    pub fn add_to_selected(&mut self, subject_id: &str, teacher_id: Option<&str>, confirmed: bool) -> Result<Feedback> {
        let Some(at) = self.selected.clone() else {
            return Ok(Feedback::done(Toast::error(
                "Error",
                "Please select a cell in the timetable first",
            )));
        };

        let catalog = &self.context.catalog;
        let (subject_name, _) = catalog
            .subject(&at.batch, subject_id)
            .ok_or_else(|| EditorError::UnknownSubject {
                batch: at.batch.clone(),
                subject_id: subject_id.to_string(),
            })?;
        let subject_name = subject_name.to_string();
        let mut assignment = Assignment::new(subject_id, subject_name.as_str());
        if let Some(teacher_id) = teacher_id.filter(|id| !id.is_empty()) {
            let teacher_name = catalog
                .teacher_name(&at.batch, subject_id, teacher_id)
                .unwrap_or(teacher_id)
                .to_string();
            assignment = assignment.with_teacher(teacher_id, teacher_name);
        }

        match self.assign(&at, assignment, confirmed)? {
            Outcome::NeedsConfirmation => Ok(Feedback::confirm(REPLACE_PROMPT)),
            _ => {
                self.selected = None;
                Ok(Feedback::done(self.assigned_toast(&subject_name, &at)))
            }
        }
    }

    fn assign(&mut self, at: &SlotRef, assignment: Assignment, confirmed: bool) -> Result<Outcome> {
        self.apply(Command::Assign {
            at: at.clone(),
            subject_id: assignment.subject_id,
            subject_name: assignment.subject_name,
            teacher_id: assignment.teacher_id,
            teacher_name: assignment.teacher_name,
            confirmed,
        })
    }

    /// Drag start on a subject of the active batch's list
    pub fn drag_subject(&mut self, subject_id: &str) -> Result<String> {
        let batch = &self.context.current_batch;
        let (name, subject) = self
            .context
            .catalog
            .subject(batch, subject_id)
            .ok_or_else(|| EditorError::UnknownSubject {
                batch: batch.clone(),
                subject_id: subject_id.to_string(),
            })?;
        let payload = DragPayload {
            subject_id: subject.subject_id.clone(),
            subject_name: name.to_string(),
            subject_code: subject.subject_code.clone(),
            teacher_id: None,
            teacher_name: None,
            from_cell: false,
        };
        self.drag_source = None;
        payload.to_json()
    }

    /// Drag start on a filled cell; remembers the cell as the swap source
    pub fn drag_cell(&mut self, at: SlotRef) -> Result<String> {
        let assignment = self.grid.slot(&at)?.as_ref().ok_or_else(|| EditorError::EmptySlot {
            batch: at.batch.clone(),
            day: at.day.clone(),
            period: at.period,
        })?;
        let payload = DragPayload {
            subject_id: assignment.subject_id.clone(),
            subject_name: assignment.subject_name.clone(),
            subject_code: None,
            teacher_id: assignment.teacher().map(str::to_string),
            teacher_name: assignment.teacher().and(assignment.teacher_name.clone()),
            from_cell: true,
        };
        let json = payload.to_json()?;
        self.drag_source = Some(at);
        Ok(json)
    }

    /// Drag ended without a drop; nothing changes
    pub fn end_drag(&mut self) {
        self.drag_source = None;
    }

    /// Drop on a cell. Unreadable payloads are reported and leave the grid as it was.
    pub fn drop_on(&mut self, target: SlotRef, payload: &str, confirmed: bool) -> Result<Feedback> {
        let payload = match parser::parse_drag_payload(payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "rejected drop");
                return Ok(Feedback::done(Toast::error(
                    "Error",
                    "Failed to assign subject. Please try again.",
                )));
            }
        };
        self.grid.slot(&target)?;

        if payload.from_cell {
            if let Some(source) = self.drag_source.clone() {
                if source == target {
                    self.drag_source = None;
                    return Ok(Feedback::Ignored);
                }
                let outcome = self.apply(Command::Swap {
                    from: source,
                    to: target,
                })?;
                self.drag_source = None;
                if !outcome.is_applied() {
                    return Ok(Feedback::Ignored);
                }
                return Ok(Feedback::done(Toast::success(
                    "Assignment Swapped",
                    "Timetable assignments have been swapped",
                )));
            }
        }

        let mut assignment = Assignment::new(payload.subject_id, payload.subject_name.as_str());
        if payload.from_cell {
            if let Some(teacher_id) = payload.teacher_id {
                let teacher_name = payload.teacher_name.unwrap_or_else(|| teacher_id.clone());
                assignment = assignment.with_teacher(teacher_id, teacher_name);
            }
        }

        match self.assign(&target, assignment, confirmed)? {
            Outcome::NeedsConfirmation => Ok(Feedback::confirm(REPLACE_PROMPT)),
            _ => Ok(Feedback::done(self.assigned_toast(&payload.subject_name, &target))),
        }
    }

    /// Teacher picker changed on a cell. An empty id puts the placeholder back.
    pub fn change_teacher(&mut self, at: SlotRef, teacher_id: &str, teacher_name: Option<&str>) -> Result<Feedback> {
        let subject_id = match self.grid.slot(&at)? {
            Some(assignment) => assignment.subject_id.clone(),
            None => {
                tracing::warn!(batch = %at.batch, day = %at.day, period = at.period, "teacher chosen for an empty cell");
                return Ok(Feedback::done(Toast::warning(
                    "No Subject",
                    "Add a subject to this period before choosing a teacher",
                )));
            }
        };

        if teacher_id.is_empty() {
            self.apply(Command::SetTeacher {
                at,
                teacher_id: None,
                teacher_name: None,
            })?;
            return Ok(Feedback::Ignored);
        }

        let teacher_name = teacher_name
            .filter(|name| !name.is_empty())
            .or_else(|| self.context.catalog.teacher_name(&at.batch, &subject_id, teacher_id))
            .unwrap_or(teacher_id)
            .to_string();
        self.apply(Command::SetTeacher {
            at,
            teacher_id: Some(teacher_id.to_string()),
            teacher_name: Some(teacher_name.clone()),
        })?;
        Ok(Feedback::done(Toast::info(
            "Teacher Assigned",
            format!("{} assigned to this period", teacher_name),
        )))
    }

    /// Remove button on a cell
    pub fn remove(&mut self, at: SlotRef, confirmed: bool) -> Result<Feedback> {
        match self.apply(Command::Remove { at, confirmed })? {
            Outcome::Unchanged => Ok(Feedback::Ignored),
            Outcome::NeedsConfirmation => Ok(Feedback::confirm(REMOVE_PROMPT)),
            Outcome::Applied => Ok(Feedback::done(Toast::info(
                "Assignment Removed",
                "The period is free again",
            ))),
        }
    }

    /// Print link for the active batch, or `None` when its id is not a composite key
    pub fn print_link(&self, base_url: &str) -> Option<String> {
        if self.context.current_batch.is_empty() {
            return None;
        }
        let key = parser::parse_batch_string(&self.context.current_batch).ok()?;
        let base = base_url.split('?').next().unwrap_or(base_url);
        Some(format!("{}?{}", base, key.query_string()))
    }

    /// Toast for the conflict check button
    pub fn conflict_feedback(&self) -> (Vec<ConflictGroup>, Toast) {
        let conflicts = self.conflicts();
        let toast = if conflicts.is_empty() {
            Toast::success("No Conflicts", "Your timetable has no teacher assignment conflicts.")
        } else {
            Toast::error(
                "Timetable Conflicts Detected",
                format!("{} teacher conflict(s) found", conflicts.len()),
            )
        };
        (conflicts, toast)
    }

    /// Final serialization before the form is submitted
    pub fn save(&mut self) -> Result<(String, Toast)> {
        self.sync()?;
        tracing::info!(bytes = self.timetable_data.len(), "timetable ready for submission");
        Ok((
            self.timetable_data.clone(),
            Toast::info("Saving...", "Saving your timetable changes"),
        ))
    }
}
