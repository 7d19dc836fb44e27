use serde::{Deserialize, Serialize};

use super::ops::Outcome;
use super::types::{Assignment, Grid, SlotRef};
use crate::error::Result;

/// A single user gesture expressed as a grid mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Assign {
        at: SlotRef,
        subject_id: String,
        subject_name: String,
        #[serde(default)]
        teacher_id: Option<String>,
        #[serde(default)]
        teacher_name: Option<String>,
        #[serde(default)]
        confirmed: bool,
    },
    Swap {
        from: SlotRef,
        to: SlotRef,
    },
    Remove {
        at: SlotRef,
        #[serde(default)]
        confirmed: bool,
    },
    SetTeacher {
        at: SlotRef,
        teacher_id: Option<String>,
        #[serde(default)]
        teacher_name: Option<String>,
    },
}

impl Grid {
    pub fn apply(&mut self, command: Command) -> Result<Outcome> {
        match command {
            Command::Assign {
                at,
                subject_id,
                subject_name,
                teacher_id,
                teacher_name,
                confirmed,
            } => {
                let assignment = Assignment {
                    subject_id,
                    subject_name,
                    teacher_id,
                    teacher_name,
                };
                self.assign(&at, assignment, confirmed)
            }
            Command::Swap { from, to } => self.swap(&from, &to),
            Command::Remove { at, confirmed } => self.remove(&at, confirmed),
            Command::SetTeacher {
                at,
                teacher_id,
                teacher_name,
            } => {
                let teacher = teacher_id.map(|id| {
                    let name = teacher_name.unwrap_or_else(|| id.clone());
                    (id, name)
                });
                self.set_teacher(&at, teacher)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use crate::grid::types::{default_days, Batch};

    fn grid() -> Grid {
        let mut grid = Grid::new(default_days(), 6).unwrap();
        grid.add_batch(Batch::new("A")).unwrap();
        grid.add_batch(Batch::new("B")).unwrap();
        grid
    }

    #[test]
    fn commands_parse_from_tagged_json() {
        let commands: Vec<Command> = serde_json::from_str(
            r#"[
                {"command": "assign", "at": {"batch": "A", "day": "Monday", "period": 0},
                 "subject_id": "1", "subject_name": "Math"},
                {"command": "set_teacher", "at": {"batch": "A", "day": "Monday", "period": 0},
                 "teacher_id": "10", "teacher_name": "Alice"},
                {"command": "swap", "from": {"batch": "A", "day": "Monday", "period": 0},
                 "to": {"batch": "B", "day": "Monday", "period": 0}},
                {"command": "remove", "at": {"batch": "B", "day": "Monday", "period": 0}, "confirmed": true}
            ]"#,
        )
        .unwrap();

        assert_eq!(commands.len(), 4);
        assert!(matches!(&commands[0], Command::Assign { confirmed: false, teacher_id: None, .. }));

        let mut grid = grid();
        let outcomes: Vec<Outcome> = commands
            .into_iter()
            .map(|c| grid.apply(c).unwrap())
            .collect();
        assert!(outcomes.iter().all(|o| o.is_applied()));
        assert!(grid.cells().all(|(_, _, _, slot)| slot.is_none()));
    }

    #[test]
    fn set_teacher_name_defaults_to_id() {
        let mut grid = grid();
        let at = SlotRef::new("A", "Monday", 0);
        grid.apply(Command::Assign {
            at: at.clone(),
            subject_id: "1".into(),
            subject_name: "Math".into(),
            teacher_id: None,
            teacher_name: None,
            confirmed: false,
        })
        .unwrap();
        grid.apply(Command::SetTeacher {
            at: at.clone(),
            teacher_id: Some("10".into()),
            teacher_name: None,
        })
        .unwrap();

        let slot = grid.slot(&at).unwrap().as_ref().unwrap();
        assert_eq!(slot.teacher_name.as_deref(), Some("10"));
    }

    #[test]
    fn set_teacher_command_on_empty_slot_fails() {
        let mut grid = grid();
        let result = grid.apply(Command::SetTeacher {
            at: SlotRef::new("A", "Monday", 0),
            teacher_id: Some("10".into()),
            teacher_name: Some("Alice".into()),
        });
        assert!(matches!(result, Err(EditorError::EmptySlot { .. })));
    }
}
