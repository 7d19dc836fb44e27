use std::collections::HashMap;

use serde::Serialize;

use super::types::Grid;

/// One booking that takes part in a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictEntry {
    pub batch_id: String,
    pub batch_name: String,
    pub subject_name: String,
}

/// A teacher booked in more than one batch at the same day and period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictGroup {
    pub teacher_id: String,
    pub teacher_name: String,
    pub day: String,
    pub period: usize,
    pub entries: Vec<ConflictEntry>,
}

impl Grid {
    /// Groups teacher bookings by (day, period, teacher) and keeps groups with two or more batches.
    ///
    /// Groups appear in the order their first booking is met walking the grid
    /// (batch registration, then day, then period).
    pub fn detect_conflicts(&self) -> Vec<ConflictGroup> {
        let mut groups: Vec<ConflictGroup> = Vec::new();
        let mut index: HashMap<(&str, usize, &str), usize> = HashMap::new();

        for (batch, day, period, slot) in self.cells() {
            let Some(assignment) = slot else { continue };
            let Some(teacher_id) = assignment.teacher() else { continue };

            let entry = ConflictEntry {
                batch_id: batch.id.clone(),
                batch_name: batch.label(),
                subject_name: assignment.subject_name.clone(),
            };
            match index.get(&(day, period, teacher_id)) {
                Some(&i) => groups[i].entries.push(entry),
                None => {
                    index.insert((day, period, teacher_id), groups.len());
                    groups.push(ConflictGroup {
                        teacher_id: teacher_id.to_string(),
                        teacher_name: assignment.teacher_name.clone().unwrap_or_default(),
                        day: day.to_string(),
                        period,
                        entries: vec![entry],
                    });
                }
            }
        }

        groups.retain(|group| group.entries.len() > 1);
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::types::{default_days, Assignment, Batch, SlotRef};

    fn grid(batches: &[&str]) -> Grid {
        let mut grid = Grid::new(default_days(), 6).unwrap();
        for id in batches {
            grid.add_batch(Batch::new(*id)).unwrap();
        }
        grid
    }

    fn book(grid: &mut Grid, batch: &str, day: &str, period: usize, subject: (&str, &str), teacher: (&str, &str)) {
        let assignment = Assignment::new(subject.0, subject.1).with_teacher(teacher.0, teacher.1);
        grid.assign(&SlotRef::new(batch, day, period), assignment, true).unwrap();
    }

    #[test]
    fn same_teacher_same_period_in_two_batches_conflicts() {
        let mut grid = grid(&["A", "B"]);
        book(&mut grid, "A", "Monday", 0, ("1", "Math"), ("10", "Alice"));
        book(&mut grid, "B", "Monday", 0, ("2", "Physics"), ("10", "Alice"));

        let conflicts = grid.detect_conflicts();
        assert_eq!(conflicts.len(), 1);
        let group = &conflicts[0];
        assert_eq!(group.teacher_name, "Alice");
        assert_eq!(group.day, "Monday");
        assert_eq!(group.period, 0);
        let batches: Vec<&str> = group.entries.iter().map(|e| e.batch_id.as_str()).collect();
        assert_eq!(batches, vec!["A", "B"]);
        assert_eq!(group.entries[1].subject_name, "Physics");
    }

    #[test]
    fn different_periods_do_not_conflict() {
        let mut grid = grid(&["A", "B"]);
        book(&mut grid, "A", "Monday", 0, ("1", "Math"), ("10", "Alice"));
        book(&mut grid, "B", "Monday", 1, ("2", "Physics"), ("10", "Alice"));

        assert!(grid.detect_conflicts().is_empty());
    }

    #[test]
    fn different_days_and_teachers_do_not_conflict() {
        let mut grid = grid(&["A", "B"]);
        book(&mut grid, "A", "Monday", 0, ("1", "Math"), ("10", "Alice"));
        book(&mut grid, "B", "Tuesday", 0, ("1", "Math"), ("10", "Alice"));
        book(&mut grid, "B", "Monday", 0, ("2", "Physics"), ("11", "Bob"));

        assert!(grid.detect_conflicts().is_empty());
    }

    #[test]
    fn slots_without_a_teacher_are_ignored() {
        let mut grid = grid(&["A", "B"]);
        let at_a = SlotRef::new("A", "Monday", 0);
        let at_b = SlotRef::new("B", "Monday", 0);
        grid.assign(&at_a, Assignment::new("1", "Math"), false).unwrap();
        grid.assign(&at_b, Assignment::new("1", "Math").with_teacher("", "Select Teacher"), false)
            .unwrap();

        assert!(grid.detect_conflicts().is_empty());
    }

    #[test]
    fn groups_and_entries_follow_traversal_order() {
        let mut grid = grid(&["C", "A", "B"]);
        book(&mut grid, "B", "Tuesday", 2, ("3", "Art"), ("12", "Carol"));
        book(&mut grid, "A", "Tuesday", 2, ("3", "Art"), ("12", "Carol"));
        book(&mut grid, "B", "Monday", 4, ("1", "Math"), ("10", "Alice"));
        book(&mut grid, "C", "Monday", 4, ("1", "Math"), ("10", "Alice"));
        book(&mut grid, "A", "Monday", 4, ("2", "Physics"), ("10", "Alice"));

        let conflicts = grid.detect_conflicts();
        assert_eq!(conflicts.len(), 2);

        assert_eq!((conflicts[0].day.as_str(), conflicts[0].period), ("Monday", 4));
        let first: Vec<&str> = conflicts[0].entries.iter().map(|e| e.batch_id.as_str()).collect();
        assert_eq!(first, vec!["C", "A", "B"]);

        assert_eq!(conflicts[1].teacher_name, "Carol");
        let second: Vec<&str> = conflicts[1].entries.iter().map(|e| e.batch_id.as_str()).collect();
        assert_eq!(second, vec!["A", "B"]);
    }

    #[test]
    fn empty_grid_has_no_conflicts() {
        assert!(grid(&[]).detect_conflicts().is_empty());
    }
}
