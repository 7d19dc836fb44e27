pub mod submission;
pub mod export;

pub use submission::{parse_submission, submission_rows};
pub use export::{export_filename, timetable_csv};
