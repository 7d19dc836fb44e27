pub mod types;
pub mod ops;
pub mod command;
pub mod transport;
pub mod conflicts;
pub mod slot_utils;

pub use types::{
    default_days, Assignment, Batch, Grid, SlotRef, SlotState, DEFAULT_PERIODS_PER_DAY, MAX_PERIODS_PER_DAY,
};
pub use ops::Outcome;
pub use command::Command;
pub use conflicts::ConflictGroup;
pub use slot_utils::period_times;
