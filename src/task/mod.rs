//! Task module - task records, their wire format, and deadline evaluation.
//!
//! This module is designed around pure functions:
//! - Records are plain data deserialized from the task store
//! - Malformed dates degrade to "absent" instead of failing the record
//! - Classification is recomputed on every read and holds no state

pub mod deadline;
pub mod timestamp;
mod types;

pub use deadline::{Classification, DeadlinePolicy, NOT_LATE_JUSTIFICATION};
pub use timestamp::{parse_backend_timestamp, parse_due_date, parse_due_time};
pub use types::{Priority, Profile, Task, TaskDraft, TaskPatch, TaskStatus};
