pub mod task;

pub use task::{Phase, TaskRecord};
