pub mod clock;
pub mod task_supervisor;
