pub mod scheduler;
pub use scheduler::{Scheduler, ToolReport, TurnRequest, TurnResponse};
