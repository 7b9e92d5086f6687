pub mod calendar;
pub use calendar::{ToolOutcome, execute, friendly_prefix};
