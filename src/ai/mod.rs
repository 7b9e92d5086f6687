pub mod agents;
pub mod extract;
pub mod prompt;
pub mod router;
pub mod state;
pub mod tools;
