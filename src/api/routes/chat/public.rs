//! Public types for the chat API
pub use crate::ai::agents::{ToolReport, TurnRequest as ChatRequest, TurnResponse as ChatResponse};
pub use crate::ai::state::{ConversationTurn, PendingEvent, TurnRole};
