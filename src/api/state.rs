use crate::calendar::BoxedCalendar;
use crate::core::AppConfig;
use crate::openai::BoxedLanguageModel;

/// Shared by every request. Conversation state travels with each
/// request so nothing in here changes after startup.
pub struct AppState {
    pub config: AppConfig,
    pub llm: BoxedLanguageModel,
    pub calendar: BoxedCalendar,
}

impl AppState {
    pub fn new(config: AppConfig, llm: BoxedLanguageModel, calendar: BoxedCalendar) -> Self {
        Self {
            config,
            llm,
            calendar,
        }
    }
}
