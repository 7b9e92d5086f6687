use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::agents::{Scheduler, TurnRequest};
use crate::ai::state::{ConversationTurn, PendingEvent};
use crate::core::AppConfig;
use crate::google::GoogleCalendar;
use crate::openai::OpenAiClient;

pub async fn run() -> Result<()> {
    let config = AppConfig::from_env()?;
    let mut rl = DefaultEditor::new()?;

    let llm = OpenAiClient::new(
        &config.openai_api_hostname,
        &config.openai_api_key,
        &config.openai_model,
    )
    .with_app(&config.app_url, &config.app_title);
    let calendar = GoogleCalendar::new(&config);
    let scheduler = Scheduler::new(
        &llm,
        &calendar,
        &config.system_message,
        config.default_timezone,
    );

    let mut history: Vec<ConversationTurn> = vec![];
    let mut pending_event: Option<PendingEvent> = None;

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                let _ = rl.add_history_entry(line);

                let resp = scheduler
                    .run_turn(
                        TurnRequest {
                            message: line.to_string(),
                            history,
                            pending_event,
                        },
                        chrono::Utc::now(),
                    )
                    .await;
                println!("{}", resp.response);

                history = resp.history;
                pending_event = resp.pending_event;
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
