use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod auth;
pub mod chat;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Start a scheduling chat session in the terminal
    Chat {},
    /// Authorize Google Calendar access and print a refresh token
    Auth {
        /// Where Google sends the browser after consent
        #[arg(long, default_value = auth::DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::Chat {}) => {
            chat::run().await?;
        }
        Some(Command::Auth { redirect_uri }) => {
            auth::run(&redirect_uri).await?;
        }
        None => {}
    }

    Ok(())
}
