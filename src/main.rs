use anyhow::Result;
use calagent::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
