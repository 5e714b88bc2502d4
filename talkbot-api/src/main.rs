//! TalkBot Gateway Server
//!
//! Main entry point for the TalkBot chat and vision gateway

use talkbot_api::start_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    start_server().await?;
    Ok(())
}
