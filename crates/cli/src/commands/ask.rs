//! `studentdesk ask`: a single question or an interactive session.

use std::io::Write;
use std::path::Path;

use studentdesk_gateway::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};

fn provenance(decision: &studentdesk_core::routing::RoutingDecision) -> String {
    let mut label = decision.source.to_string();
    if let Some(function) = &decision.function {
        label.push_str(&format!(": {function}"));
    }
    if let Some(confidence) = decision.confidence {
        label.push_str(&format!(", confidence {confidence:.2}"));
    }
    label
}

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    session: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let state = AppState::bootstrap(&config).await?;

    if let Some(msg) = message {
        let reply = state.router.handle(session, &msg).await?;
        println!("{}", reply.response);
        return Ok(());
    }

    println!();
    println!("  studentdesk, interactive mode");
    println!("  Model:    {}", config.provider.model);
    println!("  Session:  {session}");
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if !input.is_empty() {
            match state.router.handle(session, input).await {
                Ok(reply) => {
                    println!();
                    for line in reply.response.lines() {
                        println!("  Assistant > {line}");
                    }
                    println!("  [{}]", provenance(&reply.decision));
                    println!();
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            }
        }
        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}
