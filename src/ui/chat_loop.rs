//! TUI-less interactive chat loop.
//!
//! Plain lines submit a turn; slash commands stage attachments, adjust the
//! system prompt, and clear the conversation. The loop owns the session and
//! drives the turn dispatcher; while a turn is in flight no further input
//! is read, so the sending guard only ever trips on programmatic misuse.

use std::error::Error;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::client::ChatClient;
use crate::core::attachments::{fetch_url, stage_upload, AttachmentError};
use crate::core::session::Session;
use crate::core::turn::{submit_turn, TurnOutcome};

const HELP_TEXT: &str = "\
Commands:
  /attach <path>    Stage a local image or audio file for the next turn
  /fetch <url>      Fetch an image or audio file from a URL and stage it
  /attachments      List staged attachments
  /system [prompt]  Show or replace the system prompt
  /clear            Clear the conversation (keeps the system prompt)
  /help             Show this help
  /quit             Exit

Anything else is sent to the model as a chat turn.";

enum LoopAction {
    Continue,
    Quit,
}

pub async fn run_chat(
    client: ChatClient,
    http: reqwest::Client,
    mut session: Session,
) -> Result<(), Box<dyn Error>> {
    println!("mmchat — multimodal chat. Type /help for commands.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            match handle_command(line, &mut session, &http).await {
                LoopAction::Quit => break,
                LoopAction::Continue => continue,
            }
        }

        if session.is_sending() {
            eprintln!("⚠️  A turn is already in flight.");
            continue;
        }

        println!("Thinking...");
        let outcome = submit_turn(&mut session, &client, line).await;
        match outcome {
            TurnOutcome::Replied | TurnOutcome::Degraded => {
                if let Some(reply) = session.last_message() {
                    println!("{}", reply.text);
                }
            }
            TurnOutcome::Busy => {
                eprintln!("⚠️  A turn is already in flight.");
            }
        }
    }

    Ok(())
}

fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    }
}

async fn handle_command(line: &str, session: &mut Session, http: &reqwest::Client) -> LoopAction {
    let (command, argument) = split_command(line);
    match command {
        "/quit" | "/exit" => return LoopAction::Quit,
        "/help" => println!("{HELP_TEXT}"),
        "/clear" => {
            session.clear();
            println!("Conversation cleared.");
        }
        "/system" => {
            if argument.is_empty() {
                println!("System prompt: {}", session.system_prompt());
            } else {
                session.set_system_prompt(argument);
                println!("System prompt updated.");
            }
        }
        "/attachments" => {
            if session.pending_attachments().is_empty() {
                println!("No attachments staged.");
            } else {
                for attachment in session.pending_attachments() {
                    println!("  [{}] {}", attachment.kind.as_str(), attachment.display_name);
                }
            }
        }
        "/attach" => {
            if argument.is_empty() {
                eprintln!("Usage: /attach <path>");
            } else {
                attach_local_file(session, argument);
            }
        }
        "/fetch" => {
            if argument.is_empty() {
                eprintln!("Usage: /fetch <url>");
            } else {
                match fetch_url(http, argument).await {
                    Ok(attachment) => {
                        println!(
                            "Staged {} from URL: {}",
                            attachment.kind.as_str(),
                            attachment.display_name
                        );
                        session.stage_attachment(attachment);
                    }
                    Err(err) => print_attachment_error(&err),
                }
            }
        }
        other => {
            eprintln!("Unknown command: {other}. Type /help for commands.");
        }
    }
    LoopAction::Continue
}

fn attach_local_file(session: &mut Session, path: &str) {
    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("⚠️  Could not read {path}: {err}");
            return;
        }
    };

    match stage_upload(&bytes, &file_name) {
        Ok(attachment) => {
            println!(
                "Staged {}: {}",
                attachment.kind.as_str(),
                attachment.display_name
            );
            session.stage_attachment(attachment);
        }
        Err(err) => print_attachment_error(&err),
    }
}

fn print_attachment_error(err: &AttachmentError) {
    eprintln!("⚠️  {err}");
}
