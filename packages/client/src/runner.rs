//! Interactive terminal client: reads lines with rustyline and drives a
//! [`ChatSession`] until the user quits.

use std::sync::{Arc, Mutex, PoisonError};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::{
    config::ClientConfig,
    connection::{ConnectionManager, ConnectionState},
    domain::RoomIdentity,
    formatter::MessageFormatter,
    session::ChatSession,
    ui::{SharedPrompt, TerminalView, format_prompt, redisplay_prompt},
};

/// One line of user input, interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Plain text to send to the room
    Send(String),
    /// `/room <id>`
    Room(String),
    /// `/name <username>`
    Name(String),
    /// `/quit`
    Quit,
    /// A command with missing or unknown arguments; carries the usage text
    Usage(&'static str),
}

/// Interpret an input line.
///
/// Lines starting with `/` are commands; everything else is message content,
/// passed through untrimmed.
pub fn parse_input(line: &str) -> InputCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return InputCommand::Send(line.to_string());
    };

    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };

    match name {
        "room" if !argument.is_empty() => InputCommand::Room(argument.to_string()),
        "room" => InputCommand::Usage("/room <id>"),
        "name" if !argument.is_empty() => InputCommand::Name(argument.to_string()),
        "name" => InputCommand::Usage("/name <username>"),
        "quit" | "exit" => InputCommand::Quit,
        _ => InputCommand::Usage("/room <id> | /name <username> | /quit"),
    }
}

/// Run the interactive client until the user quits or closes stdin.
///
/// Connection failures never end the loop; the session keeps reconnecting in
/// the background.
pub async fn run_client(
    config: ClientConfig,
    identity: RoomIdentity,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Joining room '{}' on {} as '{}'",
        identity.room_id,
        config.server_url(),
        identity.username
    );

    let prompt: SharedPrompt = Arc::new(Mutex::new(format_prompt(&identity)));
    let view = TerminalView::new(Arc::clone(&prompt));
    let manager = ConnectionManager::websocket(config);
    let mut session = ChatSession::new(manager, identity, Box::new(view));
    session.mount();

    print!("{}", MessageFormatter::format_joined(session.identity()));

    let mut input_rx = spawn_readline(Arc::clone(&prompt));

    loop {
        tokio::select! {
            _ = session.process_next_snapshot() => {}
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break;
                };

                match parse_input(&line) {
                    InputCommand::Send(content) => {
                        if session.connection_state() != ConnectionState::Open {
                            print!(
                                "{}",
                                MessageFormatter::format_not_connected(&session.identity().room_id)
                            );
                        }
                        session.set_draft(content);
                        session.send_draft();
                    }
                    InputCommand::Room(room_id) => {
                        session.set_room_id(room_id);
                        print!("{}", MessageFormatter::format_joined(session.identity()));
                    }
                    InputCommand::Name(username) => {
                        session.set_username(username);
                        print!("{}", MessageFormatter::format_joined(session.identity()));
                    }
                    InputCommand::Quit => break,
                    InputCommand::Usage(usage) => {
                        print!("{}", MessageFormatter::format_usage(usage));
                    }
                }
            }
        }
    }

    session.teardown();
    tracing::info!("Client session ended");

    Ok(())
}

/// Spawn a blocking thread for rustyline (synchronous readline).
///
/// The returned channel closes on Ctrl+C, Ctrl+D or a readline error.
fn spawn_readline(prompt: SharedPrompt) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();
    let prompt_for_read = Arc::clone(&prompt);

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            let current_prompt = prompt_for_read
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();

            match rl.readline(&current_prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str()).ok();
                    if input_tx.send(line).is_err() {
                        // Channel closed, exit thread
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    redisplay_prompt(&prompt);
    input_rx
}
