//! Terminal presentation of a chat session.

use std::{
    io::Write,
    sync::{Arc, Mutex, PoisonError},
};

use roomchat_shared::time::{Clock, SystemClock};

use crate::{
    domain::{Message, RoomIdentity},
    formatter::MessageFormatter,
    session::ChatView,
};

/// Prompt text shared between the view and the readline thread
pub type SharedPrompt = Arc<Mutex<String>>;

/// Prompt for the given identity, e.g. `alice@default-room> `
pub fn format_prompt(identity: &RoomIdentity) -> String {
    format!("{}@{}> ", identity.username, identity.room_id)
}

/// Redisplay the prompt after printing output
pub fn redisplay_prompt(prompt: &SharedPrompt) {
    let prompt = prompt.lock().unwrap_or_else(PoisonError::into_inner);
    print!("{}", prompt);
    std::io::stdout().flush().ok();
}

/// [`ChatView`] printing every snapshot to stdout
pub struct TerminalView {
    clock: Box<dyn Clock>,
    prompt: SharedPrompt,
}

impl TerminalView {
    pub fn new(prompt: SharedPrompt) -> Self {
        Self::with_clock(prompt, Box::new(SystemClock))
    }

    pub fn with_clock(prompt: SharedPrompt, clock: Box<dyn Clock>) -> Self {
        Self { clock, prompt }
    }

    fn update_prompt(&self, identity: &RoomIdentity) {
        *self.prompt.lock().unwrap_or_else(PoisonError::into_inner) = format_prompt(identity);
    }
}

impl ChatView for TerminalView {
    fn render(&mut self, identity: &RoomIdentity, messages: &[Message]) {
        self.update_prompt(identity);
        let formatted =
            MessageFormatter::format_snapshot(identity, messages, self.clock.now_millis());
        print!("{}", formatted);
        redisplay_prompt(&self.prompt);
    }
}
