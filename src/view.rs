use crate::models::{LogEntry, Role};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Presentation surface driven by the message pipeline.
pub trait ChatView: Send + Sync {
    fn render_message(&self, entry: &LogEntry);
    fn set_typing(&self, active: bool);
    fn clear_input(&self) {}
    fn refresh_log(&self) {}
    /// Replaces the visible transcript with the welcome entry alone.
    fn reset_transcript(&self, welcome: &LogEntry);
}

/// Events emitted to a front end, one per view call.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ChatEvent {
    MessageRendered(LogEntry),
    Typing(bool),
    InputCleared,
    LogRefreshed,
    TranscriptReset(LogEntry),
}

/// Forwards view calls as [`ChatEvent`]s over an unbounded channel.
pub struct ChannelView {
    tx: UnboundedSender<ChatEvent>,
}

impl ChannelView {
    pub fn new() -> (Self, UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ChatEvent) {
        if let Err(e) = self.tx.send(event) {
            log::debug!("No listener for chat event: {:?}", e.0);
        }
    }
}

impl ChatView for ChannelView {
    fn render_message(&self, entry: &LogEntry) {
        self.emit(ChatEvent::MessageRendered(entry.clone()));
    }

    fn set_typing(&self, active: bool) {
        self.emit(ChatEvent::Typing(active));
    }

    fn clear_input(&self) {
        self.emit(ChatEvent::InputCleared);
    }

    fn refresh_log(&self) {
        self.emit(ChatEvent::LogRefreshed);
    }

    fn reset_transcript(&self, welcome: &LogEntry) {
        self.emit(ChatEvent::TranscriptReset(welcome.clone()));
    }
}

/// Formats an entry for a terminal: a role prefix, embedded newlines as
/// indented continuation lines, and the meta annotation on its own line.
pub fn format_entry(entry: &LogEntry) -> String {
    let prefix = match entry.role {
        Role::User => "you",
        Role::Bot => "bot",
    };
    let indent = " ".repeat(prefix.len() + 2);

    let mut out = String::new();
    for (i, line) in entry.text.split('\n').enumerate() {
        if i == 0 {
            out.push_str(&format!("{}> {}", prefix, line));
        } else {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(line);
        }
    }
    if let Some(meta) = &entry.meta {
        out.push('\n');
        out.push_str(&indent);
        out.push_str(&format!("[{}]", meta));
    }
    out
}
