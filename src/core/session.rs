//! Session-scoped conversation state.
//!
//! One [`Session`] per interactive session, owned by the chat loop and
//! passed to the turn dispatcher. Nothing here is shared across sessions,
//! so the in-flight guard is a plain flag: the only hazard is re-entrant
//! submission from the surface, not true concurrency.

use crate::core::message::{Attachment, Message};

/// System prompt used when config supplies none (the original app's
/// default).
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant that can analyze images, audio and text.";

/// Observable turn state. `Sending` covers the interval from a committed
/// user message until the assistant (or apology) message lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
}

#[derive(Debug)]
pub struct Session {
    history: Vec<Message>,
    pending_attachments: Vec<Attachment>,
    system_prompt: String,
    sending_in_progress: bool,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            pending_attachments: Vec::new(),
            system_prompt: system_prompt.into(),
            sending_in_progress: false,
        }
    }

    pub fn turn_state(&self) -> TurnState {
        if self.sending_in_progress {
            TurnState::Sending
        } else {
            TurnState::Idle
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending_in_progress
    }

    /// Guarded Idle→Sending transition. Returns false (and changes nothing)
    /// when a turn is already in flight.
    pub fn try_begin_sending(&mut self) -> bool {
        if self.sending_in_progress {
            return false;
        }
        self.sending_in_progress = true;
        true
    }

    pub fn finish_sending(&mut self) {
        self.sending_in_progress = false;
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    pub fn push_message(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    pub fn pending_attachments(&self) -> &[Attachment] {
        &self.pending_attachments
    }

    pub fn stage_attachment(&mut self, attachment: Attachment) {
        self.pending_attachments.push(attachment);
    }

    pub fn stage_attachments(&mut self, attachments: impl IntoIterator<Item = Attachment>) {
        self.pending_attachments.extend(attachments);
    }

    /// Drain staged attachments into the caller. Each attachment is handed
    /// out exactly once; after this the pending list is empty.
    pub fn take_pending(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.pending_attachments)
    }

    pub fn clear_pending(&mut self) {
        self.pending_attachments.clear();
    }

    /// Clear-conversation reset: history and pending attachments go,
    /// the system prompt stays.
    pub fn clear(&mut self) {
        self.history.clear();
        self.pending_attachments.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::AttachmentKind;

    fn attachment(name: &str) -> Attachment {
        Attachment::new(AttachmentKind::Image, format!("/tmp/{name}"), name)
    }

    #[test]
    fn sending_guard_rejects_reentry() {
        let mut session = Session::default();
        assert_eq!(session.turn_state(), TurnState::Idle);
        assert!(session.try_begin_sending());
        assert_eq!(session.turn_state(), TurnState::Sending);
        assert!(!session.try_begin_sending());
        session.finish_sending();
        assert!(session.try_begin_sending());
    }

    #[test]
    fn take_pending_drains_exactly_once() {
        let mut session = Session::default();
        session.stage_attachment(attachment("a.png"));
        session.stage_attachment(attachment("b.png"));

        let taken = session.take_pending();
        assert_eq!(taken.len(), 2);
        assert!(session.pending_attachments().is_empty());
        assert!(session.take_pending().is_empty());
    }

    #[test]
    fn clear_preserves_system_prompt() {
        let mut session = Session::new("custom prompt");
        session.push_message(Message::user("hi", Vec::new()));
        session.push_message(Message::assistant("hello"));
        session.stage_attachment(attachment("c.png"));

        session.clear();

        assert!(session.history().is_empty());
        assert!(session.pending_attachments().is_empty());
        assert_eq!(session.system_prompt(), "custom prompt");
    }

    #[test]
    fn staged_order_is_preserved() {
        let mut session = Session::default();
        session.stage_attachments([attachment("1.png"), attachment("2.png")]);
        session.stage_attachment(attachment("3.png"));
        let names: Vec<_> = session
            .pending_attachments()
            .iter()
            .map(|a| a.display_name.as_str())
            .collect();
        assert_eq!(names, ["1.png", "2.png", "3.png"]);
    }
}
