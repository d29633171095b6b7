//! Turn dispatcher: the Idle → Sending → Idle state machine around one
//! inference call.
//!
//! The new user message is committed to history before dispatch, so the
//! surface can render it while the call is in flight. A failed call is a
//! visible degrade path, not a retry: the error lands in history as an
//! assistant-role apology and the session returns to Idle ready for input.

use tracing::{debug, warn};

use crate::api::client::ChatBackend;
use crate::core::message::Message;
use crate::core::request::build_api_messages;
use crate::core::session::Session;

/// Prefix of the assistant-role message appended when the inference call
/// fails (the original app's wording).
pub const ERROR_REPLY_PREFIX: &str = "Sorry, I encountered an error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The endpoint replied; the assistant message is the last history entry.
    Replied,
    /// The call failed; an apology message was appended instead.
    Degraded,
    /// A turn was already in flight; nothing was committed.
    Busy,
}

/// Run one full turn against `backend`. Blocks (asynchronously) until the
/// endpoint returns or errors; there is no timeout or cancellation here.
pub async fn submit_turn(
    session: &mut Session,
    backend: &dyn ChatBackend,
    input: impl Into<String>,
) -> TurnOutcome {
    if !session.try_begin_sending() {
        return TurnOutcome::Busy;
    }

    let attachments = session.take_pending();
    debug!(attachments = attachments.len(), "committing user turn");
    session.push_message(Message::user(input, attachments));

    let api_messages = build_api_messages(session.history(), session.system_prompt());
    let outcome = match backend.complete(api_messages).await {
        Ok(reply) => {
            session.push_message(Message::assistant(reply));
            TurnOutcome::Replied
        }
        Err(err) => {
            warn!(%err, "inference call failed");
            session.push_message(Message::assistant(format!("{ERROR_REPLY_PREFIX}{err}")));
            TurnOutcome::Degraded
        }
    };

    // Pending was drained at commit time; this keeps the post-turn
    // invariant explicit even if staging happened mid-flight.
    session.clear_pending();
    session.finish_sending();
    outcome
}
