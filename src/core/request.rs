//! Request assembly: session history in, ordered API payload out.
//!
//! This is a pure read of history. User turns become a typed part list
//! (text first, then images, then audio) with every attachment inlined as a
//! base64 data URI; assistant turns are resent as plain text without their
//! attachments ever reappearing.

use base64::Engine as _;
use tracing::{debug, warn};

use crate::api::{ApiMessage, ContentPart};
use crate::core::attachments::mime_for;
use crate::core::message::{Attachment, Message};

/// Build the ordered request payload for the full history. Produces one
/// entry per message, preceded by a system entry when `system_prompt` is
/// non-empty.
pub fn build_api_messages(history: &[Message], system_prompt: &str) -> Vec<ApiMessage> {
    let mut api_messages = Vec::with_capacity(history.len() + 1);

    if !system_prompt.is_empty() {
        api_messages.push(ApiMessage::text("system", system_prompt));
    }

    for message in history {
        if message.is_user() {
            let mut parts = vec![ContentPart::text(message.text.clone())];
            for attachment in message.images() {
                if let Some(uri) = encode_data_uri(attachment) {
                    parts.push(ContentPart::image_url(uri));
                }
            }
            for attachment in message.audio() {
                if let Some(uri) = encode_data_uri(attachment) {
                    parts.push(ContentPart::audio_url(uri));
                }
            }
            api_messages.push(ApiMessage::parts("user", parts));
        } else {
            api_messages.push(ApiMessage::text(message.role.as_str(), message.text.clone()));
        }
    }

    api_messages
}

/// Inline an attachment as `data:<mime>;base64,<payload>`. An unreadable
/// file is skipped rather than failing the whole turn, matching the
/// original upload behavior.
fn encode_data_uri(attachment: &Attachment) -> Option<String> {
    match std::fs::read(&attachment.source_path) {
        Ok(bytes) => {
            let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
            debug!(
                name = %attachment.display_name,
                mime = mime_for(attachment),
                "encoded attachment"
            );
            Some(format!("data:{};base64,{}", mime_for(attachment), payload))
        }
        Err(err) => {
            warn!(
                name = %attachment.display_name,
                path = %attachment.source_path.display(),
                %err,
                "skipping unreadable attachment"
            );
            None
        }
    }
}
