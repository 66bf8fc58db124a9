//! Compose state for the active conversation.

/// Not-yet-sent compose state. `Text` is the only kind composed today.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageDraft {
    Text { text: String },
}

impl Default for MessageDraft {
    fn default() -> Self {
        Self::Text {
            text: String::new(),
        }
    }
}

impl MessageDraft {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text typed so far.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { text } => text.is_empty(),
        }
    }
}
