use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// End-user emoji feedback attached to an assistant message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EmojiReaction {
    pub emoji: String,
    #[serde(default)]
    pub count: u32,
}

impl EmojiReaction {
    pub fn new(emoji: impl Into<String>, count: u32) -> Self {
        Self {
            emoji: emoji.into(),
            count,
        }
    }
}

const SENTIMENT_TABLE: &[(&str, &str)] = &[
    ("👍", "positive - user found this helpful"),
    ("👎", "negative - user found this unhelpful"),
    ("❤️", "loved - user really appreciated this"),
    ("😂", "amused - user found this funny"),
    ("🎉", "celebratory - user was excited by this"),
    ("🤔", "uncertain - user found this confusing or questionable"),
    ("😕", "confused - user did not understand this"),
    ("😢", "sad - user found this disappointing"),
    ("😡", "angry - user was frustrated by this"),
    ("🚀", "impressed - user found this excellent"),
    ("👀", "curious - user is paying close attention to this"),
    ("✅", "confirmed - user verified this is correct"),
    ("❌", "rejected - user marked this as incorrect"),
];

/// Maps an emoji to the sentiment phrase shown to the model.
pub fn sentiment_phrase(emoji: &str) -> Cow<'static, str> {
    SENTIMENT_TABLE
        .iter()
        .find(|(key, _)| *key == emoji)
        .map(|(_, phrase)| Cow::Borrowed(*phrase))
        .unwrap_or_else(|| Cow::Owned(format!("reacted with {emoji}")))
}
