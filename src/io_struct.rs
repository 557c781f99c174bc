use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_MAX_INPUT_ITEMS: usize = 12;

const SYSTEM_PREAMBLE: &[&str] = &[
    "You are Ask SaveRx, a helpful empathetic assistant focused on manufacturer savings (copay cards, patient assistance) and insurance basics.",
    "Formatting rules:",
    "- Always answer in concise **Markdown**.",
    "- Avoid '!' exclamation points or patronizing language.",
    "- Start with polite one short sentence summary.",
    "- Use short **bullet points** (•) for options and steps.",
    "- Put official program names in **bold** and include clear links in parentheses.",
    "- Add a tiny 'Eligibility' bullet if relevant (e.g., Commercial only / Not for Medicare).",
    "- If user asks for medical advice, respond with **bold** 'I'm not a doctor' and suggest contacting a clinician.",
    "- Never give dosing or medical advice; for clinical questions suggest contacting a clinician.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversationItem {
    pub role: Role,
    pub content: MessageContent,
}

impl ConversationItem {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }
}

/// The fixed instruction block placed ahead of every caller conversation.
pub fn system_preamble() -> ConversationItem {
    ConversationItem::system(SYSTEM_PREAMBLE.join(" "))
}

/// Caller payload for `POST /chat`.
///
/// Items are kept as raw JSON so that whatever the browser sends is forwarded
/// upstream untouched; only the system preamble is built from typed values.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub messages: Option<Value>,
}

impl ChatRequest {
    /// Any JSON document is accepted; non-object payloads carry no conversation.
    pub fn from_value(payload: Value) -> Self {
        serde_json::from_value(payload).unwrap_or_default()
    }

    /// A non-empty `input` array wins, otherwise `messages` if it is an array,
    /// otherwise nothing.
    pub fn normalize_input(&self) -> Vec<Value> {
        match self.input.as_ref().and_then(Value::as_array) {
            Some(items) if !items.is_empty() => items.clone(),
            _ => self
                .messages
                .as_ref()
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Prepends `preamble` and keeps the trailing `max_items` entries, so the
/// preamble is the first thing evicted from long conversations.
pub fn build_input(preamble: &Value, conversation: Vec<Value>, max_items: usize) -> Vec<Value> {
    let mut combined = Vec::with_capacity(conversation.len() + 1);
    combined.push(preamble.clone());
    combined.extend(conversation);
    let skip = combined.len().saturating_sub(max_items);
    combined.split_off(skip)
}

#[derive(Debug, Serialize)]
pub struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub input: Vec<Value>,
    pub stream: bool,
}

impl<'a> UpstreamRequest<'a> {
    pub fn streaming(model: &'a str, input: Vec<Value>) -> Self {
        Self {
            model,
            input,
            stream: true,
        }
    }
}
