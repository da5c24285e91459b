//! Entity extraction from model output and user utterances
//!
//! The model is instructed to echo the full entity record between
//! `[[ENTITIES]]` and `[[END_ENTITIES]]` sentinels after its spoken
//! reply. Parsing is isolated here and never fails the conversation: a
//! malformed block degrades to spoken text with no delta.

use once_cell::sync::Lazy;
use regex::Regex;

use salescall_core::LeadDelta;
use salescall_llm::{ENTITIES_CLOSE_TAG, ENTITIES_OPEN_TAG};

/// Result of splitting model output into speech and entity data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    /// Sentinel block present and parseable
    Parsed { spoken: String, entities: LeadDelta },
    /// No block, or a block that failed to parse
    Unparsed { spoken: String },
}

impl ParsedReply {
    pub fn spoken(&self) -> &str {
        match self {
            ParsedReply::Parsed { spoken, .. } => spoken,
            ParsedReply::Unparsed { spoken } => spoken,
        }
    }

    pub fn entities(&self) -> Option<&LeadDelta> {
        match self {
            ParsedReply::Parsed { entities, .. } => Some(entities),
            ParsedReply::Unparsed { .. } => None,
        }
    }
}

/// Split raw model output on the entity sentinels.
///
/// Never panics or errors; the worst case is the trimmed input with no
/// entities. Single quotes are normalized to double quotes before the
/// JSON parse, and a bare object is treated as the entity map itself.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let Some((before, rest)) = raw.split_once(ENTITIES_OPEN_TAG) else {
        return ParsedReply::Unparsed {
            spoken: raw.trim().to_string(),
        };
    };

    let spoken = before.trim().to_string();
    let block = rest
        .split(ENTITIES_CLOSE_TAG)
        .next()
        .unwrap_or_default()
        .trim();

    if block.is_empty() {
        return ParsedReply::Unparsed { spoken };
    }

    let normalized = block.replace('\'', "\"");
    let value: serde_json::Value = match serde_json::from_str(&normalized) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Entity block JSON parse failed: {} (block: {})", e, block);
            return ParsedReply::Unparsed { spoken };
        }
    };

    // The model may or may not wrap the map under an "entities" key
    let inner = match value.get("entities") {
        Some(inner) => inner.clone(),
        None => value,
    };

    match serde_json::from_value::<LeadDelta>(inner) {
        Ok(entities) => ParsedReply::Parsed { spoken, entities },
        Err(e) => {
            tracing::warn!("Entity block shape mismatch: {}", e);
            ParsedReply::Unparsed { spoken }
        }
    }
}

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Validate an email against the local@domain.tld shape.
///
/// Whitespace is trimmed; anything else invalid yields `None`, which
/// blocks lifecycle actions but never blocks ending the call.
pub fn sanitize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if EMAIL_SHAPE.is_match(trimmed) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"my name is (\w+)", r"i am (\w+)", r"i'm (\w+)"]
        .iter()
        .map(|p| Regex::new(p).expect("valid name regex"))
        .collect()
});

static EMAIL_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static DATE_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2}-\d{2}-\d{4})\b").expect("valid date regex"));

static TIME_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2}:\d{2})\b").expect("valid time regex"));

/// Pull obvious entities straight out of a user utterance.
///
/// Keeps the snapshot shown to the model fresh even before it echoes
/// anything back.
pub fn extract_from_utterance(utterance: &str) -> LeadDelta {
    let mut delta = LeadDelta::default();
    let lower = utterance.to_lowercase();

    for pattern in NAME_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(&lower) {
            if let Some(name) = captures.get(1) {
                delta.name = Some(capitalize(name.as_str()));
            }
        }
    }

    if let Some(email) = EMAIL_IN_TEXT.find(utterance) {
        delta.email = Some(email.as_str().to_string());
    }

    if let Some(captures) = DATE_IN_TEXT.captures(utterance) {
        delta.meeting_date = Some(captures[1].to_string());
    }

    if let Some(captures) = TIME_IN_TEXT.captures(utterance) {
        delta.meeting_time = Some(captures[1].to_string());
    }

    delta
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
