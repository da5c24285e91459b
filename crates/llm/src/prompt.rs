//! Prompt building for the sales agent
//!
//! Assembles the system prompt, retrieval context, turn history, and
//! the entity echo instructions that make the model repeat the full
//! entity record inside a sentinel block.

use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};

use salescall_config::CompanyConfig;
use salescall_core::{LeadEntities, Turn, TurnRole};

/// Sentinel opening the machine-readable entity block
pub const ENTITIES_OPEN_TAG: &str = "[[ENTITIES]]";
/// Sentinel closing the machine-readable entity block
pub const ENTITIES_CLOSE_TAG: &str = "[[END_ENTITIES]]";

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::System => Role::System,
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Render the fixed sales system prompt for a company.
///
/// The same text seeds every session's history and heads every model
/// call for that session.
pub fn sales_system_prompt(company: &CompanyConfig) -> String {
    let services = company
        .services
        .iter()
        .map(|s| format!("- {}", s))
        .collect::<Vec<_>>()
        .join("\n");

    let today = Local::now();

    format!(
        r#"You are an AI sales agent for {name}, a technology consulting company.
You've already introduced yourself at the start of the call, so don't introduce yourself again, and don't say Hello or Hi.
Your role is to understand client needs and guide them toward our solutions.

Available Services:
{services}

Industries We Serve: {industries}

Objectives:
- Must gather client information (E-mail, Name, Company name)
- Understand requirements through natural conversation before suggesting a meeting
- Qualify the lead before pushing for an appointment
- Suggest a consultation only if the prospect shows interest
- Never push a meeting if the prospect is clearly not interested

Strict Guidelines:
- Keep responses concise, natural, and under one-two lines (unless the user asks for more details)
- Ask only one question at a time, including when requesting entity details
- Do not ask for the same details repeatedly, except for Email, Name, or Company Name
- Respond as if speaking on a phone call: no bullet points, headers, or markdown

Important Rules for Entities:
1. Always include ALL fields, even if they are null.
2. Always use double quotes for ALL strings and property names.
3. Always include the complete JSON object.
4. Requirements must always be an array, even if empty.
5. Dates must be in "DD-MM-YYYY" format, times in "HH:MM" 24-hour format.
6. Never add any text after {close_tag}.

Example of valid entities:
{open_tag}
{{"entities": {{"name": null, "email": null, "company_name": null, "requirements": [], "meeting_date": null, "meeting_time": null, "industry": null}}}}
{close_tag}

Consider today's date as {date} and time as {time}.
If the user says "Tomorrow", "Day After Tomorrow", "Next <DAY_NAME>", or "This <DAY_NAME>", resolve the date from today's date and save it in "DD-MM-YYYY" format."#,
        name = company.name,
        services = services,
        industries = company.industries.join(", "),
        open_tag = ENTITIES_OPEN_TAG,
        close_tag = ENTITIES_CLOSE_TAG,
        date = today.format("%d-%m-%Y"),
        time = today.format("%I:%M %p"),
    )
}

/// Prompt builder for the sales agent
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Add the fixed sales system prompt
    pub fn system_prompt(mut self, company: &CompanyConfig) -> Self {
        self.messages.push(Message::system(sales_system_prompt(company)));
        self
    }

    /// Add a pre-rendered system prompt (the one stored on the session)
    pub fn system_text(mut self, prompt: &str) -> Self {
        self.messages.push(Message::system(prompt));
        self
    }

    /// Add retrieval context, skipped when empty
    pub fn with_context(mut self, context: &str) -> Self {
        if !context.trim().is_empty() {
            self.messages.push(Message::system(format!(
                "Relevant reference information:\n{}\n\nUse this information to answer the customer's question if relevant.",
                context
            )));
        }
        self
    }

    /// Splice in the conversation so far; the stored system turn is
    /// skipped since `system_prompt`/`system_text` already heads the
    /// message list.
    pub fn with_history(mut self, history: &[Turn]) -> Self {
        self.messages.extend(history.iter().filter(|t| !t.is_system()).map(|t| Message {
            role: t.role.into(),
            content: t.text.clone(),
        }));
        self
    }

    /// Add the user utterance together with the current entity snapshot
    /// and the echo instructions.
    pub fn user_message_with_snapshot(mut self, input: &str, snapshot: &LeadEntities) -> Self {
        let state = serde_json::json!({ "entities": snapshot });

        self.messages.push(Message::user(format!(
            "{input}\n\n\
             Current entities state: {state}\n\
             Important: Update and include all entities in your response after the {open_tag} tag, even if they haven't changed. Use format:\n\
             Your response text\n\
             {open_tag}\n\
             {{\"entities\": {{...}}}}\n\
             {close_tag}",
            input = input,
            state = state,
            open_tag = ENTITIES_OPEN_TAG,
            close_tag = ENTITIES_CLOSE_TAG,
        )));
        self
    }

    /// Add a plain user message
    pub fn user_message(mut self, input: &str) -> Self {
        self.messages.push(Message::user(input));
        self
    }

    /// Build the final message list
    pub fn build(self) -> Vec<Message> {
        self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
