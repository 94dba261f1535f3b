//! Prompt Builder
//!
//! Builds the two conversations sent to the generation capability: SQL
//! generation (schema + dialect rules + question) and result explanation.

use crate::schema::{SchemaDescriptor, SALES_SCHEMA};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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
}

/// Ordered messages submitted as one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn system_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

const DIALECT_RULES: &str = r#"Guidelines:
- SQLite-compatible SQL only.
- When using aggregate functions like GROUP_CONCAT(DISTINCT ...), pass exactly one argument (one column or one expression) inside the DISTINCT. To combine several columns, concatenate them into a single string first (e.g., (col1 || ' ' || col2)) and apply DISTINCT to the result. SQLite does not allow DISTINCT with multiple arguments in aggregate functions.
- Your query must start with SELECT and must not contain any other SQL command (no INSERT, UPDATE, DELETE, CREATE, DROP, etc.).
- Do not use WITH (Common Table Expressions/CTEs). Use only SELECT, subqueries and derived tables. Never start a query with WITH.
- If the query uses UNION or UNION ALL, ORDER BY may appear only once, after the last UNION/UNION ALL branch, at the very end of the query. Never put ORDER BY in a subquery or before a UNION/UNION ALL.
- Date columns should use SQLite date functions when needed (DATE(), DATETIME(), etc.).
- If the question is ambiguous, choose the most reasonable interpretation.
- Some fields have a fixed set of possible values; use them when known. This prevents missing results due to calendar system or formatting inconsistencies."#;

const EXPLANATION_SYSTEM: &str = "You are a helpful data analyst.";

lazy_static! {
    static ref SQL_SYSTEM_PROMPT: String = sql_system_prompt(&SALES_SCHEMA);
}

/// System prompt for SQL generation against `schema`.
pub fn sql_system_prompt(schema: &SchemaDescriptor) -> String {
    let joins: Vec<String> = schema
        .join_conditions()
        .into_iter()
        .map(|j| format!("  * {}", j))
        .collect();

    format!(
        "You are a senior SQL expert. Convert the user's natural language question into a SQL query for a SQLite database with this schema:\n\n\
         {schema}\n\
         {rules}\n\
         - Use JOINs when connecting tables:\n\
         {joins}\n\n\
         Common query patterns:\n\
         - Order quantity: SELECT from SALES_LOGISTICS table\n\n\
         Respond ONLY with a valid SQL query. No explanation, no markdown, no extra text - just the SQL query.",
        schema = schema.render(),
        rules = DIALECT_RULES,
        joins = joins.join("\n"),
    )
}

/// Conversation asking the generator for one SQL query.
pub fn sql_generation_conversation(question: &str, assumptions: Option<&str>) -> Conversation {
    let mut user_content = question.to_string();
    if let Some(notes) = assumptions.filter(|a| !a.trim().is_empty()) {
        user_content.push_str("\n\nAdditional assumptions/notes: ");
        user_content.push_str(notes);
    }

    Conversation::new(vec![
        ChatMessage::system(SQL_SYSTEM_PROMPT.as_str()),
        ChatMessage::user(user_content),
    ])
}

/// Conversation asking the generator to explain `results_summary`.
pub fn explanation_conversation(question: &str, sql: &str, results_summary: &str) -> Conversation {
    let prompt = format!(
        r#"You are a data analyst explaining query results to users. Given:
1. Original question: {question}
2. SQL query executed: {sql}
3. Query results: {results_summary}

Provide a clear, concise, and direct answer to the user's question.
Keep the explanation conversational and accessible to non-technical users.
You may open with a brief, friendly introduction (e.g., "From the database, we found that ...") but always include the full list of results; never omit data present in the results.
Do not lie or give false information.
Only give the direct answer, in the same language as the question."#
    );

    Conversation::new(vec![
        ChatMessage::system(EXPLANATION_SYSTEM),
        ChatMessage::user(prompt),
    ])
}
