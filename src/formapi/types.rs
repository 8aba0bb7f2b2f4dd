use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::fields::AnswerField;

/// One submission as returned by the form provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSubmission {
    pub id: String,
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub status: String,
    /// Keyed by the provider's numeric field id (as a string).
    #[serde(default)]
    pub answers: HashMap<String, RemoteAnswer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAnswer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    /// Free-form: strings for text fields, arrays/objects for uploads and
    /// composite widgets. Normalized to a single string for the payload.
    #[serde(default)]
    pub answer: Option<Value>,
}

impl RemoteAnswer {
    fn value_as_string(&self) -> String {
        match &self.answer {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

impl RemoteSubmission {
    /// Flatten the answer map into the ordered payload snapshot stored on a
    /// submission. Order follows the provider's numeric field ids so repeated
    /// syncs produce identical payloads for identical remote state.
    pub fn to_payload(&self) -> Vec<AnswerField> {
        let mut keyed: Vec<(&String, &RemoteAnswer)> = self.answers.iter().collect();
        keyed.sort_by_key(|(field_id, _)| {
            field_id.parse::<u64>().unwrap_or(u64::MAX)
        });
        keyed
            .into_iter()
            .map(|(_, answer)| AnswerField {
                field_name: answer.name.clone(),
                label: answer.text.clone(),
                field_type: answer.field_type.clone(),
                value: answer.value_as_string(),
            })
            .collect()
    }
}

/// Form metadata, fetched for diagnostics.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteForm {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
}

/// Top-level envelope the provider wraps every response in.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, rename = "responseCode")]
    pub response_code: Option<u32>,
    pub content: T,
}
