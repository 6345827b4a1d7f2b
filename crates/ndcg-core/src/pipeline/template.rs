//! Query templates with placeholder substitution.
//!
//! A template is an ordered list of JSON stages understood by a search
//! engine. Two placeholder tokens are recognised anywhere inside the stages:
//!
//! - `{{QUERY}}` - the live query (text, or any JSON value such as a vector)
//! - `{{INDEX_NAME}}` - the name of the search index
//!
//! A string that is exactly `{{QUERY}}` is replaced by the query value itself,
//! whatever its type. Inside longer strings `{{INDEX_NAME}}` is always
//! substituted and `{{QUERY}}` only when the query is text.

use crate::config::{INDEX_NAME_PLACEHOLDER, QUERY_PLACEHOLDER};
use crate::error::TemplateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// Ordered stages with placeholder tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTemplate {
    stages: Vec<Value>,
}

/// Template with every placeholder substituted, ready to execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub stages: Vec<Value>,
    /// Query value the template was rendered with
    pub query: Value,
    /// Index name the template was rendered with
    pub index_name: String,
}

impl QueryTemplate {
    pub fn new(stages: Vec<Value>) -> Self {
        Self { stages }
    }

    /// Accepts a bare stage array or an object with a `pipeline` array.
    pub fn from_json(value: Value) -> Result<Self, TemplateError> {
        match value {
            Value::Array(stages) => Ok(Self::new(stages)),
            Value::Object(map) => match map.get("pipeline") {
                Some(Value::Array(stages)) => Ok(Self::new(stages.clone())),
                Some(other) => Err(TemplateError::InvalidFormat(format!(
                    "'pipeline' must be an array, found {}",
                    json_kind(other)
                ))),
                None => Err(TemplateError::InvalidFormat(
                    "expected array or object with 'pipeline' key".to_string(),
                )),
            },
            other => Err(TemplateError::InvalidFormat(format!(
                "expected array or object with 'pipeline' key, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parses a template from JSON text.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// Loads a template from a JSON file.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::NotFound`] if `path` does not exist
    /// - [`TemplateError::Io`] / [`TemplateError::Json`] if it cannot be read or parsed
    /// - [`TemplateError::InvalidFormat`] for JSON of the wrong shape
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TemplateError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let template = Self::parse(&text)?;
        info!(
            "Loaded template {} with {} stages",
            path.display(),
            template.len()
        );
        Ok(template)
    }

    pub fn stages(&self) -> &[Value] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Substitutes `query` and `index_name` through every stage.
    pub fn render(&self, query: &Value, index_name: &str) -> RenderedQuery {
        let stages = self
            .stages
            .iter()
            .map(|stage| substitute(stage, query, index_name))
            .collect();
        RenderedQuery {
            stages,
            query: query.clone(),
            index_name: index_name.to_string(),
        }
    }
}

fn substitute(value: &Value, query: &Value, index_name: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, query, index_name)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| substitute(v, query, index_name))
                .collect(),
        ),
        Value::String(s) if s == QUERY_PLACEHOLDER => query.clone(),
        Value::String(s) => {
            let mut out = s.replace(INDEX_NAME_PLACEHOLDER, index_name);
            if let Value::String(text) = query {
                out = out.replace(QUERY_PLACEHOLDER, text);
            }
            Value::String(out)
        }
        other => other.clone(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
