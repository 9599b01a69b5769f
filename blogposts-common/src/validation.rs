//! Checks raw request bodies before anything touches the store.
//!
//! Payloads are inspected as JSON objects rather than deserialized straight
//! into structs so that key presence can be reported by name. A key holding
//! `null` counts as absent. Rules run in a fixed order and the first failure
//! is returned.

use crate::model::{
    Id,
    post::{Author, CreatePost, PostMarker, UpdatePost},
};
use serde_json::{Map, Value};
use thiserror::Error;

pub const UPDATE_FIELDS: [&str; 4] = ["title", "author", "content", "id"];

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ValidationError {
    #[error("The request body must be a JSON object")]
    NotAnObject,
    #[error("Missing {0} in request body")]
    MissingField(&'static str),
    #[error("The author key must be a nested object with author.firstName and/or author.lastName")]
    InvalidAuthorShape,
    #[error(
        "The request parameter id {path} must match the request body id {found}",
        found = .body.as_deref().unwrap_or("<none>")
    )]
    IdMismatch {
        path: Id<PostMarker>,
        body: Option<String>,
    },
    #[error(
        "{0} is not a valid key in the request body. \
        The request body may only contain the keys [title, author, content, id]"
    )]
    UnknownField(String),
    #[error("The {0} field must be a string")]
    NotAString(&'static str),
}

fn present<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    payload.get(key).filter(|value| !value.is_null())
}

fn object(payload: &Value) -> Result<&Map<String, Value>, ValidationError> {
    payload.as_object().ok_or(ValidationError::NotAnObject)
}

fn required<'a>(
    payload: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    present(payload, field).ok_or(ValidationError::MissingField(field))
}

fn string(value: &Value, field: &'static str) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or(ValidationError::NotAString(field))
}

fn optional_string(
    payload: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    present(payload, field)
        .map(|value| string(value, field))
        .transpose()
}

fn author(value: &Value) -> Result<Author, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::InvalidAuthorShape)?;
    let name_part = |key: &str| match present(object, key) {
        None => Ok(None),
        Some(Value::String(part)) => Ok(Some(part.clone())),
        Some(_) => Err(ValidationError::InvalidAuthorShape),
    };

    let author = Author::new(name_part("firstName")?, name_part("lastName")?);
    if author.has_name() {
        Ok(author)
    } else {
        Err(ValidationError::InvalidAuthorShape)
    }
}

fn id_matches(path: Id<PostMarker>, body: &Value) -> bool {
    match body {
        Value::Number(number) => number.as_u64() == Some(path.into()),
        Value::String(string) => string.parse::<Id<PostMarker>>() == Ok(path),
        _ => false,
    }
}

impl CreatePost {
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let payload = object(payload)?;

        let title = required(payload, "title")?;
        let author = author(required(payload, "author")?)?;
        let content = required(payload, "content")?;

        Ok(Self {
            title: string(title, "title")?,
            author,
            content: string(content, "content")?,
        })
    }
}

impl UpdatePost {
    pub fn from_payload(id: Id<PostMarker>, payload: &Value) -> Result<Self, ValidationError> {
        let payload = object(payload)?;

        match present(payload, "id") {
            Some(body_id) if id_matches(id, body_id) => {}
            body_id => {
                return Err(ValidationError::IdMismatch {
                    path: id,
                    body: body_id.map(|body_id| match body_id {
                        Value::String(string) => string.clone(),
                        other => other.to_string(),
                    }),
                });
            }
        }

        let author = present(payload, "author").map(author).transpose()?;

        if let Some(key) = payload
            .keys()
            .find(|key| !UPDATE_FIELDS.contains(&key.as_str()))
        {
            return Err(ValidationError::UnknownField(key.clone()));
        }

        Ok(Self {
            id,
            title: optional_string(payload, "title")?,
            author,
            content: optional_string(payload, "content")?,
        })
    }
}
