use std::{fmt, str::FromStr};

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

use crate::{CommentId, ItemId, UserId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Resource {
    Item,
    Comment,
    User,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Item => "item",
            Resource::Comment => "comment",
            Resource::User => "user",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Resource> {
        match s {
            "item" => Ok(Resource::Item),
            "comment" => Ok(Resource::Comment),
            "user" => Ok(Resource::User),
            _ => Err(anyhow!("unknown resource kind {s:?}")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("No {kind} with id {id}")]
    NotFound { kind: Resource, id: Uuid },

    #[error("Concurrent write conflict")]
    Conflict,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn item_not_found(id: ItemId) -> Error {
        Error::NotFound {
            kind: Resource::Item,
            id: id.0,
        }
    }

    pub fn comment_not_found(id: CommentId) -> Error {
        Error::NotFound {
            kind: Resource::Comment,
            id: id.0,
        }
    }

    pub fn user_not_found(id: UserId) -> Error {
        Error::NotFound {
            kind: Resource::User,
            id: id.0,
        }
    }

    /// Only write conflicts are worth retrying, everything else will fail again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict)
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::NotFound { kind, id } => json!({
                "message": "resource not found",
                "type": "not-found",
                "kind": kind.as_str(),
                "id": id,
            }),
            Error::Conflict => json!({
                "message": "concurrent write conflict, please retry",
                "type": "conflict",
            }),
            Error::InvalidInput(msg) => json!({
                "message": msg,
                "type": "invalid-input",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "not-found" => Error::NotFound {
                    kind: data
                        .get("kind")
                        .and_then(|k| k.as_str())
                        .ok_or_else(|| anyhow!("not-found error without a resource kind"))?
                        .parse()?,
                    id: data
                        .get("id")
                        .and_then(|id| id.as_str())
                        .and_then(|id| Uuid::from_str(id).ok())
                        .ok_or_else(|| anyhow!("not-found error without a proper uuid"))?,
                },
                "conflict" => Error::Conflict,
                "invalid-input" => Error::InvalidInput(message()),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_contents_parse_back() {
        let errors = [
            Error::Unknown(String::from("boom")),
            Error::comment_not_found(CommentId(Uuid::from_u128(42))),
            Error::Conflict,
            Error::InvalidInput(String::from("page size must be positive")),
        ];
        for err in errors {
            assert_eq!(Error::parse(&err.contents()).unwrap(), err);
        }
    }

    #[test]
    fn unknown_error_type_is_rejected() {
        assert!(Error::parse(br#"{"type": "teapot"}"#).is_err());
        assert!(Error::parse(b"not json").is_err());
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(Error::Conflict.is_retryable());
        assert!(!Error::item_not_found(ItemId(Uuid::nil())).is_retryable());
        assert!(!Error::InvalidInput(String::new()).is_retryable());
    }
}
