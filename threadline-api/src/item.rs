use uuid::Uuid;

use crate::{validate_string, validate_text, Error, Rankable, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn stub() -> ItemId {
        ItemId(STUB_UUID)
    }
}

/// A submitted story
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub url: Option<String>,
    pub body: Option<String>,

    /// Sum of all the votes on this item, including the author's implicit one
    pub score: i64,

    pub author_id: UserId,
    pub author_name: String,
    pub created_at: Time,
    pub comment_count: u64,
}

impl Rankable for Item {
    fn score(&self) -> i64 {
        self.score
    }

    fn created_at(&self) -> Time {
        self.created_at
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewItem {
    pub title: String,
    pub url: Option<String>,
    pub body: Option<String>,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), Error> {
        validate_text("title", &self.title)?;
        if let Some(url) = &self.url {
            validate_string(url)?;
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidInput(format!(
                    "url must be http or https: {url:?}"
                )));
            }
        }
        if let Some(body) = &self.body {
            validate_string(body)?;
        }
        Ok(())
    }

    pub fn into_item(self, id: ItemId, author: &crate::Viewer, created_at: Time) -> Item {
        Item {
            id,
            title: self.title,
            url: self.url,
            // an all-blank body is the same as no body at all
            body: self.body.filter(|b| !b.trim().is_empty()),
            score: 1,
            author_id: author.id,
            author_name: author.name.clone(),
            created_at,
            comment_count: 0,
        }
    }
}
