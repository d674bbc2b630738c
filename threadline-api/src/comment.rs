use uuid::Uuid;

use crate::{validate_text, Error, ItemId, Time, UserId, Viewer, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,

    /// None for top-level comments
    pub parent_id: Option<CommentId>,
    pub item_id: ItemId,
    pub body: String,

    pub upvotes: i64,
    pub downvotes: i64,

    pub author_id: UserId,
    pub author_name: String,
    pub created_at: Time,
}

impl Comment {
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub item_id: ItemId,
    pub parent_id: Option<CommentId>,
    pub body: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        validate_text("body", &self.body)
    }

    pub fn into_comment(self, id: CommentId, author: &Viewer, created_at: Time) -> Comment {
        Comment {
            id,
            parent_id: self.parent_id,
            item_id: self.item_id,
            body: self.body,
            upvotes: 0,
            downvotes: 0,
            author_id: author.id,
            author_name: author.name.clone(),
            created_at,
        }
    }
}
