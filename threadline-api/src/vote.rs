use uuid::Uuid;

use crate::{CommentId, Error, ItemId, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct VoteId(pub Uuid);

/// What a vote applies to. Exactly one of the two, always.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum VoteTarget {
    Item(ItemId),
    Comment(CommentId),
}

impl VoteTarget {
    /// Rebuilds a target from the two nullable columns a vote row is stored as
    pub fn from_columns(
        comment: Option<CommentId>,
        item: Option<ItemId>,
    ) -> Result<VoteTarget, Error> {
        match (comment, item) {
            (Some(c), None) => Ok(VoteTarget::Comment(c)),
            (None, Some(i)) => Ok(VoteTarget::Item(i)),
            (Some(c), Some(i)) => Err(Error::InvalidInput(format!(
                "vote targets both comment {:?} and item {:?}",
                c.0, i.0
            ))),
            (None, None) => Err(Error::InvalidInput(String::from(
                "vote targets neither a comment nor an item",
            ))),
        }
    }

    pub fn to_columns(&self) -> (Option<CommentId>, Option<ItemId>) {
        match *self {
            VoteTarget::Comment(c) => (Some(c), None),
            VoteTarget::Item(i) => (None, Some(i)),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Vote {
    pub id: VoteId,
    pub target: VoteTarget,
    pub voter_id: UserId,
    pub up: bool,
    pub created_at: Time,
}

impl Vote {
    pub fn weight(&self) -> i64 {
        match self.up {
            true => 1,
            false => -1,
        }
    }
}
