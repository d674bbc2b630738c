use async_trait::async_trait;

use crate::{
    Comment, CommentId, Error, Item, ItemId, Order, PageRequest, Time, User, UserId, Vote,
    VoteTarget,
};

/// A vote as it was stored, along with the target's score right after
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VoteOutcome {
    pub vote: Vote,
    pub score: i64,
}

/// Full contents of a store, as loaded from or saved to disk
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Dump {
    pub users: Vec<User>,
    pub items: Vec<Item>,
    pub comments: Vec<Comment>,
    pub votes: Vec<Vote>,
}

impl Dump {
    pub fn user_named(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name)
    }
}

/// Storage collaborator. Every method is one atomic operation.
#[async_trait]
pub trait Store: Send {
    async fn list_stories(&mut self, order: Order, page: PageRequest) -> Result<Vec<Item>, Error>;

    /// Like `list_stories`, with whether `viewer` currently votes each one up
    async fn list_stories_with_votes(
        &mut self,
        viewer: UserId,
        order: Order,
        page: PageRequest,
    ) -> Result<Vec<(Item, bool)>, Error>;

    /// All comments on `item`, in creation order
    async fn list_comments(&mut self, item: ItemId) -> Result<Vec<Comment>, Error>;

    /// Like `list_comments`, with the direction of `viewer`'s vote on each one
    async fn list_comments_with_votes(
        &mut self,
        item: ItemId,
        viewer: UserId,
    ) -> Result<Vec<(Comment, Option<bool>)>, Error>;

    async fn find_item(&mut self, id: ItemId) -> Result<Item, Error>;
    async fn find_comment(&mut self, id: CommentId) -> Result<Comment, Error>;

    /// Direction of `voter`'s vote on `target`, if they voted on it
    async fn find_vote(
        &mut self,
        target: VoteTarget,
        voter: UserId,
    ) -> Result<Option<bool>, Error>;

    /// Inserts or updates the single vote of `voter` on `target`, and updates
    /// the target's score in the same write.
    ///
    /// Fails with `Error::Conflict` if the write raced with another one.
    async fn upsert_vote(
        &mut self,
        target: VoteTarget,
        voter: UserId,
        up: bool,
        at: Time,
    ) -> Result<VoteOutcome, Error>;

    async fn upsert_vote_on_item(
        &mut self,
        item: ItemId,
        voter: UserId,
        up: bool,
        at: Time,
    ) -> Result<VoteOutcome, Error> {
        self.upsert_vote(VoteTarget::Item(item), voter, up, at)
            .await
    }

    async fn upsert_vote_on_comment(
        &mut self,
        comment: CommentId,
        voter: UserId,
        up: bool,
        at: Time,
    ) -> Result<VoteOutcome, Error> {
        self.upsert_vote(VoteTarget::Comment(comment), voter, up, at)
            .await
    }

    /// Also records the author's implicit up vote, so `item.score` must be 1
    async fn insert_item(&mut self, item: Item) -> Result<(), Error>;

    /// Also bumps the owning item's comment count
    async fn insert_comment(&mut self, comment: Comment) -> Result<(), Error>;

    /// Only the body is ever updated
    async fn update_comment(&mut self, comment: &Comment) -> Result<(), Error>;
}
