use std::{
    collections::{hash_map, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use threadline_api::{
    Comment, CommentId, Dump, Error, Item, ItemId, Order, PageRequest, Store, Time, User, UserId,
    Uuid, Vote, VoteId, VoteOutcome, VoteTarget,
};
use tokio::sync::RwLock;

/// In-memory `Store`. Clones share the same data.
///
/// Every operation runs under a single lock, which makes each of them atomic
/// and serializes concurrent votes on the same target.
#[derive(Clone, Debug, Default)]
pub struct MemStore(Arc<RwLock<Db>>);

#[derive(Debug, Default)]
struct Db {
    users: Vec<User>,
    items: HashMap<ItemId, Item>,

    /// In insertion order, which is creation order
    comments: Vec<Comment>,
    comment_idx: HashMap<CommentId, usize>,

    /// At most one vote per (target, voter)
    votes: HashMap<VoteTarget, HashMap<UserId, Vote>>,

    /// Number of upcoming vote writes that will fail with a conflict
    pending_conflicts: usize,
}

impl Db {
    fn comment_mut(&mut self, id: CommentId) -> Result<&mut Comment, Error> {
        match self.comment_idx.get(&id) {
            Some(&idx) => Ok(&mut self.comments[idx]),
            None => Err(Error::comment_not_found(id)),
        }
    }

    fn target_exists(&self, target: VoteTarget) -> Result<(), Error> {
        match target {
            VoteTarget::Item(i) if !self.items.contains_key(&i) => Err(Error::item_not_found(i)),
            VoteTarget::Comment(c) if !self.comment_idx.contains_key(&c) => {
                Err(Error::comment_not_found(c))
            }
            _ => Ok(()),
        }
    }

    fn vote_of(&self, target: VoteTarget, voter: UserId) -> Option<bool> {
        self.votes
            .get(&target)
            .and_then(|votes| votes.get(&voter))
            .map(|v| v.up)
    }

    /// Recomputes the aggregate score of `target` from its vote rows
    fn refresh_score(&mut self, target: VoteTarget) -> Result<i64, Error> {
        let (up, down) = self
            .votes
            .get(&target)
            .map(|votes| {
                votes.values().fold((0, 0), |(up, down), v| match v.up {
                    true => (up + 1, down),
                    false => (up, down + 1),
                })
            })
            .unwrap_or((0, 0));
        match target {
            VoteTarget::Item(i) => {
                let item = self.items.get_mut(&i).ok_or(Error::item_not_found(i))?;
                item.score = up - down;
                Ok(item.score)
            }
            VoteTarget::Comment(c) => {
                let comment = self.comment_mut(c)?;
                comment.upvotes = up;
                comment.downvotes = down;
                Ok(comment.score())
            }
        }
    }

    fn stories(&self, order: Order, page: PageRequest) -> Vec<Item> {
        let mut items = self.items.values().cloned().collect::<Vec<_>>();
        order.sort(&mut items);
        page.slice(&items).to_vec()
    }
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    /// Loads a dump, recomputing scores and comment counts from the vote and
    /// comment rows rather than trusting the stored ones
    pub fn from_dump(dump: Dump) -> Result<MemStore, Error> {
        let mut db = Db {
            users: dump.users,
            ..Db::default()
        };
        for mut i in dump.items {
            i.comment_count = 0;
            if db.items.insert(i.id, i.clone()).is_some() {
                return Err(Error::InvalidInput(format!("duplicate item {:?}", i.id.0)));
            }
        }
        let mut comments = dump.comments;
        comments.sort_by_key(|c| c.created_at);
        for c in comments {
            if db.comment_idx.contains_key(&c.id) {
                return Err(Error::InvalidInput(format!("duplicate comment {:?}", c.id.0)));
            }
            match db.items.get_mut(&c.item_id) {
                Some(item) => item.comment_count += 1,
                None => {
                    return Err(Error::InvalidInput(format!(
                        "comment {:?} is on unknown item {:?}",
                        c.id.0, c.item_id.0
                    )))
                }
            }
            db.comment_idx.insert(c.id, db.comments.len());
            db.comments.push(c);
        }
        for v in dump.votes {
            db.target_exists(v.target)?;
            match db.votes.entry(v.target).or_default().entry(v.voter_id) {
                hash_map::Entry::Occupied(_) => {
                    return Err(Error::InvalidInput(format!(
                        "duplicate vote of {:?} on {:?}",
                        v.voter_id.0, v.target
                    )))
                }
                hash_map::Entry::Vacant(e) => {
                    e.insert(v);
                }
            }
        }
        let targets = db
            .items
            .keys()
            .map(|&i| VoteTarget::Item(i))
            .chain(db.comments.iter().map(|c| VoteTarget::Comment(c.id)))
            .collect::<Vec<_>>();
        for target in targets {
            db.refresh_score(target)?;
        }
        Ok(MemStore(Arc::new(RwLock::new(db))))
    }

    pub async fn dump(&self) -> Dump {
        let db = self.0.read().await;
        let mut items = db.items.values().cloned().collect::<Vec<_>>();
        Order::Newest.sort(&mut items);
        let mut votes = db
            .votes
            .values()
            .flat_map(|v| v.values())
            .cloned()
            .collect::<Vec<_>>();
        votes.sort_by_key(|v| (v.created_at, v.id));
        Dump {
            users: db.users.clone(),
            items,
            comments: db.comments.clone(),
            votes,
        }
    }

    pub async fn add_user(&self, user: User) {
        self.0.write().await.users.push(user);
    }

    /// Makes the next `n` vote writes fail with `Error::Conflict`
    pub async fn inject_conflicts(&self, n: usize) {
        self.0.write().await.pending_conflicts = n;
    }

    /// Number of vote rows currently stored for `target`
    pub async fn test_num_votes(&self, target: VoteTarget) -> usize {
        self.0
            .read()
            .await
            .votes
            .get(&target)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Store for MemStore {
    async fn list_stories(&mut self, order: Order, page: PageRequest) -> Result<Vec<Item>, Error> {
        Ok(self.0.read().await.stories(order, page))
    }

    async fn list_stories_with_votes(
        &mut self,
        viewer: UserId,
        order: Order,
        page: PageRequest,
    ) -> Result<Vec<(Item, bool)>, Error> {
        let db = self.0.read().await;
        Ok(db
            .stories(order, page)
            .into_iter()
            .map(|i| {
                let voted_up = db.vote_of(VoteTarget::Item(i.id), viewer) == Some(true);
                (i, voted_up)
            })
            .collect())
    }

    async fn list_comments(&mut self, item: ItemId) -> Result<Vec<Comment>, Error> {
        Ok(self
            .0
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.item_id == item)
            .cloned()
            .collect())
    }

    async fn list_comments_with_votes(
        &mut self,
        item: ItemId,
        viewer: UserId,
    ) -> Result<Vec<(Comment, Option<bool>)>, Error> {
        let db = self.0.read().await;
        Ok(db
            .comments
            .iter()
            .filter(|c| c.item_id == item)
            .map(|c| (c.clone(), db.vote_of(VoteTarget::Comment(c.id), viewer)))
            .collect())
    }

    async fn find_item(&mut self, id: ItemId) -> Result<Item, Error> {
        self.0
            .read()
            .await
            .items
            .get(&id)
            .cloned()
            .ok_or(Error::item_not_found(id))
    }

    async fn find_comment(&mut self, id: CommentId) -> Result<Comment, Error> {
        let db = self.0.read().await;
        match db.comment_idx.get(&id) {
            Some(&idx) => Ok(db.comments[idx].clone()),
            None => Err(Error::comment_not_found(id)),
        }
    }

    async fn find_vote(
        &mut self,
        target: VoteTarget,
        voter: UserId,
    ) -> Result<Option<bool>, Error> {
        Ok(self.0.read().await.vote_of(target, voter))
    }

    async fn upsert_vote(
        &mut self,
        target: VoteTarget,
        voter: UserId,
        up: bool,
        at: Time,
    ) -> Result<VoteOutcome, Error> {
        let mut db = self.0.write().await;
        if db.pending_conflicts > 0 {
            db.pending_conflicts -= 1;
            return Err(Error::Conflict);
        }
        db.target_exists(target)?;
        let vote = match db.votes.entry(target).or_default().entry(voter) {
            hash_map::Entry::Occupied(mut e) => {
                e.get_mut().up = up;
                e.get().clone()
            }
            hash_map::Entry::Vacant(e) => e
                .insert(Vote {
                    id: VoteId(Uuid::new_v4()),
                    target,
                    voter_id: voter,
                    up,
                    created_at: at,
                })
                .clone(),
        };
        let score = db.refresh_score(target)?;
        tracing::trace!(?target, ?voter, up, score, "stored vote");
        Ok(VoteOutcome { vote, score })
    }

    async fn insert_item(&mut self, item: Item) -> Result<(), Error> {
        let mut db = self.0.write().await;
        if db.items.contains_key(&item.id) {
            return Err(Error::InvalidInput(format!(
                "item id {:?} already used",
                item.id.0
            )));
        }
        let author_vote = Vote {
            id: VoteId(Uuid::new_v4()),
            target: VoteTarget::Item(item.id),
            voter_id: item.author_id,
            up: true,
            created_at: item.created_at,
        };
        let target = author_vote.target;
        db.items.insert(item.id, item);
        db.votes
            .entry(target)
            .or_default()
            .insert(author_vote.voter_id, author_vote);
        db.refresh_score(target)?;
        Ok(())
    }

    async fn insert_comment(&mut self, comment: Comment) -> Result<(), Error> {
        let mut db = self.0.write().await;
        if db.comment_idx.contains_key(&comment.id) {
            return Err(Error::InvalidInput(format!(
                "comment id {:?} already used",
                comment.id.0
            )));
        }
        db.items
            .get_mut(&comment.item_id)
            .ok_or(Error::item_not_found(comment.item_id))?
            .comment_count += 1;
        let idx = db.comments.len();
        db.comment_idx.insert(comment.id, idx);
        db.comments.push(comment);
        Ok(())
    }

    async fn update_comment(&mut self, comment: &Comment) -> Result<(), Error> {
        let mut db = self.0.write().await;
        db.comment_mut(comment.id)?.body = comment.body.clone();
        Ok(())
    }
}
