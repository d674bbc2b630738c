use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    api::{
        can_edit, paginate, rank, validate_text, Clock, Comment, CommentId, EngineConfig, Error,
        Item, ItemId, Listing, NewComment, NewItem, Order, Page, PageRequest, Store, UserId,
        Uuid, Viewer, VoteOutcome, VoteTarget,
    },
    CommentPresenter, Forest, StoryPresenter, VoteLedger,
};

/// A story with its comment threads, ready for rendering
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Discussion {
    pub item: Item,
    pub rank: f64,
    pub voted_up: bool,

    /// Top-level threads
    pub comments: Vec<CommentPresenter>,

    /// Threads whose parent could not be found
    pub detached: Vec<CommentPresenter>,
}

impl Discussion {
    pub fn num_comments(&self) -> usize {
        self.comments
            .iter()
            .chain(self.detached.iter())
            .map(|c| c.count())
            .sum()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub enum EditOutcome {
    Edited(Comment),

    /// Not the author, or too late. Nothing was written.
    Denied(Comment),
}

struct StoryListing<'a, S> {
    store: &'a mut S,
    viewer: Option<UserId>,
    order: Order,
}

#[async_trait]
impl<'a, S: Store> Listing for StoryListing<'a, S> {
    type Entry = (Item, bool);

    async fn fetch(&mut self, req: PageRequest) -> Result<Vec<(Item, bool)>, Error> {
        match self.viewer {
            Some(viewer) => {
                self.store
                    .list_stories_with_votes(viewer, self.order, req)
                    .await
            }
            None => Ok(self
                .store
                .list_stories(self.order, req)
                .await?
                .into_iter()
                .map(|i| (i, false))
                .collect()),
        }
    }
}

/// Ranking and threading over a `Store`, with time taken from a `Clock`
pub struct Engine<S> {
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    ledger: VoteLedger,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, config: EngineConfig) -> Engine<S> {
        let ledger = VoteLedger::new(config.vote_attempts);
        Engine {
            store,
            clock,
            config,
            ledger,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ranked order, as of now
    pub fn ranked(&self) -> Order {
        Order::Ranked {
            params: self.config.rank_params(),
            at: self.clock.now(),
        }
    }

    pub async fn front_page(
        &mut self,
        viewer: Option<&Viewer>,
        order: Order,
        page: i64,
    ) -> Result<Page<StoryPresenter>, Error> {
        let now = self.clock.now();
        let params = self.config.rank_params();
        let mut listing = StoryListing {
            store: &mut self.store,
            viewer: viewer.map(|v| v.id),
            order,
        };
        let page = paginate(&mut listing, page, self.config.page_size).await?;
        // cannot overflow, paginate validated the window
        let mut position = page.index * page.size;
        Ok(page.map(|(item, voted_up)| {
            position += 1;
            StoryPresenter {
                position,
                rank: rank(&item, &params, now),
                item,
                voted_up,
            }
        }))
    }

    pub async fn discussion(
        &mut self,
        item_id: ItemId,
        viewer: Option<&Viewer>,
    ) -> Result<Discussion, Error> {
        let now = self.clock.now();
        let item = self.store.find_item(item_id).await?;
        let (rows, votes, voted_up) = match viewer {
            None => (
                self.store.list_comments(item_id).await?,
                HashMap::new(),
                false,
            ),
            Some(v) => {
                let rows = self.store.list_comments_with_votes(item_id, v.id).await?;
                let votes = rows
                    .iter()
                    .filter_map(|(c, vote)| vote.map(|up| (c.id, up)))
                    .collect::<HashMap<CommentId, bool>>();
                let voted_up = self
                    .store
                    .find_vote(VoteTarget::Item(item_id), v.id)
                    .await?
                    == Some(true);
                (rows.into_iter().map(|(c, _)| c).collect(), votes, voted_up)
            }
        };

        let mut forest = Forest::build(rows);
        if let Some(v) = viewer {
            forest.set_editable(v.id, self.config.edit_window(), now);
        }
        let max_depth = self.config.max_display_depth;
        let comments = CommentPresenter::threads(forest.roots(), max_depth, &votes);
        let detached = CommentPresenter::threads(forest.detached(), max_depth, &votes);
        if !detached.is_empty() {
            tracing::warn!(
                item = ?item_id.0,
                num_detached = detached.len(),
                "discussion has comments whose parent is missing"
            );
        }

        Ok(Discussion {
            rank: rank(&item, &self.config.rank_params(), now),
            item,
            voted_up,
            comments,
            detached,
        })
    }

    pub async fn submit_story(&mut self, viewer: &Viewer, new: NewItem) -> Result<Item, Error> {
        new.validate()?;
        let item = new.into_item(ItemId(Uuid::new_v4()), viewer, self.clock.now());
        self.store.insert_item(item.clone()).await?;
        tracing::info!(item = ?item.id.0, author = ?viewer.id.0, "submitted story");
        Ok(item)
    }

    pub async fn submit_comment(
        &mut self,
        viewer: &Viewer,
        new: NewComment,
    ) -> Result<Comment, Error> {
        new.validate()?;
        self.store.find_item(new.item_id).await?;
        if let Some(parent_id) = new.parent_id {
            let parent = self.store.find_comment(parent_id).await?;
            if parent.item_id != new.item_id {
                return Err(Error::InvalidInput(format!(
                    "parent comment {:?} belongs to another item",
                    parent_id.0
                )));
            }
        }
        let comment = new.into_comment(CommentId(Uuid::new_v4()), viewer, self.clock.now());
        self.store.insert_comment(comment.clone()).await?;
        tracing::info!(comment = ?comment.id.0, author = ?viewer.id.0, "submitted comment");
        Ok(comment)
    }

    /// Replaces the body of a comment, if `viewer` may still edit it.
    ///
    /// Edits that are not allowed are not an error: they come back as
    /// `EditOutcome::Denied` and nothing is written.
    pub async fn edit_comment(
        &mut self,
        viewer: &Viewer,
        id: CommentId,
        body: String,
    ) -> Result<EditOutcome, Error> {
        let mut comment = self.store.find_comment(id).await?;
        if !can_edit(
            &comment,
            viewer.id,
            self.config.edit_window(),
            self.clock.now(),
        ) {
            tracing::info!(comment = ?id.0, viewer = ?viewer.id.0, "ignoring disallowed edit");
            return Ok(EditOutcome::Denied(comment));
        }
        validate_text("body", &body)?;
        comment.body = body;
        self.store.update_comment(&comment).await?;
        Ok(EditOutcome::Edited(comment))
    }

    pub async fn vote(
        &mut self,
        viewer: &Viewer,
        target: VoteTarget,
        up: bool,
    ) -> Result<VoteOutcome, Error> {
        let now = self.clock.now();
        self.ledger
            .upsert(&mut self.store, target, viewer.id, up, now)
            .await
    }
}
