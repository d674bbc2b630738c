use std::collections::HashMap;

use crate::{
    api::{Comment, CommentId, Item},
    NodeRef,
};

/// One row of a story listing
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StoryPresenter {
    /// 1-based position in the whole listing, not just this page
    pub position: i64,
    pub item: Item,
    pub rank: f64,
    pub voted_up: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct CommentPresenter {
    pub comment: Comment,
    pub score: i64,
    pub depth: usize,
    pub editable: bool,

    /// Direction of the viewer's vote, if any
    pub viewer_vote: Option<bool>,

    pub children: Vec<CommentPresenter>,
}

impl CommentPresenter {
    /// Presents the threads under `heads`, in order.
    ///
    /// Placeholders are not shown, their children take their place at the
    /// same depth. Replies nested below `max_depth` are listed flat at
    /// `max_depth`, after the comment they would have been nested under.
    pub fn threads<'a>(
        heads: impl Iterator<Item = NodeRef<'a>>,
        max_depth: usize,
        votes: &HashMap<CommentId, bool>,
    ) -> Vec<CommentPresenter> {
        // Pre-order walk, recording for each presenter the index of the
        // presenter it is shown under
        let mut built: Vec<(Option<usize>, Option<CommentPresenter>)> = Vec::new();
        let mut stack = heads.map(|n| (n, 0, None)).collect::<Vec<_>>();
        stack.reverse();
        while let Some((node, depth, shown_under)) = stack.pop() {
            let (child_depth, child_under) = match node.comment() {
                None => (depth, shown_under),
                Some(comment) => {
                    built.push((
                        shown_under,
                        Some(CommentPresenter {
                            comment: comment.clone(),
                            score: comment.score(),
                            depth,
                            editable: node.editable(),
                            viewer_vote: votes.get(&comment.id).copied(),
                            children: Vec::new(),
                        }),
                    ));
                    match depth < max_depth {
                        true => (depth + 1, Some(built.len() - 1)),
                        false => (depth, shown_under),
                    }
                }
            };
            let first_child = stack.len();
            stack.extend(node.children().map(|c| (c, child_depth, child_under)));
            stack[first_child..].reverse();
        }

        // Children always come after their parent, so moving presenters into
        // their parent from the back finishes each one before it moves
        let mut res = Vec::new();
        for idx in (0..built.len()).rev() {
            let (shown_under, presenter) = &mut built[idx];
            let shown_under = *shown_under;
            let Some(mut presenter) = presenter.take() else {
                continue;
            };
            presenter.children.reverse();
            match shown_under {
                Some(parent) => {
                    if let Some(parent) = built[parent].1.as_mut() {
                        parent.children.push(presenter);
                    }
                }
                None => res.push(presenter),
            }
        }
        res.reverse();
        res
    }

    /// Number of comments in this subtree, including this one
    pub fn count(&self) -> usize {
        let mut res = 0;
        let mut stack = vec![self];
        while let Some(c) = stack.pop() {
            res += 1;
            stack.extend(c.children.iter());
        }
        res
    }
}
