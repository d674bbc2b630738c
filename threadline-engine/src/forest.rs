use std::{collections::HashMap, fmt};

use crate::api::{can_edit, Comment, CommentId, Time, UserId};

/// Slot of the node whose children are the top-level comments
const VIRTUAL_ROOT: usize = 0;

#[derive(Clone, Debug, Default)]
struct Node {
    /// None only for the virtual root
    id: Option<CommentId>,

    /// None for the virtual root and for placeholders
    comment: Option<Comment>,

    parent: Option<usize>,

    /// In the order the rows were seen
    children: Vec<usize>,

    editable: bool,
}

/// The comment threads of one item, rebuilt from flat parent-referencing rows.
///
/// Nodes live in an arena indexed by comment id. A row whose parent was not
/// part of the input hangs under a placeholder node, which has an id but no
/// comment and is not reachable from `roots`; see `detached`.
#[derive(Clone, Debug)]
pub struct Forest {
    nodes: Vec<Node>,
    index: HashMap<CommentId, usize>,
}

impl Forest {
    /// Siblings keep the order of `comments`: sort the input first for any
    /// other order.
    pub fn build<I: IntoIterator<Item = Comment>>(comments: I) -> Forest {
        let mut forest = Forest {
            nodes: vec![Node::default()],
            index: HashMap::new(),
        };
        for c in comments {
            forest.insert(c);
        }
        forest
    }

    fn node_for(&mut self, id: CommentId) -> usize {
        let nodes = &mut self.nodes;
        *self.index.entry(id).or_insert_with(|| {
            nodes.push(Node {
                id: Some(id),
                ..Node::default()
            });
            nodes.len() - 1
        })
    }

    /// Whether `ancestor` is `node` itself or above it
    fn is_ancestor(&self, ancestor: usize, mut node: usize) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    fn insert(&mut self, comment: Comment) {
        let id = comment.id;
        let idx = self.node_for(id);
        if self.nodes[idx].comment.is_some() {
            tracing::warn!(comment = ?id.0, "ignoring duplicate comment row");
            return;
        }
        let parent = match comment.parent_id {
            None => VIRTUAL_ROOT,
            Some(p) => self.node_for(p),
        };
        self.nodes[idx].comment = Some(comment);
        // only a node that already has children can be above its new parent
        let may_loop = parent == idx || !self.nodes[idx].children.is_empty();
        if may_loop && self.is_ancestor(idx, parent) {
            tracing::warn!(comment = ?id.0, "comment is its own ancestor, detaching it");
            return;
        }
        self.nodes[idx].parent = Some(parent);
        self.nodes[parent].children.push(idx);
    }

    fn node(&self, idx: usize) -> NodeRef<'_> {
        NodeRef { forest: self, idx }
    }

    /// Top-level comments, in first-seen order
    pub fn roots(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.nodes[VIRTUAL_ROOT]
            .children
            .iter()
            .map(move |&idx| self.node(idx))
    }

    fn detached_idx(&self) -> impl Iterator<Item = usize> + '_ {
        (VIRTUAL_ROOT + 1..self.nodes.len()).filter(move |&idx| self.nodes[idx].parent.is_none())
    }

    /// Heads of the subtrees not reachable from `roots`: placeholders for
    /// parents missing from the input, and comments whose parent chain
    /// loops back onto themselves.
    pub fn detached(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.detached_idx().map(move |idx| self.node(idx))
    }

    /// Every node that holds no comment
    pub fn placeholders(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (VIRTUAL_ROOT + 1..self.nodes.len())
            .map(move |idx| self.node(idx))
            .filter(|n| n.is_placeholder())
    }

    pub fn find(&self, id: CommentId) -> Option<NodeRef<'_>> {
        self.index.get(&id).map(|&idx| self.node(idx))
    }

    /// Number of comments, placeholders excluded
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.comment.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All comments, depth-first, top-level threads then detached ones.
    ///
    /// Placeholders are skipped, their descendants are not.
    pub fn flatten(&self) -> Vec<&Comment> {
        let mut res = Vec::with_capacity(self.index.len());
        let mut stack = self.nodes[VIRTUAL_ROOT]
            .children
            .iter()
            .copied()
            .chain(self.detached_idx())
            .collect::<Vec<_>>();
        stack.reverse();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if let Some(c) = &node.comment {
                res.push(c);
            }
            stack.extend(node.children.iter().rev());
        }
        res
    }

    /// Marks as editable exactly the comments `viewer` may still edit at `now`
    pub fn set_editable(&mut self, viewer: UserId, window: chrono::Duration, now: Time) {
        for node in self.nodes.iter_mut() {
            node.editable = node
                .comment
                .as_ref()
                .map_or(false, |c| can_edit(c, viewer, window, now));
        }
    }
}

#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    forest: &'a Forest,
    idx: usize,
}

impl<'a> NodeRef<'a> {
    fn raw(&self) -> &'a Node {
        &self.forest.nodes[self.idx]
    }

    pub fn id(&self) -> Option<CommentId> {
        self.raw().id
    }

    pub fn comment(&self) -> Option<&'a Comment> {
        self.raw().comment.as_ref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.raw().comment.is_none()
    }

    pub fn editable(&self) -> bool {
        self.raw().editable
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> {
        let forest = self.forest;
        self.raw()
            .children
            .iter()
            .map(move |&idx| NodeRef { forest, idx })
    }
}

impl<'a> fmt::Debug for NodeRef<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("placeholder", &self.is_placeholder())
            .field("children", &self.raw().children.len())
            .finish()
    }
}
