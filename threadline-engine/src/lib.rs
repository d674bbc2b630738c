mod engine;
pub use engine::{Discussion, EditOutcome, Engine};

mod forest;
pub use forest::{Forest, NodeRef};

mod ledger;
pub use ledger::VoteLedger;

mod present;
pub use present::{CommentPresenter, StoryPresenter};

#[cfg(test)]
mod fuzz;

pub mod api {
    pub use threadline_api::*;
}
