mod clock;
pub use clock::{Clock, FixedClock, SystemClock};

mod comment;
pub use comment::{Comment, CommentId, NewComment};

mod config;
pub use config::EngineConfig;

mod edit;
pub use edit::can_edit;

mod error;
pub use error::{Error, Resource};

mod item;
pub use item::{Item, ItemId, NewItem};

mod page;
pub use page::{paginate, Listing, Page, PageRequest, NO_NEXT_PAGE};

mod rank;
pub use rank::{rank, Order, RankParams, Rankable};

mod store;
pub use store::{Dump, Store, VoteOutcome};

mod user;
pub use user::{User, UserId, Viewer};

mod vote;
pub use vote::{Vote, VoteId, VoteTarget};

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<chrono::Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::InvalidInput(format!(
            "null byte in string is not allowed: {s:?}"
        )));
    }
    Ok(())
}

/// Like `validate_string`, but also rejects strings that are empty once trimmed
pub fn validate_text(field: &str, s: &str) -> Result<(), Error> {
    validate_string(s)?;
    if s.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
