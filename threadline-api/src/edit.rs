use crate::{Comment, Time, UserId};

/// Whether `viewer` may still change the body of `comment` at `now`.
///
/// Only the author may edit, and only while `now` is strictly before
/// `created_at + window`.
pub fn can_edit(comment: &Comment, viewer: UserId, window: chrono::Duration, now: Time) -> bool {
    if comment.author_id != viewer {
        return false;
    }
    match comment.created_at.checked_add_signed(window) {
        Some(deadline) => now < deadline,
        None => true, // deadline is past the end of representable time
    }
}
