use crate::api::{Error, Store, Time, UserId, VoteOutcome, VoteTarget};

/// Records votes through a `Store`, retrying writes that lost a race
#[derive(Clone, Copy, Debug)]
pub struct VoteLedger {
    max_attempts: u32,
}

impl VoteLedger {
    pub fn new(max_attempts: u32) -> VoteLedger {
        VoteLedger {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Sets the vote of `voter` on `target` to `up`, replacing any previous
    /// vote of theirs. Voting twice the same way leaves the score untouched.
    ///
    /// `Error::Conflict` is retried until `max_attempts` writes have been
    /// tried, any other error is returned immediately.
    pub async fn upsert<S: Store + ?Sized>(
        &self,
        store: &mut S,
        target: VoteTarget,
        voter: UserId,
        up: bool,
        at: Time,
    ) -> Result<VoteOutcome, Error> {
        let mut attempt = 1;
        loop {
            match store.upsert_vote(target, voter, up, at).await {
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    tracing::debug!(?target, voter = ?voter.0, attempt, "vote write conflicted, retrying");
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(?target, voter = ?voter.0, attempt, "vote write kept conflicting, giving up");
                    return Err(err);
                }
                res => return res,
            }
        }
    }
}
