use std::cmp::Reverse;

use crate::{Item, Time};

const MILLIS_PER_HOUR: f64 = 3_600_000.;

/// Anything that can be placed on a recency-decayed listing
pub trait Rankable {
    fn score(&self) -> i64;
    fn created_at(&self) -> Time;
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RankParams {
    /// Exponent of the age decay, higher falls off faster
    pub gravity: f64,

    /// Hours added to the age, so that brand new items do not divide by ~0
    pub timebase_hours: f64,
}

impl Default for RankParams {
    fn default() -> RankParams {
        RankParams {
            gravity: 1.8,
            timebase_hours: 2.,
        }
    }
}

/// `(score - 1) / (timebase + age_hours) ^ gravity`
///
/// The `- 1` discounts the author's own implicit vote. Scores below 1 give a
/// negative rank. This only scores, callers that sort on it must bring their
/// own tiebreak.
pub fn rank<R: Rankable + ?Sized>(item: &R, params: &RankParams, at: Time) -> f64 {
    // items dated after `at` are ranked as if brand new
    let age_ms = at
        .signed_duration_since(item.created_at())
        .num_milliseconds()
        .max(0);
    let age_hours = age_ms as f64 / MILLIS_PER_HOUR;
    (item.score() - 1) as f64 / (params.timebase_hours + age_hours).powf(params.gravity)
}

/// How a listing of items is ordered
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Order {
    /// Most recently created first
    Newest,

    /// Highest rank first, as computed at `at`
    Ranked { params: RankParams, at: Time },
}

impl Default for Order {
    fn default() -> Order {
        Order::Newest
    }
}

impl Order {
    /// Sorts `items` in this order, breaking ties by id
    pub fn sort(&self, items: &mut [Item]) {
        match self {
            Order::Newest => items.sort_unstable_by_key(|i| (Reverse(i.created_at), i.id)),
            Order::Ranked { params, at } => items.sort_unstable_by(|a, b| {
                rank(b, params, *at)
                    .total_cmp(&rank(a, params, *at))
                    .then(a.id.cmp(&b.id))
            }),
        }
    }
}
