use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use rand::{seq::SliceRandom, Rng};
use threadline_api::{
    Comment, EngineConfig, FixedClock, Item, NewComment, NewItem, User, UserId, Uuid, Viewer,
    VoteTarget,
};
use threadline_engine::Engine;
use threadline_mock_store::MemStore;

const NUM_USERS: usize = 12;

const NUM_STORIES: usize = 60;
const STORY_BODY_WORDS: usize = 40;

const NUM_COMMENTS: usize = 400;
const COMMENT_WORDS: usize = 25;

const NUM_VOTES: usize = 1500;

/// Odds that a story links somewhere instead of having only a body
const LINK_RATIO: f64 = 0.7;

/// Odds that a comment replies to another comment rather than to the story
const REPLY_RATIO: f64 = 0.6;

fn gen_body(rng: &mut impl Rng, max_words: usize) -> String {
    lipsum::lipsum_words(rng.gen_range(3..=max_words))
}

fn gen_story(rng: &mut impl Rng) -> NewItem {
    let title = lipsum::lipsum_title();
    match rng.gen_bool(LINK_RATIO) {
        true => NewItem {
            url: Some(format!(
                "https://example.org/{}",
                title.to_lowercase().replace(' ', "-")
            )),
            title,
            body: None,
        },
        false => NewItem {
            title,
            url: None,
            body: Some(gen_body(rng, STORY_BODY_WORDS)),
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    let store = MemStore::new();
    let mut engine = Engine::new(store.clone(), Arc::new(clock.clone()), EngineConfig::default());

    // Generate users
    let mut users = Vec::new();
    for i in 0..NUM_USERS {
        let user = User {
            id: UserId(Uuid::new_v4()),
            name: format!("{}{}", lipsum::lipsum_words(1).to_lowercase(), i),
        };
        store.add_user(user.clone()).await;
        users.push(Viewer::from(user));
    }

    // Stories and comments interleave, so that threads spread over time
    let mut stories: Vec<Item> = Vec::new();
    let mut comments: Vec<Comment> = Vec::new();
    let mut remaining_stories = NUM_STORIES;
    let mut remaining_comments = NUM_COMMENTS;
    while remaining_stories + remaining_comments > 0 {
        clock.advance(Duration::minutes(rng.gen_range(1..90)));
        let author = users.choose(&mut rng).context("no users")?;
        let new_story = stories.is_empty()
            || remaining_comments == 0
            || (remaining_stories > 0
                && rng.gen_range(0..remaining_stories + remaining_comments) < remaining_stories);
        if new_story {
            let story = engine
                .submit_story(author, gen_story(&mut rng))
                .await
                .context("submitting story")?;
            stories.push(story);
            remaining_stories -= 1;
            continue;
        }

        // Recent stories get most of the discussion
        let recent = &stories[stories.len().saturating_sub(10)..];
        let story = recent.choose(&mut rng).context("no stories")?;
        let siblings = comments
            .iter()
            .filter(|c| c.item_id == story.id)
            .collect::<Vec<_>>();
        let parent_id = match rng.gen_bool(REPLY_RATIO) {
            true => siblings.choose(&mut rng).map(|c| c.id),
            false => None,
        };
        let new = NewComment {
            item_id: story.id,
            parent_id,
            body: gen_body(&mut rng, COMMENT_WORDS),
        };
        let comment = engine
            .submit_comment(author, new)
            .await
            .context("submitting comment")?;
        comments.push(comment);
        remaining_comments -= 1;
    }

    // Generate votes, with a bias towards up votes
    for _ in 0..NUM_VOTES {
        clock.advance(Duration::seconds(rng.gen_range(1..600)));
        let voter = users.choose(&mut rng).context("no users")?;
        let target = match rng.gen_bool(0.5) {
            true => VoteTarget::Item(stories.choose(&mut rng).context("no stories")?.id),
            false => VoteTarget::Comment(comments.choose(&mut rng).context("no comments")?.id),
        };
        engine
            .vote(voter, target, rng.gen_bool(0.8))
            .await
            .context("voting")?;
    }

    let dump = store.dump().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&dump).context("serializing dump")?
    );

    Ok(())
}
