use std::{
    collections::{HashMap, HashSet},
    panic::AssertUnwindSafe,
};

use chrono::{Duration, TimeZone, Utc};
use threadline_mock_store::MemStore;

use crate::{
    api::{Comment, CommentId, Item, ItemId, Store, Time, UserId, Uuid, VoteTarget},
    Forest, NodeRef, VoteLedger,
};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn t0() -> Time {
    Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap()
}

fn cid(n: u8) -> CommentId {
    CommentId(Uuid::from_u128(u128::from(n)))
}

/// Row `i` of the result is comment `rows[i].0`, replying to `rows[i].1`
fn comments_from(rows: &[(u8, Option<u8>)]) -> Vec<Comment> {
    rows.iter()
        .enumerate()
        .map(|(i, &(id, parent))| Comment {
            id: cid(id),
            parent_id: parent.map(cid),
            item_id: ItemId::stub(),
            body: format!("row {i}"),
            upvotes: 0,
            downvotes: 0,
            author_id: UserId::stub(),
            author_name: String::from("fuzz"),
            created_at: t0() + Duration::seconds(i as i64),
        })
        .collect()
}

fn check_links(node: NodeRef<'_>) {
    for child in node.children() {
        assert_eq!(
            child.comment().and_then(|c| c.parent_id),
            node.id(),
            "child {:?} is not attached to its parent",
            child.id()
        );
        check_links(child);
    }
}

#[test]
fn fuzz_forest_keeps_every_comment_once() {
    bolero::check!()
        .with_type::<Vec<(u8, Option<u8>)>>()
        .cloned()
        .for_each(|rows| {
            let comments = comments_from(&rows);
            let forest = Forest::build(comments.clone());

            let mut first_rows = HashMap::new();
            for c in &comments {
                first_rows.entry(c.id).or_insert_with(|| c.body.clone());
            }

            let flat = forest.flatten();
            let flat_ids = flat.iter().map(|c| c.id).collect::<HashSet<_>>();
            assert_eq!(flat.len(), flat_ids.len(), "a comment came out twice");
            assert_eq!(flat_ids, first_rows.keys().copied().collect::<HashSet<_>>());
            assert_eq!(forest.len(), first_rows.len());
            for c in flat {
                assert_eq!(c.body, first_rows[&c.id], "duplicate row replaced the first one");
            }

            for root in forest.roots() {
                assert!(root.comment().map_or(false, |c| c.parent_id.is_none()));
                check_links(root);
            }
            for head in forest.detached() {
                check_links(head);
            }
        })
}

fn item(id: ItemId, author: UserId) -> Item {
    Item {
        id,
        title: String::from("fuzzed story"),
        url: None,
        body: None,
        score: 1,
        author_id: author,
        author_name: String::from("fuzz"),
        created_at: t0(),
        comment_count: 0,
    }
}

do_tokio_test!(
    fuzz_ledger_matches_model,
    Vec<(u8, u8, bool)>,
    |ops: Vec<(u8, u8, bool)>| async move {
        let mut store = MemStore::new();
        let author = UserId(Uuid::from_u128(0));
        let item_id = ItemId(Uuid::from_u128(1));
        store.insert_item(item(item_id, author)).await.unwrap();
        let mut targets = vec![VoteTarget::Item(item_id)];
        for (n, parent) in [(2, None), (3, Some(2))] {
            let c = Comment {
                id: cid(n),
                parent_id: parent.map(cid),
                item_id,
                body: String::from("fuzzed comment"),
                upvotes: 0,
                downvotes: 0,
                author_id: author,
                author_name: String::from("fuzz"),
                created_at: t0(),
            };
            targets.push(VoteTarget::Comment(c.id));
            store.insert_comment(c).await.unwrap();
        }

        let mut model = HashMap::from([((VoteTarget::Item(item_id), author), true)]);
        let score_in_model = |model: &HashMap<(VoteTarget, UserId), bool>, target| {
            model
                .iter()
                .filter(|((t, _), _)| *t == target)
                .map(|(_, &up)| if up { 1 } else { -1 })
                .sum::<i64>()
        };

        let ledger = VoteLedger::new(1);
        for (voter, target, up) in ops {
            let voter = UserId(Uuid::from_u128(u128::from(voter % 5)));
            let target = targets[usize::from(target) % targets.len()];
            let before = score_in_model(&model, target);
            let previous = model.insert((target, voter), up);

            let out = ledger
                .upsert(&mut store, target, voter, up, t0())
                .await
                .unwrap();
            let expected = score_in_model(&model, target);
            assert_eq!(out.score, expected);
            let delta = match (previous, up) {
                (Some(p), up) if p == up => 0,
                (Some(_), true) => 2,
                (Some(_), false) => -2,
                (None, true) => 1,
                (None, false) => -1,
            };
            assert_eq!(out.score - before, delta);

            let stored = match target {
                VoteTarget::Item(i) => store.find_item(i).await.unwrap().score,
                VoteTarget::Comment(c) => store.find_comment(c).await.unwrap().score(),
            };
            assert_eq!(stored, expected);
        }
        for target in targets {
            assert_eq!(
                store.test_num_votes(target).await,
                model.keys().filter(|(t, _)| *t == target).count()
            );
        }
    }
);
