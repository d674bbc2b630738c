use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use threadline_api::{
    Clock, CommentId, Dump, EngineConfig, FixedClock, ItemId, NewComment, NewItem, Order,
    SystemClock, Time, User, UserId, Uuid, Viewer, VoteTarget,
};
use threadline_engine::{EditOutcome, Engine};
use threadline_mock_store::MemStore;

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON dump holding the whole site, created if missing
    #[structopt(short, long, parse(from_os_str))]
    dump: PathBuf,

    /// Name of the user to act as
    #[structopt(long = "as")]
    user: Option<String>,

    /// Pretend it is this RFC 3339 instant instead of now
    #[structopt(long, parse(try_from_str = parse_time))]
    now: Option<Time>,

    /// JSON engine configuration; `THREADLINE_*` variables override it
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create a user
    CreateUser {
        /// Username
        name: String,
    },

    /// List one page of stories
    FrontPage {
        /// Page index, starting at 0
        #[structopt(short, long, default_value = "0")]
        page: i64,

        /// Order by rank instead of by submission time
        #[structopt(long)]
        ranked: bool,
    },

    /// Show a story and its comment threads
    Discussion { item: String },

    /// Submit a story
    Submit {
        title: String,

        #[structopt(long)]
        url: Option<String>,

        #[structopt(long)]
        body: Option<String>,
    },

    /// Comment on a story, or reply to a comment with `--parent`
    Comment {
        item: String,

        body: String,

        #[structopt(long)]
        parent: Option<String>,
    },

    /// Replace the body of one of your comments
    EditComment { comment: String, body: String },

    /// Vote on a story
    VoteItem {
        item: String,

        /// Vote down instead of up
        #[structopt(long)]
        down: bool,
    },

    /// Vote on a comment
    VoteComment {
        comment: String,

        /// Vote down instead of up
        #[structopt(long)]
        down: bool,
    },
}

fn parse_time(s: &str) -> anyhow::Result<Time> {
    let t = chrono::DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("parsing {s:?} as an RFC 3339 timestamp"))?;
    Ok(t.with_timezone(&chrono::Utc))
}

fn parse_uuid(what: &str, s: &str) -> anyhow::Result<Uuid> {
    Uuid::try_parse(s).with_context(|| format!("parsing {s:?} as {what} id"))
}

fn load_dump(path: &Path) -> anyhow::Result<Dump> {
    if !path.exists() {
        tracing::info!(?path, "dump file does not exist yet, starting empty");
        return Ok(Dump::default());
    }
    let data = std::fs::read(path).with_context(|| format!("reading dump file {:?}", path))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing dump file {:?}", path))
}

fn save_dump(path: &Path, dump: &Dump) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(dump).context("serializing dump")?;
    std::fs::write(path, data).with_context(|| format!("writing dump file {:?}", path))
}

fn viewer(dump: &Dump, name: Option<&str>) -> anyhow::Result<Option<Viewer>> {
    name.map(|name| {
        dump.user_named(name)
            .cloned()
            .map(Viewer::from)
            .with_context(|| format!("no user named {name:?}"))
    })
    .transpose()
}

fn require(viewer: Option<Viewer>) -> anyhow::Result<Viewer> {
    viewer.context("this command needs an acting user, pass --as")
}

fn to_json<T: serde::Serialize>(v: &T) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(v).context("serializing output")
}

/// Runs one command against the dump, saving it back if the command wrote
/// anything, and returns what to print
async fn run(opt: Opt) -> anyhow::Result<serde_json::Value> {
    let config = match &opt.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    }
    .with_env()
    .context("applying environment overrides to the configuration")?;
    let clock: Arc<dyn Clock> = match opt.now {
        Some(now) => Arc::new(FixedClock::new(now)),
        None => Arc::new(SystemClock),
    };

    let dump = load_dump(&opt.dump)?;
    let viewer = viewer(&dump, opt.user.as_deref())?;
    let store = MemStore::from_dump(dump).context("loading dump into the store")?;
    let mut engine = Engine::new(store.clone(), clock, config);

    let (output, wrote) = match opt.cmd {
        Command::CreateUser { name } => {
            if store.dump().await.user_named(&name).is_some() {
                anyhow::bail!("user {name:?} already exists");
            }
            let user = User {
                id: UserId(Uuid::new_v4()),
                name,
            };
            store.add_user(user.clone()).await;
            (to_json(&user)?, true)
        }
        Command::FrontPage { page, ranked } => {
            let order = match ranked {
                true => engine.ranked(),
                false => Order::Newest,
            };
            let page = engine.front_page(viewer.as_ref(), order, page).await?;
            (to_json(&page)?, false)
        }
        Command::Discussion { item } => {
            let item = ItemId(parse_uuid("item", &item)?);
            let discussion = engine.discussion(item, viewer.as_ref()).await?;
            (to_json(&discussion)?, false)
        }
        Command::Submit { title, url, body } => {
            let item = engine
                .submit_story(&require(viewer)?, NewItem { title, url, body })
                .await?;
            (to_json(&item)?, true)
        }
        Command::Comment { item, body, parent } => {
            let new = NewComment {
                item_id: ItemId(parse_uuid("item", &item)?),
                parent_id: match parent {
                    Some(p) => Some(CommentId(parse_uuid("comment", &p)?)),
                    None => None,
                },
                body,
            };
            let comment = engine.submit_comment(&require(viewer)?, new).await?;
            (to_json(&comment)?, true)
        }
        Command::EditComment { comment, body } => {
            let comment = CommentId(parse_uuid("comment", &comment)?);
            let outcome = engine
                .edit_comment(&require(viewer)?, comment, body)
                .await?;
            let edited = matches!(outcome, EditOutcome::Edited(_));
            (to_json(&outcome)?, edited)
        }
        Command::VoteItem { item, down } => {
            let target = VoteTarget::Item(ItemId(parse_uuid("item", &item)?));
            let outcome = engine.vote(&require(viewer)?, target, !down).await?;
            (to_json(&outcome)?, true)
        }
        Command::VoteComment { comment, down } => {
            let target = VoteTarget::Comment(CommentId(parse_uuid("comment", &comment)?));
            let outcome = engine.vote(&require(viewer)?, target, !down).await?;
            (to_json(&outcome)?, true)
        }
    };

    if wrote {
        save_dump(&opt.dump, &store.dump().await)?;
    }
    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let output = run(opt).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("formatting output")?
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use structopt::StructOpt;

    async fn ctl(dump: &Path, args: &[&str]) -> anyhow::Result<serde_json::Value> {
        let opt = Opt::from_iter_safe(
            ["threadline-ctl", "--dump"]
                .into_iter()
                .chain(dump.to_str())
                .chain(["--now", "2023-06-01T12:00:00Z"])
                .chain(args.iter().copied()),
        )?;
        run(opt).await
    }

    fn id_of(v: &serde_json::Value) -> String {
        v["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn story_comment_and_vote_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("site.json");

        ctl(&dump, &["create-user", "alice"]).await.unwrap();
        ctl(&dump, &["create-user", "bob"]).await.unwrap();
        assert!(ctl(&dump, &["create-user", "bob"]).await.is_err());

        let story = ctl(&dump, &["--as", "alice", "submit", "Hello", "--url", "https://example.org"])
            .await
            .unwrap();
        let item = id_of(&story);
        let top = ctl(&dump, &["--as", "bob", "comment", &item, "first!"])
            .await
            .unwrap();
        let reply = ctl(
            &dump,
            &["--as", "alice", "comment", &item, "welcome", "--parent", &id_of(&top)],
        )
        .await
        .unwrap();

        let vote = ctl(&dump, &["--as", "bob", "vote-item", &item]).await.unwrap();
        assert_eq!(vote["score"], 2);
        let vote = ctl(&dump, &["--as", "bob", "vote-item", &item, "--down"])
            .await
            .unwrap();
        assert_eq!(vote["score"], 0);

        let page = ctl(&dump, &["front-page"]).await.unwrap();
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert_eq!(page["items"][0]["position"], 1);
        assert_eq!(page["items"][0]["item"]["comment_count"], 2);

        let disc = ctl(&dump, &["--as", "alice", "discussion", &item])
            .await
            .unwrap();
        assert_eq!(disc["voted_up"], true);
        assert_eq!(disc["comments"][0]["comment"]["id"], top["id"]);
        assert_eq!(disc["comments"][0]["editable"], false);
        assert_eq!(disc["comments"][0]["children"][0]["comment"]["id"], reply["id"]);
        assert_eq!(disc["comments"][0]["children"][0]["editable"], true);
    }

    #[tokio::test]
    async fn edits_respect_author_and_window() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("site.json");
        ctl(&dump, &["create-user", "alice"]).await.unwrap();
        ctl(&dump, &["create-user", "bob"]).await.unwrap();
        let item = id_of(&ctl(&dump, &["--as", "alice", "submit", "Story"]).await.unwrap());
        let comment = id_of(
            &ctl(&dump, &["--as", "alice", "comment", &item, "typo"])
                .await
                .unwrap(),
        );

        // a denied edit leaves the file alone, down to its formatting
        let compact = serde_json::to_vec(&load_dump(&dump).unwrap()).unwrap();
        std::fs::write(&dump, &compact).unwrap();
        let denied = ctl(&dump, &["--as", "bob", "edit-comment", &comment, "vandalized"])
            .await
            .unwrap();
        assert_eq!(denied["Denied"]["body"], "typo");
        assert_eq!(std::fs::read(&dump).unwrap(), compact);
        let edited = ctl(&dump, &["--as", "alice", "edit-comment", &comment, "fixed"])
            .await
            .unwrap();
        assert_eq!(edited["Edited"]["body"], "fixed");

        let disc = ctl(&dump, &["discussion", &item]).await.unwrap();
        assert_eq!(disc["comments"][0]["comment"]["body"], "fixed");
    }

    #[tokio::test]
    async fn bad_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("site.json");
        ctl(&dump, &["create-user", "alice"]).await.unwrap();

        assert!(ctl(&dump, &["submit", "No author"]).await.is_err());
        assert!(ctl(&dump, &["--as", "mallory", "submit", "Who"]).await.is_err());
        assert!(ctl(&dump, &["--as", "alice", "submit", "   "]).await.is_err());
        assert!(ctl(&dump, &["discussion", "not-a-uuid"]).await.is_err());
        let missing = Uuid::new_v4().to_string();
        let err = ctl(&dump, &["discussion", &missing]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<threadline_api::Error>(),
            Some(threadline_api::Error::NotFound { .. })
        ));
        assert!(!dump.exists() || load_dump(&dump).unwrap().items.is_empty());
    }
}
