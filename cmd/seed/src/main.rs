//! Fills the configured Postgres database with a small demo forum.
//!
//! Usage: `seed [replies-per-root]` (default 5). Existing rows are kept;
//! anything that already exists is reused.

use std::sync::Arc;

use anyhow::{bail, Context};
use configs::Settings;
use domains::{Creation, NewForum, NewPost, NewThread, Post, Thread, UserProfile, Vote};
use secrecy::ExposeSecret;
use services::Services;
use storage_adapters::PgStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USERS: [(&str, &str); 3] = [
    ("alice", "Alice Liddell"),
    ("bob", "Bob Builder"),
    ("carol", "Carol Danvers"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let replies: usize = match std::env::args().nth(1) {
        Some(raw) => raw.parse().with_context(|| format!("invalid reply count `{raw}`"))?,
        None => 5,
    };

    let settings = Settings::load().context("failed to load settings")?;
    let Some(url) = settings.database.url.as_ref() else {
        bail!("seeding needs database.url or DATABASE_URL");
    };
    let store = PgStore::connect(
        url.expose_secret(),
        settings.database.max_connections,
        settings.database.acquire_timeout(),
    )
    .await
    .context("failed to connect to Postgres")?;
    store.migrate().await.context("failed to run migrations")?;
    let services = Services::from_store(Arc::new(store));

    for (nickname, fullname) in USERS {
        let profile = UserProfile {
            fullname: fullname.into(),
            about: format!("Demo account of {fullname}"),
            email: format!("{nickname}@example.org"),
        };
        match services.users.create(nickname, profile).await? {
            Creation::Created(_) => info!(nickname, "user created"),
            Creation::AlreadyExists(_) => info!(nickname, "user already present"),
        }
    }

    let forum = NewForum {
        slug: "rust-lang".into(),
        title: "The Rust Programming Language".into(),
        user: "alice".into(),
    };
    services.forums.create(forum).await?;

    let thread = match services
        .threads
        .create(
            "rust-lang",
            NewThread {
                title: "Show us your projects".into(),
                author: "bob".into(),
                message: "What are you building this week?".into(),
                slug: Some("show-us-your-projects".into()),
                created: None,
            },
        )
        .await?
    {
        Creation::Created(thread) | Creation::AlreadyExists(thread) => thread,
    };

    let roots = seed_batch(&services, &thread, 0, USERS.len()).await?;
    for root in &roots {
        seed_batch(&services, &thread, root.id, replies).await?;
    }

    for (nickname, _) in USERS {
        services
            .threads
            .vote(
                &thread.id.to_string(),
                Vote {
                    nickname: nickname.into(),
                    voice: 1,
                },
            )
            .await?;
    }

    let status = services.status.status().await?;
    info!(
        users = status.users,
        forums = status.forums,
        threads = status.threads,
        posts = status.posts,
        "seeding finished"
    );
    Ok(())
}

async fn seed_batch(
    services: &Services,
    thread: &Thread,
    parent: i64,
    count: usize,
) -> anyhow::Result<Vec<Post>> {
    let drafts = (0..count)
        .map(|i| NewPost {
            author: USERS[i % USERS.len()].0.into(),
            message: if parent == 0 {
                format!("Top-level post #{i}")
            } else {
                format!("Reply #{i} to post {parent}")
            },
            parent,
        })
        .collect();
    let created = services.posts.create_posts(thread, drafts).await?;
    info!(parent, count = created.len(), "posts created");
    Ok(created)
}
