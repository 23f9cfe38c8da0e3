use chrono::{DateTime, Utc};
use url::Url;

use crate::app::{AppContext, GatorError, Result};
use crate::config::parse_duration;
use crate::domain::{Feed, FeedFollow, PostWithFeed, User};
use crate::poller::PollLoop;
use crate::store::Store;

pub fn register(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = User::new(name.to_string());
    ctx.store.add_user(&user)?;
    ctx.config.set_user(name)?;

    println!("User {} was created", name);
    Ok(())
}

pub fn login(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx
        .store
        .get_user_by_name(name)?
        .ok_or_else(|| GatorError::UserNotFound(name.to_string()))?;
    ctx.config.set_user(&user.name)?;

    println!("Username has been set to {}", user.name);
    Ok(())
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let users = ctx.store.get_all_users()?;
    let current = ctx.config.current_user.as_deref();

    for user in users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }

    Ok(())
}

pub fn add_feed(ctx: &AppContext, name: &str, url: &str) -> Result<Feed> {
    let url = Url::parse(url)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatorError::Other(format!(
            "Unsupported URL scheme: {}",
            url.scheme()
        )));
    }

    let user = ctx.current_user()?;
    let mut feed = Feed::new(name.to_string(), url.to_string(), user.id);
    feed.id = ctx.store.add_feed(&feed)?;
    println!("Added feed: {} ({})", feed.name, feed.url);

    let followed = ctx.store.follow_feed(user.id, feed.id)?;
    print_follow(&followed);

    Ok(feed)
}

pub fn follow(ctx: &AppContext, url: &str) -> Result<FeedFollow> {
    let user = ctx.current_user()?;
    let feed = feed_by_url(ctx, url)?;

    let followed = ctx.store.follow_feed(user.id, feed.id).map_err(|e| match e {
        GatorError::AlreadyFollowing(_) => GatorError::AlreadyFollowing(feed.url.clone()),
        e => e,
    })?;
    print_follow(&followed);

    Ok(followed)
}

pub fn unfollow(ctx: &AppContext, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    let feed = feed_by_url(ctx, url)?;

    ctx.store.unfollow_feed(user.id, feed.id).map_err(|e| match e {
        GatorError::NotFollowing(_) => GatorError::NotFollowing(feed.url.clone()),
        e => e,
    })?;

    println!("Unfollowed {}", feed.display_title());
    Ok(())
}

pub fn following(ctx: &AppContext) -> Result<()> {
    let user = ctx.current_user()?;
    let follows = ctx.store.get_follows_for_user(user.id)?;

    println!("User {} is following the current feeds:", user.name);
    for follow in follows {
        println!("* {}", follow.feed_name);
    }

    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let owner = ctx
            .store
            .get_user(feed.user_id)?
            .map(|u| u.name)
            .unwrap_or_else(|| "?".to_string());

        println!("* {}\n  {}", feed.display_title(), feed.url);
        println!("  owner: {}", owner);
        println!("  last fetched: {}", format_timestamp(feed.last_fetched_at));
    }

    Ok(())
}

pub fn browse(ctx: &AppContext, limit: usize) -> Result<()> {
    let user = ctx.current_user()?;
    let posts = ctx.store.get_posts_for_user(user.id, limit)?;

    println!("Found {} posts for user {}:", posts.len(), user.name);
    for PostWithFeed { post, feed_name } in posts {
        let date = post
            .published_at
            .map(|d| d.format("%a %b %e").to_string())
            .unwrap_or_else(|| "undated".to_string());

        println!("{} from {}", date, feed_name);
        println!("--- {} ---", post.display_title());
        if let Some(description) = post.description.as_deref() {
            println!("    {}", description);
        }
        println!("Link: {}", post.url);
        println!("=====================================");
    }

    Ok(())
}

/// Poll feeds until SIGINT/SIGTERM, then finish the current cycle and exit.
pub async fn aggregate(ctx: &AppContext, time_between_reqs: &str) -> Result<()> {
    let every = parse_duration(time_between_reqs)?;

    let poller = PollLoop::new(ctx.store.clone(), ctx.fetcher.clone(), every);
    let handle = poller.spawn();

    wait_for_shutdown_signal().await?;
    tracing::info!("Shutdown requested, waiting for the current cycle");
    handle.shutdown().await
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    ctx.store.reset()?;
    println!("Reset database successfully");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Look a feed up by URL, spelled the way `add_feed` stored it.
fn feed_by_url(ctx: &AppContext, url: &str) -> Result<Feed> {
    let url = Url::parse(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string());

    ctx.store
        .get_feed_by_url(&url)?
        .ok_or(GatorError::FeedNotFound(url))
}

fn print_follow(follow: &FeedFollow) {
    println!("Feed followed successfully!");
    println!("Feed: {}\nUser: {}", follow.feed_name, follow.user_name);
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}
