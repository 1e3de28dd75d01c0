use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::io::Write;

use super::auth::AuthenticatedContext;
use super::registry::HandlerFuture;
use super::{Command, CommandError, State, DIVIDER};
use crate::storage::Feed;
use crate::util::{to_display_line, validate_feed_url};

/// `addfeed <name> <url>`: create a feed owned by the current user and
/// follow it.
pub(super) fn add_feed<'a>(
    state: &'a mut State,
    cmd: &'a Command,
    ctx: AuthenticatedContext,
) -> HandlerFuture<'a> {
    async move {
        let [name, url] = cmd.args.as_slice() else {
            return Err(cmd.usage("<name> <url>").into());
        };
        // The stored URL is the feed's identity
        let url = url.trim();
        validate_feed_url(url).map_err(CommandError::InvalidUrl)?;

        let feed = state
            .db
            .create_feed(name, url, ctx.user.id)
            .await
            .context("couldn't create feed")?;
        let follow = state
            .db
            .create_feed_follow(ctx.user.id, feed.id)
            .await
            .context("couldn't create feed follow")?;
        tracing::info!(feed = %feed.name, url = %feed.url, user = %ctx.user.name, "Added feed");

        writeln!(state.out, "Feed created successfully!")?;
        print_feed(&mut state.out, &feed, &ctx.user.name)?;
        print_follow(&mut state.out, &follow.user_name, &follow.feed_name)?;
        writeln!(state.out)?;
        writeln!(state.out, "{}", DIVIDER)?;
        Ok(())
    }
    .boxed()
}

/// `feeds`: every feed with the name of the user who added it.
pub(super) fn list_feeds<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    async move {
        cmd.expect_no_args()?;

        let feeds = state.db.get_feeds().await.context("couldn't fetch feeds")?;
        if feeds.is_empty() {
            writeln!(state.out, "No feeds found.")?;
            return Ok(());
        }

        writeln!(state.out, "Found {} feeds:", feeds.len())?;
        for entry in &feeds {
            print_feed(&mut state.out, &entry.feed, &entry.user_name)?;
            writeln!(state.out, "{}", DIVIDER)?;
        }
        Ok(())
    }
    .boxed()
}

/// `follow <url>`: follow a feed someone already added.
pub(super) fn follow<'a>(
    state: &'a mut State,
    cmd: &'a Command,
    ctx: AuthenticatedContext,
) -> HandlerFuture<'a> {
    async move {
        let url = cmd.expect_one_arg("<url>")?;

        let feed = state
            .db
            .get_feed_by_url(url)
            .await
            .context("couldn't fetch feed")?;
        let follow = state
            .db
            .create_feed_follow(ctx.user.id, feed.id)
            .await
            .context("couldn't create feed follow")?;
        tracing::info!(feed = %feed.name, user = %ctx.user.name, "Followed feed");

        writeln!(state.out, "Feed Follow created successfully!")?;
        print_follow(&mut state.out, &follow.user_name, &follow.feed_name)?;
        writeln!(state.out)?;
        writeln!(state.out, "{}", DIVIDER)?;
        Ok(())
    }
    .boxed()
}

/// `following`: feeds the current user follows.
pub(super) fn following<'a>(
    state: &'a mut State,
    cmd: &'a Command,
    ctx: AuthenticatedContext,
) -> HandlerFuture<'a> {
    async move {
        cmd.expect_no_args()?;

        let follows = state
            .db
            .get_feed_follows_for_user(ctx.user.id)
            .await
            .context("error getting feed follows for user")?;
        if follows.is_empty() {
            writeln!(state.out, "No feed follows found for this user.")?;
            return Ok(());
        }

        writeln!(
            state.out,
            "Found {} feed follows for user {}:",
            follows.len(),
            ctx.user.name
        )?;
        for follow in &follows {
            writeln!(state.out, "* {}", to_display_line(&follow.feed_name))?;
            writeln!(state.out, "{}", DIVIDER)?;
        }
        Ok(())
    }
    .boxed()
}

/// `unfollow <url>`: stop following a feed.
pub(super) fn unfollow<'a>(
    state: &'a mut State,
    cmd: &'a Command,
    ctx: AuthenticatedContext,
) -> HandlerFuture<'a> {
    async move {
        let url = cmd.expect_one_arg("<feed_url>")?;

        let feed = state
            .db
            .get_feed_by_url(url)
            .await
            .context("couldn't fetch feed")?;
        state
            .db
            .delete_feed_follow(ctx.user.id, feed.id)
            .await
            .context("couldn't delete feed follow")?;
        tracing::info!(feed = %feed.name, user = %ctx.user.name, "Unfollowed feed");

        writeln!(state.out, "{} unfollowed successfully!", feed.name)?;
        Ok(())
    }
    .boxed()
}

fn print_feed(out: &mut impl Write, feed: &Feed, owner: &str) -> std::io::Result<()> {
    writeln!(out, "* ID:            {}", feed.id)?;
    writeln!(out, "* Name:          {}", to_display_line(&feed.name))?;
    writeln!(out, "* URL:           {}", feed.url)?;
    writeln!(out, "* User:          {}", owner)?;
    writeln!(out, "* Created:       {}", format_time(&feed.created_at))?;
    writeln!(out, "* Updated:       {}", format_time(&feed.updated_at))?;
    match &feed.last_fetched_at {
        Some(at) => writeln!(out, "* LastFetchedAt: {}", format_time(at)),
        None => writeln!(out, "* LastFetchedAt: never"),
    }
}

fn print_follow(out: &mut impl Write, user_name: &str, feed_name: &str) -> std::io::Result<()> {
    writeln!(out, "* User:          {}", user_name)?;
    writeln!(out, "* Feed:          {}", to_display_line(feed_name))
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
