use anyhow::Context;
use futures::FutureExt;
use std::io::Write;

use super::registry::HandlerFuture;
use super::{Command, State};

/// `login <username>`: point the current user at an existing user.
pub(super) fn login<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    async move {
        let name = cmd.expect_one_arg("<username>")?;

        let user = state
            .db
            .get_user(name)
            .await
            .with_context(|| format!("couldn't log in as {}", name))?;

        state
            .config
            .set_user(&user.name)
            .context("couldn't set current user")?;
        tracing::info!(user = %user.name, "Logged in");

        writeln!(state.out, "The user has been set to: {}", user.name)?;
        Ok(())
    }
    .boxed()
}

/// `register <name>`: create a user and log in as them.
pub(super) fn register<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    async move {
        let name = cmd.expect_one_arg("<name>")?;

        let user = state
            .db
            .create_user(name)
            .await
            .context("couldn't create user")?;

        state
            .config
            .set_user(&user.name)
            .context("couldn't set current user")?;
        tracing::info!(user = %user.name, id = user.id, "Registered user");

        writeln!(state.out, "The user has been successfully registered:")?;
        writeln!(state.out, "* ID:      {}", user.id)?;
        writeln!(state.out, "* Name:    {}", user.name)?;
        Ok(())
    }
    .boxed()
}

/// `reset`: delete every user, and with them every feed, follow and post.
pub(super) fn reset<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    async move {
        cmd.expect_no_args()?;

        let removed = state.db.reset().await.context("couldn't delete users")?;
        tracing::info!(users = removed, "Database reset");

        writeln!(state.out, "Database reset successfully!")?;
        Ok(())
    }
    .boxed()
}

/// `users`: list every user, marking the current one.
pub(super) fn list_users<'a>(state: &'a mut State, cmd: &'a Command) -> HandlerFuture<'a> {
    async move {
        cmd.expect_no_args()?;

        let users = state
            .db
            .get_users()
            .await
            .context("couldn't retrieve users")?;

        let current = state.config.current_user_name.as_deref();
        for user in users {
            if Some(user.name.as_str()) == current {
                writeln!(state.out, "* {} (current)", user.name)?;
            } else {
                writeln!(state.out, "* {}", user.name)?;
            }
        }
        Ok(())
    }
    .boxed()
}
