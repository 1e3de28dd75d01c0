use anyhow::Context;
use futures::FutureExt;
use std::io::Write;

use super::auth::AuthenticatedContext;
use super::registry::HandlerFuture;
use super::{Command, CommandError, State, DIVIDER};
use crate::util::{to_display_line, truncate_to_width};

const DEFAULT_LIMIT: i64 = 2;
/// Description column budget per post
const DESCRIPTION_WIDTH: usize = 280;

/// `browse [limit]`: newest posts across the feeds the user follows.
pub(super) fn browse<'a>(
    state: &'a mut State,
    cmd: &'a Command,
    ctx: AuthenticatedContext,
) -> HandlerFuture<'a> {
    async move {
        let limit = parse_limit(cmd)?;

        let posts = state
            .db
            .get_posts_for_user(ctx.user.id, limit)
            .await
            .context("couldn't get posts for user")?;

        writeln!(
            state.out,
            "Found {} posts for user {}:",
            posts.len(),
            ctx.user.name
        )?;
        for entry in &posts {
            let post = &entry.post;
            let date = post
                .published_at
                .map(|at| at.format("%a %b %-d").to_string())
                .unwrap_or_else(|| "Undated".to_string());
            let description = post.description.as_deref().unwrap_or_default();

            writeln!(state.out, "{} from {}", date, to_display_line(&entry.feed_name))?;
            writeln!(state.out, "--- {} ---", to_display_line(&post.title))?;
            writeln!(
                state.out,
                "    {}",
                truncate_to_width(&to_display_line(description), DESCRIPTION_WIDTH)
            )?;
            writeln!(state.out, "Link: {}", post.url)?;
            writeln!(state.out, "{}", DIVIDER)?;
        }
        Ok(())
    }
    .boxed()
}

fn parse_limit(cmd: &Command) -> Result<i64, CommandError> {
    match cmd.args.as_slice() {
        [] => Ok(DEFAULT_LIMIT),
        [raw] => {
            let limit: i64 = raw
                .trim()
                .parse()
                .map_err(|e| CommandError::InvalidLimit(format!("{:?}: {}", raw, e)))?;
            if limit < 0 {
                return Err(CommandError::InvalidLimit(format!(
                    "{} (must be zero or more)",
                    limit
                )));
            }
            Ok(limit)
        }
        _ => Err(cmd.usage("[limit]")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::authenticate;
    use crate::commands::test_support::logged_in_state;
    use crate::storage::NewPost;
    use chrono::{TimeZone, Utc};

    fn cmd(args: &[&str]) -> Command {
        Command::new("browse", args.iter().copied())
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(&cmd(&[])).unwrap(), 2);
        assert_eq!(parse_limit(&cmd(&["10"])).unwrap(), 10);
        assert_eq!(parse_limit(&cmd(&["0"])).unwrap(), 0);
        assert!(matches!(
            parse_limit(&cmd(&["abc"])),
            Err(CommandError::InvalidLimit(_))
        ));
        assert!(matches!(
            parse_limit(&cmd(&["-1"])),
            Err(CommandError::InvalidLimit(_))
        ));
        assert!(matches!(
            parse_limit(&cmd(&["1", "2"])),
            Err(CommandError::Usage(_))
        ));
    }

    async fn seeded() -> (State, AuthenticatedContext) {
        let state = logged_in_state("alice").await;
        let ctx = authenticate(&state).await.unwrap();
        let feed = state
            .db
            .create_feed("Blog", "https://example.com/rss", ctx.user.id)
            .await
            .unwrap();
        state.db.create_feed_follow(ctx.user.id, feed.id).await.unwrap();

        for (i, day) in [1, 3, 2].into_iter().enumerate() {
            state
                .db
                .create_post(&NewPost {
                    feed_id: feed.id,
                    title: format!("Post {}", i),
                    url: format!("https://example.com/{}", i),
                    description: Some(format!("Body {}", i)),
                    published_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()),
                })
                .await
                .unwrap();
        }
        (state, ctx)
    }

    #[tokio::test]
    async fn test_browse_defaults_to_two_newest() {
        let (mut state, ctx) = seeded().await;

        browse(&mut state, &cmd(&[]), ctx).await.unwrap();
        let out = state.out.contents();
        assert!(out.starts_with("Found 2 posts for user alice:\n"));
        // Newest first: May 3 (Post 1) then May 2 (Post 2)
        let first = out.find("--- Post 1 ---").unwrap();
        let second = out.find("--- Post 2 ---").unwrap();
        assert!(first < second);
        assert!(!out.contains("--- Post 0 ---"));
        assert!(out.contains("Fri May 3 from Blog"));
    }

    #[tokio::test]
    async fn test_browse_invalid_limit_prints_nothing() {
        let (mut state, ctx) = seeded().await;

        let err = browse(&mut state, &cmd(&["abc"]), ctx).await.unwrap_err();
        assert!(err.to_string().starts_with("invalid limit:"));
        assert_eq!(state.out.contents(), "");
    }

    #[tokio::test]
    async fn test_browse_larger_limit() {
        let (mut state, ctx) = seeded().await;

        browse(&mut state, &cmd(&["10"]), ctx).await.unwrap();
        assert!(state.out.contents().starts_with("Found 3 posts"));
    }
}
