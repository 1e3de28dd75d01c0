//! End-to-end command tests: dispatch through the default registry against
//! an in-memory database, the way `main` wires things up.

use gator::commands::{Command, CommandError, Output, Registry, State};
use gator::config::Config;
use gator::feed::FeedClient;
use gator::storage::{Database, DatabaseError, NewPost};
use pretty_assertions::assert_eq;

const FEED_URL: &str = "https://blog.example.com/rss";

async fn test_state() -> State {
    let db = Database::open(":memory:").await.unwrap();
    State::new(db, Config::new("sqlite::memory:"), FeedClient::new().unwrap())
        .with_output(Output::captured())
}

async fn run(registry: &Registry, state: &mut State, line: &[&str]) -> anyhow::Result<()> {
    let (name, args) = line.split_first().unwrap();
    registry
        .run(state, &Command::new(*name, args.iter().copied()))
        .await
}

/// Drop whatever has been printed so far
fn clear_output(state: &mut State) {
    state.out = Output::captured();
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_register_then_login_moves_pointer() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;

    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    assert_eq!(state.config.current_user_name.as_deref(), Some("kahya"));

    run(&registry, &mut state, &["register", "alice"]).await.unwrap();
    run(&registry, &mut state, &["login", "kahya"]).await.unwrap();
    assert_eq!(state.config.current_user_name.as_deref(), Some("kahya"));

    clear_output(&mut state);
    run(&registry, &mut state, &["users"]).await.unwrap();
    assert_eq!(state.out.contents(), "* kahya (current)\n* alice\n");
}

#[tokio::test]
async fn test_login_unknown_user_fails_and_keeps_pointer() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "alice"]).await.unwrap();

    let err = run(&registry, &mut state, &["login", "bob"])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DatabaseError>(),
        Some(DatabaseError::UserNotFound(_))
    ));
    assert_eq!(state.config.current_user_name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_current_user_persists_to_config_file() {
    let dir = std::env::temp_dir().join("gator_commands_test_persist");
    let _ = std::fs::remove_dir_all(&dir);
    let path = dir.join("config.toml");

    let mut config = Config::load(&path).unwrap();
    config.db_url = "sqlite::memory:".to_string();
    let db = Database::open(&config.db_url).await.unwrap();
    let mut state =
        State::new(db, config, FeedClient::new().unwrap()).with_output(Output::captured());

    let registry = Registry::with_defaults();
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();

    let reloaded = Config::load(&path).unwrap();
    assert_eq!(reloaded.current_user_name.as_deref(), Some("kahya"));

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Dispatch and auth
// ============================================================================

#[tokio::test]
async fn test_unknown_command_is_not_found() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;

    let err = run(&registry, &mut state, &["frobnicate"]).await.unwrap_err();
    assert_eq!(err.to_string(), "command not found: frobnicate");
    assert!(matches!(
        err.downcast_ref::<CommandError>(),
        Some(CommandError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_gated_command_without_user_does_nothing() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;

    let err = run(&registry, &mut state, &["addfeed", "Blog", FEED_URL])
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("error getting user:"));
    assert!(state.db.get_feeds().await.unwrap().is_empty());
    assert_eq!(state.out.contents(), "");
}

#[tokio::test]
async fn test_stale_pointer_after_reset_fails_lookup() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    run(&registry, &mut state, &["reset"]).await.unwrap();

    let err = run(&registry, &mut state, &["following"])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "error getting user: user not found: kahya"
    );
}

// ============================================================================
// Feeds and follows
// ============================================================================

#[tokio::test]
async fn test_addfeed_follows_automatically() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    run(&registry, &mut state, &["addfeed", "Blog", FEED_URL])
        .await
        .unwrap();

    clear_output(&mut state);
    run(&registry, &mut state, &["following"]).await.unwrap();
    assert_eq!(
        state.out.contents(),
        "Found 1 feed follows for user kahya:\n* Blog\n=====================================\n"
    );
}

#[tokio::test]
async fn test_unfollow_then_following_is_empty() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    run(&registry, &mut state, &["addfeed", "Blog", FEED_URL])
        .await
        .unwrap();
    run(&registry, &mut state, &["unfollow", FEED_URL])
        .await
        .unwrap();

    clear_output(&mut state);
    run(&registry, &mut state, &["following"]).await.unwrap();
    assert_eq!(state.out.contents(), "No feed follows found for this user.\n");
}

#[tokio::test]
async fn test_second_user_follows_existing_feed() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    run(&registry, &mut state, &["addfeed", "Blog", FEED_URL])
        .await
        .unwrap();
    run(&registry, &mut state, &["register", "alice"]).await.unwrap();
    run(&registry, &mut state, &["follow", FEED_URL]).await.unwrap();

    clear_output(&mut state);
    run(&registry, &mut state, &["feeds"]).await.unwrap();
    let out = state.out.contents();
    assert!(out.starts_with("Found 1 feeds:\n"));
    // Owner stays the user who added it
    assert!(out.contains("* User:          kahya"));
}

// ============================================================================
// Browse
// ============================================================================

async fn seed_posts(state: &State, count: usize) {
    let feed = state.db.get_feed_by_url(FEED_URL).await.unwrap();
    for i in 0..count {
        state
            .db
            .create_post(&NewPost {
                feed_id: feed.id,
                title: format!("Post {}", i),
                url: format!("https://blog.example.com/{}", i),
                description: None,
                published_at: None,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_browse_defaults_to_two() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    run(&registry, &mut state, &["addfeed", "Blog", FEED_URL])
        .await
        .unwrap();
    seed_posts(&state, 5).await;

    clear_output(&mut state);
    run(&registry, &mut state, &["browse"]).await.unwrap();
    let out = state.out.contents();
    assert!(out.starts_with("Found 2 posts for user kahya:\n"));
    assert_eq!(out.matches("Link: ").count(), 2);
}

#[tokio::test]
async fn test_browse_non_numeric_limit_is_usage_error() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    run(&registry, &mut state, &["addfeed", "Blog", FEED_URL])
        .await
        .unwrap();
    seed_posts(&state, 1).await;

    clear_output(&mut state);
    let err = run(&registry, &mut state, &["browse", "abc"])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CommandError>(),
        Some(CommandError::InvalidLimit(_))
    ));
    assert_eq!(state.out.contents(), "");
}

#[tokio::test]
async fn test_browse_only_shows_followed_feeds() {
    let registry = Registry::with_defaults();
    let mut state = test_state().await;
    run(&registry, &mut state, &["register", "kahya"]).await.unwrap();
    run(&registry, &mut state, &["addfeed", "Blog", FEED_URL])
        .await
        .unwrap();
    seed_posts(&state, 3).await;
    run(&registry, &mut state, &["register", "alice"]).await.unwrap();

    clear_output(&mut state);
    run(&registry, &mut state, &["browse", "10"]).await.unwrap();
    assert_eq!(state.out.contents(), "Found 0 posts for user alice:\n");
}
