//! Command dispatch: the closed set of gator commands, the shared state they
//! run against, and the registry that routes a parsed [`Command`] to its
//! handler.

mod agg;
mod auth;
mod browse;
mod feeds;
mod registry;
mod users;

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::Config;
use crate::feed::{FeedClient, IntervalError};
use crate::storage::{Database, DatabaseError};
use crate::util::UrlValidationError;

pub use auth::{authenticate, require_login, AuthenticatedContext};
pub use registry::{Handler, HandlerFuture, LoggedInHandler, PlainHandler, Registry};

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by dispatch and argument handling.
///
/// Store and network failures reach the caller as the underlying error with
/// `anyhow` context attached; these variants cover everything gator decides
/// on its own.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command not found: {0}")]
    NotFound(String),

    /// Wrong number or shape of arguments; the message is the usage line
    #[error("{0}")]
    Usage(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("couldn't parse interval: {0}")]
    InvalidInterval(#[source] IntervalError),

    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[source] UrlValidationError),

    #[error("error getting user: {0}")]
    Auth(#[source] DatabaseError),

    #[error("error getting user: no one is logged in, run `register` or `login` first")]
    NotLoggedIn,
}

// ============================================================================
// Command
// ============================================================================

/// One invocation: the command name as typed and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn usage(&self, params: &str) -> CommandError {
        CommandError::Usage(format!("usage: {} {}", self.name, params))
    }

    pub(crate) fn expect_no_args(&self) -> Result<(), CommandError> {
        if self.args.is_empty() {
            Ok(())
        } else {
            Err(CommandError::Usage(format!(
                "usage: {} (takes no arguments)",
                self.name
            )))
        }
    }

    pub(crate) fn expect_one_arg(&self, params: &str) -> Result<&str, CommandError> {
        match self.args.as_slice() {
            [arg] => Ok(arg),
            _ => Err(self.usage(params)),
        }
    }
}

/// Every command gator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Login,
    Register,
    Reset,
    Users,
    Agg,
    AddFeed,
    Feeds,
    Follow,
    Following,
    Unfollow,
    Browse,
}

impl CommandKind {
    pub const ALL: [CommandKind; 11] = [
        CommandKind::Login,
        CommandKind::Register,
        CommandKind::Reset,
        CommandKind::Users,
        CommandKind::Agg,
        CommandKind::AddFeed,
        CommandKind::Feeds,
        CommandKind::Follow,
        CommandKind::Following,
        CommandKind::Unfollow,
        CommandKind::Browse,
    ];

    /// Name as typed on the command line
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Login => "login",
            CommandKind::Register => "register",
            CommandKind::Reset => "reset",
            CommandKind::Users => "users",
            CommandKind::Agg => "agg",
            CommandKind::AddFeed => "addfeed",
            CommandKind::Feeds => "feeds",
            CommandKind::Follow => "follow",
            CommandKind::Following => "following",
            CommandKind::Unfollow => "unfollow",
            CommandKind::Browse => "browse",
        }
    }

    /// The handler wired up by [`Registry::with_defaults`].
    pub fn default_handler(self) -> Handler {
        match self {
            CommandKind::Login => Handler::Plain(users::login),
            CommandKind::Register => Handler::Plain(users::register),
            CommandKind::Reset => Handler::Plain(users::reset),
            CommandKind::Users => Handler::Plain(users::list_users),
            CommandKind::Agg => Handler::Plain(agg::aggregate),
            CommandKind::AddFeed => require_login(feeds::add_feed),
            CommandKind::Feeds => Handler::Plain(feeds::list_feeds),
            CommandKind::Follow => require_login(feeds::follow),
            CommandKind::Following => require_login(feeds::following),
            CommandKind::Unfollow => require_login(feeds::unfollow),
            CommandKind::Browse => require_login(browse::browse),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = CommandError;

    /// Exact, case-sensitive match on the command name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CommandError::NotFound(s.to_string()))
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// Where handlers print their listings.
pub enum Output {
    Stdout(std::io::Stdout),
    /// Collects everything written, for inspection in tests
    Captured(Vec<u8>),
}

impl Output {
    pub fn stdout() -> Self {
        Output::Stdout(std::io::stdout())
    }

    pub fn captured() -> Self {
        Output::Captured(Vec::new())
    }

    /// Text written so far; always empty for stdout.
    pub fn contents(&self) -> String {
        match self {
            Output::Stdout(_) => String::new(),
            Output::Captured(buf) => String::from_utf8_lossy(buf).into_owned(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Output::Stdout(out) => out.write(buf),
            Output::Captured(v) => v.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Output::Stdout(out) => out.flush(),
            Output::Captured(_) => Ok(()),
        }
    }
}

/// Everything a handler may touch.
pub struct State {
    pub db: Database,
    pub config: Config,
    pub client: FeedClient,
    pub out: Output,
    /// Stop signal for `agg`. When unset, `agg` listens for Ctrl-C/SIGTERM.
    pub shutdown: Option<watch::Receiver<bool>>,
}

impl State {
    pub fn new(db: Database, config: Config, client: FeedClient) -> Self {
        Self {
            db,
            config,
            client,
            out: Output::stdout(),
            shutdown: None,
        }
    }

    pub fn with_output(mut self, out: Output) -> Self {
        self.out = out;
        self
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

/// Divider printed between listing entries
pub(crate) const DIVIDER: &str = "=====================================";
