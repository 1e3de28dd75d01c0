use anyhow::Result;
use futures::future::BoxFuture;
use std::collections::HashMap;

use super::auth::{authenticate, AuthenticatedContext};
use super::{Command, CommandError, CommandKind, State};

pub type HandlerFuture<'a> = BoxFuture<'a, Result<()>>;

/// A handler that needs nothing beyond the shared state.
pub type PlainHandler = for<'a> fn(&'a mut State, &'a Command) -> HandlerFuture<'a>;

/// A handler that only runs for a resolved, logged-in user.
pub type LoggedInHandler =
    for<'a> fn(&'a mut State, &'a Command, AuthenticatedContext) -> HandlerFuture<'a>;

#[derive(Clone, Copy)]
pub enum Handler {
    Plain(PlainHandler),
    LoggedIn(LoggedInHandler),
}

impl Handler {
    /// Invoke the handler. A [`Handler::LoggedIn`] resolves the current user
    /// first and never runs when that fails.
    pub async fn call(&self, state: &mut State, cmd: &Command) -> Result<()> {
        match self {
            Handler::Plain(handler) => handler(state, cmd).await,
            Handler::LoggedIn(handler) => {
                let ctx = authenticate(state).await?;
                handler(state, cmd, ctx).await
            }
        }
    }
}

/// Command → handler table, built once at startup.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<CommandKind, Handler>,
}

impl Registry {
    /// An empty registry; every command is "not found" until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command wired to its default handler
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in CommandKind::ALL {
            registry.register(kind, kind.default_handler());
        }
        registry
    }

    /// Store `handler` for `kind`, replacing any earlier registration.
    pub fn register(&mut self, kind: CommandKind, handler: Handler) {
        if self.handlers.insert(kind, handler).is_some() {
            tracing::debug!(command = %kind, "Replaced command handler");
        }
    }

    pub fn contains(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Dispatch `cmd` by exact name. The handler's result is returned as is.
    pub async fn run(&self, state: &mut State, cmd: &Command) -> Result<()> {
        let kind: CommandKind = cmd.name.parse()?;
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| CommandError::NotFound(cmd.name.clone()))?;

        tracing::debug!(command = %kind, args = cmd.args.len(), "Running command");
        handler.call(state, cmd).await
    }
}
