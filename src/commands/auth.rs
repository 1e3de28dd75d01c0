use super::registry::{Handler, LoggedInHandler};
use super::{CommandError, State};
use crate::storage::User;

/// Proof that the current user pointer resolved to a stored user.
///
/// Only [`authenticate`] builds one, so a logged-in handler never has to
/// look the user up again.
#[derive(Debug, Clone)]
pub struct AuthenticatedContext {
    pub user: User,
}

/// Wrap a handler that needs a user into one the registry can dispatch.
pub fn require_login(handler: LoggedInHandler) -> Handler {
    Handler::LoggedIn(handler)
}

/// Resolve `config.current_user_name` through the store.
///
/// There is no credential check: the user exists or it does not.
pub async fn authenticate(state: &State) -> Result<AuthenticatedContext, CommandError> {
    let Some(name) = state.config.current_user_name.as_deref() else {
        return Err(CommandError::NotLoggedIn);
    };

    let user = state.db.get_user(name).await.map_err(|e| {
        tracing::debug!(user = %name, error = %e, "Current user did not resolve");
        CommandError::Auth(e)
    })?;
    Ok(AuthenticatedContext { user })
}
