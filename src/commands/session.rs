use crate::models::session::{LoginInput, Session};

use super::{run_blocking, AppState, CommandError, CommandResult};

pub async fn session_login(state: &AppState, input: LoginInput) -> CommandResult<Session> {
    let auth = state.auth();
    let context = state.session();
    run_blocking(move || {
        let session = auth.login(&input)?;
        context.save(session.clone())?;
        Ok(session)
    })
    .await
}

pub async fn session_logout(state: &AppState) -> CommandResult<()> {
    let context = state.session();
    run_blocking(move || context.clear()).await
}

pub fn session_current(state: &AppState) -> Option<Session> {
    state.session().current()
}

pub fn session_require(state: &AppState) -> CommandResult<Session> {
    state.session().require().map_err(CommandError::from)
}
