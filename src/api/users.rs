use std::convert::Infallible;

use warp::{http::StatusCode, reply::Response};

use crate::{
    actions,
    jwt::SessionData,
    permissions::ActionType,
    schema::{AuthToken, LoginForm, SetPasswordForm, UserForm, Uuid},
};

use super::{
    query::{parse_page, parse_recipes_limit, QueryPairs},
    reply::{empty_reply, json_reply},
    state::AppState,
};

pub async fn register(form: UserForm, state: AppState) -> Result<Response, Infallible> {
    json_reply(
        actions::register_user(&form, &state.pool).await,
        StatusCode::CREATED,
    )
}

pub async fn list(
    session: SessionData,
    query: QueryPairs,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        let page = parse_page(&query)?;
        actions::list_users(session.user_id, page, &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::OK)
}

pub async fn profile(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Infallible> {
    json_reply(
        actions::get_user_profile(id, Some(session.user_id), &state.pool).await,
        StatusCode::OK,
    )
}

pub async fn me(session: SessionData, state: AppState) -> Result<Response, Infallible> {
    json_reply(
        actions::get_user_profile(session.user_id, Some(session.user_id), &state.pool).await,
        StatusCode::OK,
    )
}

pub async fn set_password(
    session: SessionData,
    form: SetPasswordForm,
    state: AppState,
) -> Result<Response, Infallible> {
    empty_reply(actions::set_password(session.user_id, &form, &state.pool).await)
}

pub async fn login(form: LoginForm, state: AppState) -> Result<Response, Infallible> {
    let result = actions::login_user(&form.email, &form.password, &state.keys, &state.pool)
        .await
        .map(|auth_token| AuthToken { auth_token });

    json_reply(result, StatusCode::OK)
}

/// Tokens are stateless, so logging out only confirms the session was valid.
pub async fn logout(session: SessionData) -> Result<Response, Infallible> {
    log::debug!("User {} ({}) logged out", session.username, session.user_id);
    empty_reply(Ok(()))
}

pub async fn subscriptions(
    session: SessionData,
    query: QueryPairs,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnSubscriptions)?;
        let page = parse_page(&query)?;
        let recipes_limit = parse_recipes_limit(&query)?;
        actions::list_subscriptions(session.user_id, page, recipes_limit, &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::OK)
}

pub async fn subscribe(
    author_id: Uuid,
    session: SessionData,
    query: QueryPairs,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnSubscriptions)?;
        let recipes_limit = parse_recipes_limit(&query)?;
        actions::subscribe(session.user_id, author_id, recipes_limit, &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::CREATED)
}

pub async fn unsubscribe(
    author_id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnSubscriptions)?;
        actions::unsubscribe(session.user_id, author_id, &state.pool).await
    }
    .await;

    empty_reply(result)
}
