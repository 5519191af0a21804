use std::convert::Infallible;

use warp::{
    http::{header, StatusCode},
    reply::{self, Reply, Response},
};

use crate::{
    actions,
    jwt::SessionData,
    permissions::ActionType,
    schema::{RecipeForm, Uuid},
    SHOPPING_LIST_FILENAME,
};

use super::{
    query::{parse_recipe_query, QueryPairs},
    reply::{empty_reply, error_reply, json_reply},
    state::AppState,
};

pub async fn list(
    session: Option<SessionData>,
    query: QueryPairs,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        let (page, filter) = parse_recipe_query(&query)?;
        let viewer = session.map(|s| s.user_id);
        actions::fetch_recipes(&filter, page, viewer, &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::OK)
}

pub async fn detail(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<Response, Infallible> {
    let viewer = session.map(|s| s.user_id);
    json_reply(
        actions::get_recipe_view(id, viewer, &state.pool).await,
        StatusCode::OK,
    )
}

pub async fn create(
    session: SessionData,
    form: RecipeForm,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::CreateRecipes)?;
        let id = actions::create_recipe(session.user_id, &form, &state.pool).await?;
        actions::get_recipe_view(id, Some(session.user_id), &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::CREATED)
}

pub async fn update(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        actions::get_recipe_mut(id, &session, &state.pool).await?;
        actions::update_recipe(id, &form, &state.pool).await?;
        actions::get_recipe_view(id, Some(session.user_id), &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::OK)
}

pub async fn delete(id: Uuid, session: SessionData, state: AppState) -> Result<Response, Infallible> {
    let result = async {
        actions::get_recipe_mut(id, &session, &state.pool).await?;
        actions::delete_recipe(id, &state.pool).await
    }
    .await;

    empty_reply(result)
}

pub async fn add_favorite(id: Uuid, session: SessionData, state: AppState) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnFavorites)?;
        actions::add_favorite(session.user_id, id, &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::CREATED)
}

pub async fn remove_favorite(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnFavorites)?;
        actions::remove_favorite(session.user_id, id, &state.pool).await
    }
    .await;

    empty_reply(result)
}

pub async fn add_to_cart(id: Uuid, session: SessionData, state: AppState) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnShoppingCart)?;
        actions::add_to_shopping_cart(session.user_id, id, &state.pool).await
    }
    .await;

    json_reply(result, StatusCode::CREATED)
}

pub async fn remove_from_cart(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnShoppingCart)?;
        actions::remove_from_shopping_cart(session.user_id, id, &state.pool).await
    }
    .await;

    empty_reply(result)
}

/// Wraps the aggregated shopping list as a plain-text file download.
fn shopping_list_reply(body: String) -> Response {
    let disposition = format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\"");
    let reply = reply::with_header(body, header::CONTENT_TYPE, "text/plain; charset=utf-8");
    reply::with_header(reply, header::CONTENT_DISPOSITION, disposition).into_response()
}

pub async fn download_shopping_cart(session: SessionData, state: AppState) -> Result<Response, Infallible> {
    let result = async {
        session.authenticate(ActionType::ManageOwnShoppingCart)?;
        actions::export_shopping_list(session.user_id, &state.pool).await
    }
    .await;

    Ok(match result {
        Ok(body) => shopping_list_reply(body),
        Err(e) => error_reply(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shopping_list_is_a_text_attachment() {
        let response = shopping_list_reply("Salt (g) -- 13\n".to_owned());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"shopping_list.txt\"")
        );

        let body = warp::hyper::body::to_bytes(response.into_body())
            .await
            .unwrap_or_default();
        assert_eq!(&body[..], b"Salt (g) -- 13\n");
    }

    #[test]
    fn empty_shopping_list_is_still_a_download() {
        let response = shopping_list_reply(String::new());

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::CONTENT_DISPOSITION));
    }
}
