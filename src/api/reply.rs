use std::convert::Infallible;

use serde::Serialize;
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply, Response},
};

use crate::{error::FoodgramError, middleware::Unauthorized};

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

fn detail_reply(detail: String, status: StatusCode) -> Response {
    reply::with_status(reply::json(&ErrorBody { detail }), status).into_response()
}

/// Renders an action failure as `{"detail": ...}` with the status carried by the error.
/// Server-side faults keep their details in the log.
pub fn error_reply(error: potion::Error) -> Response {
    let status =
        StatusCode::from_u16(error.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let detail = match (status.is_server_error(), error.info) {
        (false, Some(info)) => info,
        _ => status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_owned(),
    };
    detail_reply(detail, status)
}

pub fn json_reply<T: Serialize>(
    result: Result<T, potion::Error>,
    status: StatusCode,
) -> Result<Response, Infallible> {
    Ok(match result {
        Ok(value) => reply::with_status(reply::json(&value), status).into_response(),
        Err(e) => error_reply(e),
    })
}

pub fn empty_reply(result: Result<(), potion::Error>) -> Result<Response, Infallible> {
    Ok(match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_reply(e),
    })
}

/// Turns rejections that escaped every route into JSON replies.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (detail, status) = if err.is_not_found() {
        ("Not found".to_owned(), StatusCode::NOT_FOUND)
    } else if err.find::<Unauthorized>().is_some() {
        (FoodgramError::Unauthorized.to_string(), StatusCode::UNAUTHORIZED)
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (e.to_string(), StatusCode::BAD_REQUEST)
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (e.to_string(), StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ("Payload too large".to_owned(), StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        ("Unsupported media type".to_owned(), StatusCode::UNSUPPORTED_MEDIA_TYPE)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("Method not allowed".to_owned(), StatusCode::METHOD_NOT_ALLOWED)
    } else {
        log::error!("Unhandled rejection: {err:?}");
        ("Internal Server Error".to_owned(), StatusCode::INTERNAL_SERVER_ERROR)
    };

    Ok(detail_reply(detail, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_status_and_message() {
        let response = error_reply(FoodgramError::SelfSubscription.into());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_reply(FoodgramError::not_found("recipe 1").into());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = error_reply(FoodgramError::Forbidden.into());
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn storage_errors_become_500() {
        let response = error_reply(crate::error::QueryError::new("relation missing".to_owned()).into());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unauthorized_rejection_is_401() {
        let response = handle_rejection(warp::reject::custom(Unauthorized))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = handle_rejection(warp::reject::not_found())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
