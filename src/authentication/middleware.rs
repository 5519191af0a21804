use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::TOKEN_PREFIX;

use super::jwt::{verify_jwt_session, SessionData, SessionKeys};

/// The request carried no usable `Authorization: Token ...` header.
#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

pub fn token_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix(TOKEN_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(header: &str, keys: &SessionKeys) -> Result<SessionData, Rejection> {
    let token = token_from_header(header).ok_or_else(|| reject::custom(Unauthorized))?;

    match verify_jwt_session(token, keys) {
        Ok(data) => Ok(data.into()),
        Err(_) => {
            log::debug!("Rejected session token");
            Err(reject::custom(Unauthorized))
        }
    }
}

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            match header {
                Some(header) => authenticate(&header, &keys),
                None => Err(reject::custom(Unauthorized)),
            }
        }
    })
}

/// Like [`with_session`], but anonymous requests pass through as `None`. A header that is
/// present but invalid is still rejected.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            match header {
                Some(header) => authenticate(&header, &keys).map(Some),
                None => Ok(None),
            }
        }
    })
}
