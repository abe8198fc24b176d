//! Who is making a request, and what they may do to a match.
//!
//! Authentication happens in front of this service; the authenticated
//! identity arrives in the `x-actor-id` and `x-actor-role` headers.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use serde::Serialize;

use crate::{
    error::PermissionError,
    tournaments::matches::{Match, MatchRepr},
    util_resp::FailureResponse,
};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// May act as the moderator of any match, and record scores on behalf of
    /// any assigned judge.
    Administrator(String),
    User(String),
}

impl Actor {
    pub fn id(&self) -> &str {
        match self {
            Actor::Administrator(id) | Actor::User(id) => id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Administrator(_))
    }

    fn from_headers(headers: &HeaderMap) -> Option<Actor> {
        let id = headers
            .get(ACTOR_ID_HEADER)?
            .to_str()
            .ok()
            .filter(|id| !id.is_empty())?
            .to_string();

        match headers.get(ACTOR_ROLE_HEADER).map(|role| role.to_str()) {
            Some(Ok("admin")) => Some(Actor::Administrator(id)),
            Some(Ok("user")) | None => Some(Actor::User(id)),
            Some(_) => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Actor::from_headers(&parts.headers).ok_or_else(|| {
            FailureResponse::unauthorized(
                "missing or malformed actor headers",
            )
        })
    }
}

/// Only the match's moderator (or an administrator) may move it between
/// stages.
pub fn ensure_moderator(
    actor: &Actor,
    fixture: &Match,
) -> Result<(), PermissionError> {
    if actor.is_admin()
        || fixture.moderator_id.as_deref() == Some(actor.id())
    {
        Ok(())
    } else {
        Err(PermissionError::NotModerator {
            match_id: fixture.id.clone(),
        })
    }
}

/// Resolves which judge a score is being recorded for. Users may only record
/// their own scores, and must be assigned to the match; administrators may
/// record scores for any assigned judge.
pub fn judge_for_score(
    actor: &Actor,
    repr: &MatchRepr,
    on_behalf_of: Option<&str>,
) -> Result<String, PermissionError> {
    let judge_id = match (actor, on_behalf_of) {
        (Actor::Administrator(_), Some(judge_id)) => judge_id,
        (_, None) => actor.id(),
        (Actor::User(id), Some(judge_id)) if id == judge_id => judge_id,
        (Actor::User(id), Some(_)) => {
            return Err(PermissionError::NotAssignedJudge {
                match_id: repr.fixture.id.clone(),
                actor_id: id.clone(),
            });
        }
    };

    if repr.is_assigned(judge_id) {
        Ok(judge_id.to_string())
    } else {
        Err(PermissionError::NotAssignedJudge {
            match_id: repr.fixture.id.clone(),
            actor_id: judge_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::test::fixtures::MatchBuilder;

    #[test]
    fn reads_actor_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(Actor::from_headers(&headers), None);

        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("u1"));
        assert_eq!(
            Actor::from_headers(&headers),
            Some(Actor::User("u1".to_string()))
        );

        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("admin"));
        assert_eq!(
            Actor::from_headers(&headers),
            Some(Actor::Administrator("u1".to_string()))
        );

        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("root"));
        assert_eq!(Actor::from_headers(&headers), None);
    }

    #[test]
    fn moderator_or_admin_only() {
        let repr = MatchBuilder::new("m1", "A", "B").build();
        assert!(
            ensure_moderator(&Actor::User("moderator".into()), &repr.fixture)
                .is_ok()
        );
        assert!(
            ensure_moderator(&Actor::Administrator("x".into()), &repr.fixture)
                .is_ok()
        );
        assert_eq!(
            ensure_moderator(&Actor::User("j1".into()), &repr.fixture),
            Err(PermissionError::NotModerator {
                match_id: "m1".into()
            })
        );
    }

    #[test]
    fn judges_score_for_themselves() {
        let repr = MatchBuilder::new("m1", "A", "B").assign("j1").build();

        assert_eq!(
            judge_for_score(&Actor::User("j1".into()), &repr, None),
            Ok("j1".to_string())
        );
        assert!(
            judge_for_score(&Actor::User("j2".into()), &repr, None).is_err()
        );
        assert!(
            judge_for_score(&Actor::User("j2".into()), &repr, Some("j1"))
                .is_err()
        );
        assert_eq!(
            judge_for_score(
                &Actor::Administrator("root".into()),
                &repr,
                Some("j1")
            ),
            Ok("j1".to_string())
        );
        assert!(
            judge_for_score(&Actor::Administrator("root".into()), &repr, None)
                .is_err()
        );
    }
}
