use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use diesel::{
    Connection, connection::LoadConnection, prelude::*, sqlite::Sqlite,
};
use serde::Deserialize;

use crate::{
    error::{EngineError, ValidationError},
    permission::{Actor, ensure_moderator},
    schema::event_matches,
    state::{DbPool, with_conn},
    tournaments::{
        config::{DEFAULT_JUDGE_QUESTIONS, MAX_JUDGE_QUESTIONS},
        fetch_judge_question_count,
        matches::{
            Match, MatchRepr,
            scores::aggregate::{
                JudgeTotals, MatchOutcome, MatchTally, compute_match_outcome,
                validate_completion,
            },
            stages::{self, Stage, check_transition},
        },
    },
    util_resp::StandardResponse,
};

/// Moves a match to `requested`. Only the match's moderator (or an
/// administrator) may do this, and a match may only be completed once every
/// assigned judge has submitted scores for both teams. Completing a match
/// records its winner.
#[tracing::instrument(skip(conn))]
pub fn request_stage_transition(
    match_id: &str,
    requested: Stage,
    actor: &Actor,
    conn: &mut (impl Connection<Backend = Sqlite> + LoadConnection),
) -> Result<Match, EngineError> {
    conn.transaction(|conn| -> Result<Match, EngineError> {
        let repr = MatchRepr::fetch(match_id, conn)?;
        ensure_moderator(actor, &repr.fixture)?;

        let judge_questions =
            fetch_judge_question_count(&repr.fixture.event_id, conn)?;
        check_transition(repr.fixture.stage, requested, judge_questions)?;

        let winner_id = if requested == Stage::Completed {
            validate_completion(&repr)?;
            MatchTally::of(&repr)?.winner().map(str::to_string)
        } else {
            None
        };

        diesel::update(event_matches::table.filter(event_matches::id.eq(match_id)))
            .set((
                event_matches::stage.eq(requested.to_string()),
                event_matches::winner_id.eq(winner_id.as_deref()),
            ))
            .execute(conn)?;

        tracing::info!(
            from = %repr.fixture.stage,
            to = %requested,
            actor = actor.id(),
            "match stage changed"
        );

        Ok(Match {
            stage: requested,
            winner_id,
            ..repr.fixture
        })
    })
}

/// Checks whether the match could be completed now.
#[tracing::instrument(skip(conn))]
pub fn validate_match_completion(
    match_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<(), EngineError> {
    let repr = MatchRepr::fetch(match_id, conn)?;
    validate_completion(&repr)?;
    Ok(())
}

pub fn next_allowed_stages_of_match(
    match_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<Stage>, EngineError> {
    let fixture = Match::fetch(match_id, conn)?;
    let judge_questions = fetch_judge_question_count(&fixture.event_id, conn)?;
    Ok(stages::next_allowed_stages(fixture.stage, judge_questions))
}

#[derive(Deserialize, Debug)]
pub struct StageRequest {
    pub stage: String,
}

pub async fn do_request_transition(
    State(pool): State<DbPool>,
    Path(match_id): Path<String>,
    actor: Actor,
    Json(request): Json<StageRequest>,
) -> StandardResponse<Json<Match>> {
    let requested = request.stage.parse::<Stage>().map_err(EngineError::from)?;
    let updated = with_conn(&pool, move |conn| {
        request_stage_transition(&match_id, requested, &actor, conn)
    })
    .await?;
    Ok(Json(updated))
}

pub async fn check_completion(
    State(pool): State<DbPool>,
    Path(match_id): Path<String>,
) -> StandardResponse<StatusCode> {
    with_conn(&pool, move |conn| validate_match_completion(&match_id, conn))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn view_next_stages_of_match(
    State(pool): State<DbPool>,
    Path(match_id): Path<String>,
) -> StandardResponse<Json<Vec<Stage>>> {
    let stages = with_conn(&pool, move |conn| {
        next_allowed_stages_of_match(&match_id, conn)
    })
    .await?;
    Ok(Json(stages))
}

#[derive(Deserialize, Debug)]
pub struct NextStagesQuery {
    pub current: String,
    pub judge_questions: Option<u32>,
}

pub async fn view_next_stages(
    Query(query): Query<NextStagesQuery>,
) -> StandardResponse<Json<Vec<Stage>>> {
    let current = query.current.parse::<Stage>().map_err(EngineError::from)?;
    let judge_questions =
        query.judge_questions.unwrap_or(DEFAULT_JUDGE_QUESTIONS);
    if judge_questions > MAX_JUDGE_QUESTIONS {
        return Err(EngineError::from(
            ValidationError::JudgeQuestionCountOutOfRange {
                count: judge_questions,
                max: MAX_JUDGE_QUESTIONS,
            },
        )
        .into());
    }
    Ok(Json(stages::next_allowed_stages(current, judge_questions)))
}

#[derive(Deserialize, Debug)]
pub struct OutcomeQuery {
    pub team: String,
}

pub async fn view_match_outcome(
    State(pool): State<DbPool>,
    Path(match_id): Path<String>,
    Query(query): Query<OutcomeQuery>,
) -> StandardResponse<Json<MatchOutcome>> {
    let outcome = with_conn(&pool, move |conn| {
        let repr = MatchRepr::fetch(&match_id, conn)?;
        compute_match_outcome(&repr, &query.team)
    })
    .await?;
    Ok(Json(outcome))
}

/// The totals of each real judge who has submitted scores for both teams.
pub async fn view_judge_breakdown(
    State(pool): State<DbPool>,
    Path(match_id): Path<String>,
) -> StandardResponse<Json<Vec<JudgeTotals>>> {
    let judges = with_conn(&pool, move |conn| {
        let repr = MatchRepr::fetch(&match_id, conn)?;
        Ok(MatchTally::of(&repr)?.judges)
    })
    .await?;
    Ok(Json(judges))
}
