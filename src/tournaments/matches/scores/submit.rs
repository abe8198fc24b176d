use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use diesel::{
    Connection, connection::LoadConnection, prelude::*, sqlite::Sqlite,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{EngineError, ValidationError},
    permission::{Actor, judge_for_score},
    schema::match_scores,
    state::{DbPool, with_conn},
    tournaments::{
        Event,
        config::{MAX_POINTS, ScoringConfig},
        matches::{
            MatchRepr,
            scores::{Score, ScoreSheet},
        },
        teams::Team,
    },
    util_resp::StandardResponse,
};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    #[serde(flatten)]
    pub sheet: ScoreSheet,
    /// Finalize the score. Submitted scores can no longer be changed.
    #[serde(default)]
    pub submit: bool,
    /// Administrators record scores on behalf of a judge; judges may leave
    /// this out.
    #[serde(default)]
    pub judge_id: Option<String>,
}

/// Checks a score sheet against the event's rubric.
pub fn check_sheet(
    sheet: &ScoreSheet,
    config: &ScoringConfig,
) -> Result<(), ValidationError> {
    let configured = config.judge_question_count();
    if sheet.judge_questions.len() > configured as usize {
        return Err(ValidationError::TooManyJudgeQuestions {
            given: sheet.judge_questions.len(),
            configured,
        });
    }

    if !config.criteria.is_empty()
        && let Some(name) = sheet
            .criteria
            .keys()
            .find(|name| !config.criteria.contains(name))
    {
        return Err(ValidationError::UnknownCriterion { name: name.clone() });
    }

    let max = Decimal::from(MAX_POINTS);
    let points = sheet
        .criteria
        .iter()
        .map(|(name, value)| (format!("criterion `{name}`"), *value))
        .chain(
            sheet
                .judge_questions
                .iter()
                .enumerate()
                .map(|(i, value)| (format!("judge question {}", i + 1), *value)),
        );
    for (field, value) in points {
        if value < Decimal::ZERO || value > max {
            return Err(ValidationError::PointsOutOfRange {
                field,
                value,
                max: MAX_POINTS,
            });
        }
    }

    Ok(())
}

/// Creates or updates a judge's score for one team of a match.
///
/// Drafts may be saved at any stage of the scoring window, but a score may
/// only be submitted once the match has reached final scoring.
#[tracing::instrument(skip(conn, submission))]
pub fn save_score(
    match_id: &str,
    team_id: &str,
    actor: &Actor,
    submission: ScoreSubmission,
    conn: &mut (impl Connection<Backend = Sqlite> + LoadConnection),
) -> Result<Score, EngineError> {
    conn.transaction(|conn| -> Result<Score, EngineError> {
        let repr = MatchRepr::fetch(match_id, conn)?;
        let fixture = &repr.fixture;

        let judge_id =
            judge_for_score(actor, &repr, submission.judge_id.as_deref())?;

        if !fixture.involves(team_id) {
            Team::fetch(team_id, &fixture.event_id, conn)?;
            return Err(ValidationError::TeamNotInMatch {
                match_id: match_id.to_string(),
                team_id: team_id.to_string(),
            }
            .into());
        }
        if !fixture.stage.is_scoring_window() {
            return Err(ValidationError::OutsideScoringWindow {
                stage: fixture.stage,
            }
            .into());
        }
        if submission.submit && !fixture.stage.is_submission_window() {
            return Err(ValidationError::OutsideSubmissionWindow {
                stage: fixture.stage,
            }
            .into());
        }

        let existing = repr.score_of(&judge_id, team_id);
        if existing.is_some_and(|score| score.is_submitted) {
            return Err(ValidationError::ScoreAlreadySubmitted {
                judge_id,
                team_id: team_id.to_string(),
            }
            .into());
        }

        let config = Event::fetch(&fixture.event_id, conn)?.scoring_config();
        check_sheet(&submission.sheet, &config)?;

        let encode = |e: serde_json::Error| EngineError::Corrupt {
            what: "score sheet",
            reason: e.to_string(),
        };
        let criteria =
            serde_json::to_string(&submission.sheet.criteria).map_err(encode)?;
        let judge_questions =
            serde_json::to_string(&submission.sheet.judge_questions)
                .map_err(encode)?;
        let now = Utc::now().naive_utc();

        let id = match existing {
            Some(score) => {
                diesel::update(
                    match_scores::table.filter(match_scores::id.eq(&score.id)),
                )
                .set((
                    match_scores::criteria.eq(&criteria),
                    match_scores::judge_questions.eq(&judge_questions),
                    match_scores::notes.eq(&submission.sheet.notes),
                    match_scores::is_submitted.eq(submission.submit),
                    match_scores::updated_at.eq(now),
                ))
                .execute(conn)?;
                score.id.clone()
            }
            None => {
                let id = Uuid::now_v7().to_string();
                diesel::insert_into(match_scores::table)
                    .values((
                        match_scores::id.eq(&id),
                        match_scores::match_id.eq(match_id),
                        match_scores::judge_id.eq(&judge_id),
                        match_scores::team_id.eq(team_id),
                        match_scores::criteria.eq(&criteria),
                        match_scores::judge_questions.eq(&judge_questions),
                        match_scores::notes.eq(&submission.sheet.notes),
                        match_scores::is_submitted.eq(submission.submit),
                        match_scores::updated_at.eq(now),
                    ))
                    .execute(conn)?;
                id
            }
        };

        tracing::info!(
            judge_id,
            team_id,
            submitted = submission.submit,
            "score saved"
        );

        Ok(Score {
            id,
            match_id: match_id.to_string(),
            judge_id,
            team_id: team_id.to_string(),
            sheet: submission.sheet,
            is_submitted: submission.submit,
            updated_at: now,
        })
    })
}

pub async fn do_save_score(
    State(pool): State<DbPool>,
    Path((match_id, team_id)): Path<(String, String)>,
    actor: Actor,
    Json(submission): Json<ScoreSubmission>,
) -> StandardResponse<Json<Score>> {
    let score = with_conn(&pool, move |conn| {
        save_score(&match_id, &team_id, &actor, submission, conn)
    })
    .await?;
    Ok(Json(score))
}
