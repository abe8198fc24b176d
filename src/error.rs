use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::tournaments::matches::stages::Stage;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("stored {what} is malformed: {reason}")]
    Corrupt { what: &'static str, reason: String },
    #[error("background task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

/// A client-correctable failure. Each variant names the rule that was
/// violated, and is serialized (tagged by `rule`) into error responses.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("`{stage}` is not a stage")]
    UnknownStage { stage: String },
    #[error(
        "`{stage}` is not a stage of a match with {judge_questions} judge questions"
    )]
    StageNotInEvent { stage: Stage, judge_questions: u32 },
    #[error("cannot move a match backwards from `{from}` to `{to}`")]
    BackwardTransition { from: Stage, to: Stage },
    #[error("the match is already at stage `{stage}`")]
    RepeatedStage { stage: Stage },
    #[error("a draft match cannot be completed directly")]
    DraftToCompleted,
    #[error("the match is completed and accepts no further changes")]
    MatchCompleted,
    #[error("no judges are assigned to match {match_id}")]
    NoJudgesAssigned { match_id: String },
    #[error("judge {judge_id} has not submitted a score for team {team_id}")]
    MissingScore { judge_id: String, team_id: String },
    #[error("scores cannot be saved while the match is at stage `{stage}`")]
    OutsideScoringWindow { stage: Stage },
    #[error("scores cannot be submitted while the match is at stage `{stage}`")]
    OutsideSubmissionWindow { stage: Stage },
    #[error("match results are not available at stage `{stage}`")]
    NotScoreable { stage: Stage },
    #[error("team {team_id} does not take part in match {match_id}")]
    TeamNotInMatch { match_id: String, team_id: String },
    #[error("judge {judge_id} has already submitted a score for team {team_id}")]
    ScoreAlreadySubmitted { judge_id: String, team_id: String },
    #[error("{given} judge question scores given, but only {configured} are configured")]
    TooManyJudgeQuestions { given: usize, configured: u32 },
    #[error("`{name}` is not a scoring criterion of this event")]
    UnknownCriterion { name: String },
    #[error("{value} points for {field} is outside of 0 to {max}")]
    PointsOutOfRange {
        field: String,
        value: Decimal,
        max: u32,
    },
    #[error("judge question count {count} is out of range (at most {max})")]
    JudgeQuestionCountOutOfRange { count: u32, max: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resource", content = "id", rename_all = "snake_case")]
pub enum NotFound {
    #[error("no event with id {0}")]
    Event(String),
    #[error("no match with id {0}")]
    Match(String),
    #[error("no team with id {0}")]
    Team(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PermissionError {
    #[error("only the moderator of match {match_id} may change its stage")]
    NotModerator { match_id: String },
    #[error("{actor_id} is not a judge assigned to match {match_id}")]
    NotAssignedJudge { match_id: String, actor_id: String },
}
