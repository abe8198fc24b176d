use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    error::{EngineError, NotFound},
    schema::{event_matches, match_judges, match_scores},
    tournaments::matches::{
        scores::{Score, ScoreRow},
        stages::{JudgeOrdinal, Stage},
    },
};

pub mod manage;
pub mod scores;
pub mod stages;

#[derive(Queryable, Clone, Debug)]
pub struct MatchRow {
    pub id: String,
    pub event_id: String,
    pub round: i64,
    pub team_a_id: String,
    pub team_b_id: String,
    pub moderator_id: Option<String>,
    pub stage: String,
    pub winner_id: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub room: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Match {
    pub id: String,
    pub event_id: String,
    pub round: i64,
    pub team_a_id: String,
    pub team_b_id: String,
    pub moderator_id: Option<String>,
    pub stage: Stage,
    /// Set when the match is completed; `None` for a tied (or unfinished)
    /// match.
    pub winner_id: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub room: Option<String>,
}

impl TryFrom<MatchRow> for Match {
    type Error = EngineError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let stage = row.stage.parse::<Stage>().map_err(|e| {
            EngineError::Corrupt {
                what: "match stage",
                reason: e.to_string(),
            }
        })?;

        Ok(Match {
            id: row.id,
            event_id: row.event_id,
            round: row.round,
            team_a_id: row.team_a_id,
            team_b_id: row.team_b_id,
            moderator_id: row.moderator_id,
            stage,
            winner_id: row.winner_id,
            scheduled_at: row.scheduled_at,
            room: row.room,
        })
    }
}

impl Match {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        match_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Match, EngineError> {
        event_matches::table
            .filter(event_matches::id.eq(match_id))
            .first::<MatchRow>(conn)
            .optional()?
            .ok_or_else(|| NotFound::Match(match_id.to_string()))?
            .try_into()
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.team_a_id == team_id || self.team_b_id == team_id
    }

    pub fn opponent_of(&self, team_id: &str) -> Option<&str> {
        if self.team_a_id == team_id {
            Some(&self.team_b_id)
        } else if self.team_b_id == team_id {
            Some(&self.team_a_id)
        } else {
            None
        }
    }
}

#[derive(Queryable, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct JudgeAssignment {
    pub id: String,
    pub match_id: String,
    pub judge_id: String,
    pub ordinal: Option<i64>,
    /// Position of the judge in the match's (ordered) panel.
    pub seq: i64,
}

impl JudgeAssignment {
    pub fn judge_ordinal(&self) -> Option<JudgeOrdinal> {
        self.ordinal.and_then(JudgeOrdinal::from_number)
    }
}

/// A match, together with its judge panel and the scores recorded so far.
#[derive(Clone, Debug)]
pub struct MatchRepr {
    pub fixture: Match,
    pub judges: Vec<JudgeAssignment>,
    pub scores: Vec<Score>,
}

impl MatchRepr {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        match_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<MatchRepr, EngineError> {
        let fixture = Match::fetch(match_id, conn)?;

        let judges = match_judges::table
            .filter(match_judges::match_id.eq(match_id))
            .order_by(match_judges::seq.asc())
            .load::<JudgeAssignment>(conn)?;

        let scores = match_scores::table
            .filter(match_scores::match_id.eq(match_id))
            .load::<ScoreRow>(conn)?
            .into_iter()
            .map(Score::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MatchRepr {
            fixture,
            judges,
            scores,
        })
    }

    /// Every completed match of the event, with its judges and submitted
    /// scores. Loads everything in three queries.
    #[tracing::instrument(skip(conn))]
    pub fn completed_of_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<MatchRepr>, EngineError> {
        let fixtures = event_matches::table
            .filter(event_matches::event_id.eq(event_id))
            .filter(event_matches::stage.eq(Stage::Completed.to_string()))
            .order_by((event_matches::round.asc(), event_matches::id.asc()))
            .load::<MatchRow>(conn)?
            .into_iter()
            .map(Match::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let ids = fixtures.iter().map(|m| m.id.clone()).collect::<Vec<_>>();

        let mut judges_of_match: HashMap<String, Vec<JudgeAssignment>> =
            match_judges::table
                .filter(match_judges::match_id.eq_any(&ids))
                .order_by((match_judges::match_id, match_judges::seq.asc()))
                .load::<JudgeAssignment>(conn)?
                .into_iter()
                .into_group_map_by(|j| j.match_id.clone());

        let mut scores_of_match: HashMap<String, Vec<Score>> = match_scores::table
            .filter(match_scores::match_id.eq_any(&ids))
            .filter(match_scores::is_submitted.eq(true))
            .load::<ScoreRow>(conn)?
            .into_iter()
            .map(Score::try_from)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .into_group_map_by(|s| s.match_id.clone());

        tracing::debug!("loaded {} completed matches", fixtures.len());

        Ok(fixtures
            .into_iter()
            .map(|fixture| MatchRepr {
                judges: judges_of_match.remove(&fixture.id).unwrap_or_default(),
                scores: scores_of_match.remove(&fixture.id).unwrap_or_default(),
                fixture,
            })
            .collect())
    }

    pub fn is_assigned(&self, judge_id: &str) -> bool {
        self.judges.iter().any(|j| j.judge_id == judge_id)
    }

    pub fn score_of(&self, judge_id: &str, team_id: &str) -> Option<&Score> {
        self.scores
            .iter()
            .find(|s| s.judge_id == judge_id && s.team_id == team_id)
    }

    pub fn submitted_score(
        &self,
        judge_id: &str,
        team_id: &str,
    ) -> Option<&Score> {
        self.score_of(judge_id, team_id).filter(|s| s.is_submitted)
    }
}
