//! Manual corrections to team records, entered by tab staff.

use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::EngineError,
    schema::{
        score_differential_adjustments, vote_adjustments,
        win_loss_tie_adjustments,
    },
    tournaments::{
        points::HalfPoints, standings::compute::metrics::TeamRecord,
    },
};

#[derive(Queryable, Serialize, Clone, Debug, PartialEq)]
pub struct VoteAdjustment {
    pub id: String,
    pub event_id: String,
    pub team_id: String,
    /// A decimal number of votes; must be a multiple of one half.
    pub delta: String,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Clone, Debug, PartialEq)]
pub struct WinLossTieAdjustment {
    pub id: String,
    pub event_id: String,
    pub team_id: String,
    pub wins: i64,
    pub losses: i64,
    pub ties: i64,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Clone, Debug, PartialEq)]
pub struct ScoreDifferentialAdjustment {
    pub id: String,
    pub event_id: String,
    pub team_id: String,
    pub delta: String,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct AdjustmentLogs {
    pub votes: Vec<VoteAdjustment>,
    pub win_loss_ties: Vec<WinLossTieAdjustment>,
    pub score_differentials: Vec<ScoreDifferentialAdjustment>,
}

impl AdjustmentLogs {
    /// Every adjustment of the event. An event without adjustments simply
    /// has empty logs.
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<AdjustmentLogs, EngineError> {
        let votes = vote_adjustments::table
            .filter(vote_adjustments::event_id.eq(event_id))
            .order_by(vote_adjustments::created_at.asc())
            .load::<VoteAdjustment>(conn)?;
        let win_loss_ties = win_loss_tie_adjustments::table
            .filter(win_loss_tie_adjustments::event_id.eq(event_id))
            .order_by(win_loss_tie_adjustments::created_at.asc())
            .load::<WinLossTieAdjustment>(conn)?;
        let score_differentials = score_differential_adjustments::table
            .filter(score_differential_adjustments::event_id.eq(event_id))
            .order_by(score_differential_adjustments::created_at.asc())
            .load::<ScoreDifferentialAdjustment>(conn)?;

        Ok(AdjustmentLogs {
            votes,
            win_loss_ties,
            score_differentials,
        })
    }

    /// Adds every adjustment onto the records. Adjustments for teams without
    /// a record, adjustments with an unreadable amount, and adjustments which
    /// would overflow the record are skipped.
    pub fn apply(&self, records: &mut IndexMap<String, TeamRecord>) {
        for adjustment in &self.votes {
            let delta = Decimal::from_str(adjustment.delta.trim())
                .ok()
                .and_then(HalfPoints::try_from_decimal);
            match (delta, records.get_mut(&adjustment.team_id)) {
                (Some(delta), Some(record)) => {
                    match record.votes.checked_add(delta) {
                        Some(votes) => record.votes = votes,
                        None => overflow("vote", &adjustment.id),
                    }
                }
                (None, _) => skip("vote", &adjustment.id, &adjustment.delta),
                (_, None) => no_team("vote", &adjustment.id),
            }
        }

        for adjustment in &self.win_loss_ties {
            let Some(record) = records.get_mut(&adjustment.team_id) else {
                no_team("win/loss/tie", &adjustment.id);
                continue;
            };
            let adjusted = HalfPoints::checked_from_whole(adjustment.wins)
                .and_then(|wins| {
                    wins.checked_add(HalfPoints::from_halves(adjustment.ties))
                })
                .and_then(|delta| record.wins.checked_add(delta))
                .zip(
                    adjustment
                        .wins
                        .checked_add(adjustment.losses)
                        .and_then(|n| n.checked_add(adjustment.ties))
                        .and_then(|n| record.total_matches.checked_add(n)),
                );
            match adjusted {
                Some((wins, total_matches)) => {
                    record.wins = wins;
                    record.total_matches = total_matches;
                }
                None => overflow("win/loss/tie", &adjustment.id),
            }
        }

        for adjustment in &self.score_differentials {
            let delta = Decimal::from_str(adjustment.delta.trim()).ok();
            match (delta, records.get_mut(&adjustment.team_id)) {
                (Some(delta), Some(record)) => {
                    match record.score_differential.checked_add(delta) {
                        Some(differential) => {
                            record.score_differential = differential
                        }
                        None => overflow("score differential", &adjustment.id),
                    }
                }
                (None, _) => {
                    skip("score differential", &adjustment.id, &adjustment.delta)
                }
                (_, None) => no_team("score differential", &adjustment.id),
            }
        }
    }
}

fn skip(kind: &str, id: &str, delta: &str) {
    tracing::warn!(kind, id, delta, "ignoring adjustment with malformed amount");
}

fn overflow(kind: &str, id: &str) {
    tracing::warn!(kind, id, "ignoring adjustment which overflows the record");
}

fn no_team(kind: &str, id: &str) {
    tracing::warn!(kind, id, "ignoring adjustment for a team outside the event");
}
