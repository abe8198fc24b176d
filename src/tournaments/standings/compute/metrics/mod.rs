use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::EngineError,
    tournaments::{
        matches::scores::aggregate::MatchTally, points::HalfPoints,
        teams::Team,
    },
};

pub mod head_to_head;
pub mod opponents;

/// A statistic derived from the records of every team in an event.
pub trait Metric<V> {
    fn compute(
        &self,
        records: &IndexMap<String, TeamRecord>,
    ) -> HashMap<String, V>;
}

/// A value compared by a tie-break step.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(untagged)]
pub enum MetricValue {
    Points(HalfPoints),
    Decimal(Decimal),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Points(points) => write!(f, "{points}"),
            MetricValue::Decimal(decimal) => write!(f, "{decimal}"),
        }
    }
}

/// The accumulated record of one team.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TeamRecord {
    pub team_id: String,
    pub wins: HalfPoints,
    pub votes: HalfPoints,
    pub score_differential: Decimal,
    pub total_matches: i64,
    /// One entry per completed match, so an opponent met twice is listed
    /// twice.
    pub opponent_ids: Vec<String>,
    /// Only known once every team's wins are; see
    /// [`opponents::OpponentsResultComputer`].
    pub opponents_result: HalfPoints,
}

impl TeamRecord {
    pub fn new(team_id: &str) -> Self {
        TeamRecord {
            team_id: team_id.to_string(),
            wins: HalfPoints::ZERO,
            votes: HalfPoints::ZERO,
            score_differential: Decimal::ZERO,
            total_matches: 0,
            opponent_ids: Vec::new(),
            opponents_result: HalfPoints::ZERO,
        }
    }

    /// The key teams are first sorted by (descending).
    pub fn primary_key(&self) -> (HalfPoints, HalfPoints, HalfPoints, Decimal) {
        (
            self.wins,
            self.votes,
            self.opponents_result,
            self.score_differential,
        )
    }
}

/// Accumulates wins, votes, score differential and opponents over the given
/// (completed) matches. Every team of the event gets a record, in the order
/// of `teams`.
pub fn base_records(
    teams: &[Team],
    tallies: &[MatchTally],
) -> Result<IndexMap<String, TeamRecord>, EngineError> {
    let mut records = teams
        .iter()
        .map(|team| (team.id.clone(), TeamRecord::new(&team.id)))
        .collect::<IndexMap<_, _>>();

    for tally in tallies {
        for team_id in [&tally.team_a_id, &tally.team_b_id] {
            let Some(outcome) = tally.outcome_for(team_id) else {
                continue;
            };
            let Some(record) = records.get_mut(team_id) else {
                tracing::warn!(
                    match_id = %tally.match_id,
                    %team_id,
                    "match refers to a team outside of the event"
                );
                continue;
            };

            let overflow = || EngineError::Corrupt {
                what: "team record",
                reason: format!(
                    "the record of team {team_id} overflows at match {}",
                    tally.match_id
                ),
            };
            record.wins =
                record.wins.checked_add(outcome.wins).ok_or_else(overflow)?;
            record.votes =
                record.votes.checked_add(outcome.votes).ok_or_else(overflow)?;
            record.score_differential = record
                .score_differential
                .checked_add(outcome.score_differential)
                .ok_or_else(overflow)?;
            record.total_matches += 1;
            record.opponent_ids.push(outcome.opponent_id);
        }
    }

    Ok(records)
}
