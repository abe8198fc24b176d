use std::collections::HashMap;

use diesel::{Connection, connection::LoadConnection, sqlite::Sqlite};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::EngineError,
    tournaments::{
        Event,
        config::RandomDrawPolicy,
        matches::{MatchRepr, scores::aggregate::MatchTally},
        points::HalfPoints,
        standings::compute::{
            adjustments::AdjustmentLogs,
            draw::{Draw, Drawer, fetch_persisted_draws, persist_draws},
            metrics::{
                Metric, TeamRecord, base_records, head_to_head::HeadToHead,
                opponents::OpponentsResultComputer,
            },
            tiebreak::TieBreaker,
            trace::TraceEntry,
        },
        teams::Team,
    },
};

pub mod adjustments;
pub mod draw;
pub mod metrics;
pub mod tiebreak;
pub mod trace;

/// Everything the standings of an event are computed from.
#[derive(Clone, Debug)]
pub struct EventRecords {
    pub event: Event,
    pub teams: Vec<Team>,
    /// Completed matches only, with submitted scores only.
    pub matches: Vec<MatchRepr>,
    pub adjustments: AdjustmentLogs,
    pub draw_policy: RandomDrawPolicy,
    /// Stored draws by group key. Empty under the reroll policy.
    pub persisted_draws: HashMap<String, Vec<String>>,
}

impl EventRecords {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<EventRecords, EngineError> {
        let event = Event::fetch(event_id, conn)?;
        let teams = Team::of_event(event_id, conn)?;
        let matches = MatchRepr::completed_of_event(event_id, conn)?;
        let adjustments = AdjustmentLogs::fetch(event_id, conn)?;
        let draw_policy = event.draw_policy();
        let persisted_draws = match draw_policy {
            RandomDrawPolicy::Persist => fetch_persisted_draws(event_id, conn)?,
            RandomDrawPolicy::Reroll => HashMap::new(),
        };

        Ok(EventRecords {
            event,
            teams,
            matches,
            adjustments,
            draw_policy,
            persisted_draws,
        })
    }
}

/// One line of the standings table.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TeamStanding {
    pub rank: usize,
    pub team_id: String,
    pub team_name: String,
    pub wins: i64,
    pub losses: i64,
    pub ties: i64,
    pub votes: HalfPoints,
    pub score_differential: Decimal,
    pub opponents_result: HalfPoints,
    pub total_matches: i64,
}

impl TeamStanding {
    fn new(rank: usize, record: &TeamRecord, team_name: String) -> Self {
        let wins = record.wins.whole_part();
        let ties = i64::from(record.wins.has_half());
        TeamStanding {
            rank,
            team_id: record.team_id.clone(),
            team_name,
            wins,
            losses: record
                .total_matches
                .saturating_sub(wins)
                .saturating_sub(ties)
                .max(0),
            ties,
            votes: record.votes,
            score_differential: record.score_differential,
            opponents_result: record.opponents_result,
            total_matches: record.total_matches,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StandingsReport {
    pub standings: Vec<TeamStanding>,
    pub trace: Vec<TraceEntry>,
    /// Random draws made by this computation which should be stored.
    #[serde(skip)]
    pub new_draws: Vec<Draw>,
}

/// Ranks the teams of an event. Apart from the random draw (which only uses
/// `rng` for tie groups without a stored draw) this is a pure function of
/// `records`. Fails only on stored scores too large to add up.
pub fn compute_standings(
    records: &EventRecords,
    rng: &mut impl Rng,
) -> Result<StandingsReport, EngineError> {
    let mut trace = Vec::new();

    let tallies = records
        .matches
        .iter()
        .map(MatchTally::of)
        .collect::<Result<Vec<_>, _>>()?;

    let mut team_records = base_records(&records.teams, &tallies)?;
    records.adjustments.apply(&mut team_records);

    let mut opponents_result = OpponentsResultComputer.compute(&team_records);
    for record in team_records.values_mut() {
        record.opponents_result = opponents_result
            .remove(&record.team_id)
            .unwrap_or(HalfPoints::ZERO);
    }

    trace.push(TraceEntry::BaseRecords {
        records: team_records.values().cloned().collect(),
    });

    let (mut ranked, excluded): (Vec<&TeamRecord>, Vec<&TeamRecord>) =
        team_records
            .values()
            .partition(|record| record.total_matches > 0);
    if !excluded.is_empty() {
        trace.push(TraceEntry::ExcludedTeams {
            team_ids: excluded.iter().map(|r| r.team_id.clone()).collect(),
        });
    }

    ranked.sort_by(|a, b| {
        b.primary_key()
            .cmp(&a.primary_key())
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    trace.push(TraceEntry::InitialOrder {
        team_ids: ranked.iter().map(|r| r.team_id.clone()).collect(),
    });

    let mut breaker = TieBreaker::new(
        &team_records,
        HeadToHead::new(&tallies),
        Drawer::new(records.draw_policy, &records.persisted_draws, rng),
        &mut trace,
    );
    let mut order = Vec::with_capacity(ranked.len());

    for group in ranked.chunk_by(|a, b| {
        a.wins == b.wins && a.total_matches == b.total_matches
    }) {
        let team_ids = group
            .iter()
            .map(|r| r.team_id.clone())
            .collect::<Vec<_>>();
        match group {
            [first, _, ..] => order.extend(breaker.resolve_tie_group(
                team_ids,
                first.wins,
                first.total_matches,
            )),
            _ => order.extend(team_ids),
        }
    }

    let new_draws = breaker.into_drawer().into_new_draws();
    trace.push(TraceEntry::FinalRanking {
        team_ids: order.clone(),
    });

    let names = records
        .teams
        .iter()
        .map(|team| (team.id.as_str(), team.name.as_str()))
        .collect::<HashMap<_, _>>();

    let standings = order
        .iter()
        .filter_map(|team_id| team_records.get(team_id))
        .enumerate()
        .map(|(i, record)| {
            let name = names
                .get(record.team_id.as_str())
                .map(|name| name.to_string())
                .unwrap_or_default();
            TeamStanding::new(i + 1, record, name)
        })
        .collect();

    Ok(StandingsReport {
        standings,
        trace,
        new_draws,
    })
}

/// Fetches an event's records, ranks its teams, and stores any new random
/// draws (if the event keeps them).
#[tracing::instrument(skip(conn))]
pub fn standings_of_event(
    event_id: &str,
    conn: &mut (impl Connection<Backend = Sqlite> + LoadConnection),
) -> Result<StandingsReport, EngineError> {
    let records = EventRecords::fetch(event_id, conn)?;
    let matches = records.matches.len();

    let mut rng = ChaCha20Rng::from_os_rng();
    let report = rank_and_store(records, &mut rng, conn)?;

    tracing::info!(
        teams = report.standings.len(),
        matches,
        "computed standings"
    );
    Ok(report)
}

/// Ranks the teams of `records` and stores the new draws. When another
/// computation has stored a draw for one of the same tie groups in the
/// meantime, the teams are ranked again with the stored draws, so that the
/// result (and its trace) agrees with every later computation.
pub fn rank_and_store(
    mut records: EventRecords,
    rng: &mut impl Rng,
    conn: &mut (impl Connection<Backend = Sqlite> + LoadConnection),
) -> Result<StandingsReport, EngineError> {
    let report = compute_standings(&records, rng)?;
    if report.new_draws.is_empty() {
        return Ok(report);
    }

    let superseded =
        persist_draws(&records.event.id, &report.new_draws, conn)?;
    if superseded.is_empty() {
        return Ok(report);
    }

    tracing::info!(
        groups = superseded.len(),
        "ranking again with draws stored by another computation"
    );
    records.persisted_draws.extend(
        report
            .new_draws
            .into_iter()
            .chain(superseded)
            .map(|draw| (draw.group_key, draw.order)),
    );
    compute_standings(&records, rng)
}
