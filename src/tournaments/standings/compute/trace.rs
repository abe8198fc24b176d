//! A record of every decision made while ranking an event, in the order the
//! decisions were made.

use serde::Serialize;

use crate::tournaments::{
    points::HalfPoints,
    standings::compute::{
        draw::DrawSource,
        metrics::{MetricValue, TeamRecord},
        tiebreak::TieBreakStep,
    },
};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StepValue {
    pub team_id: String,
    pub value: MetricValue,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum TraceEntry {
    /// Every team's record, after adjustments.
    BaseRecords { records: Vec<TeamRecord> },
    /// Teams without a single (completed or adjusted) match.
    ExcludedTeams { team_ids: Vec<String> },
    InitialOrder { team_ids: Vec<String> },
    TieGroupDetected {
        team_ids: Vec<String>,
        wins: HalfPoints,
        total_matches: i64,
    },
    HeadToHeadInapplicable {
        team_ids: Vec<String>,
        unmet_pairs: Vec<(String, String)>,
    },
    StepEvaluated {
        step: TieBreakStep,
        values: Vec<StepValue>,
        discriminated: bool,
    },
    RandomDraw {
        team_ids: Vec<String>,
        order: Vec<String>,
        source: DrawSource,
    },
    TieGroupResolved {
        order: Vec<String>,
        resolved_by: TieBreakStep,
    },
    FinalRanking { team_ids: Vec<String> },
}

impl TraceEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEntry::BaseRecords { .. } => "base_records",
            TraceEntry::ExcludedTeams { .. } => "excluded_teams",
            TraceEntry::InitialOrder { .. } => "initial_order",
            TraceEntry::TieGroupDetected { .. } => "tie_group_detected",
            TraceEntry::HeadToHeadInapplicable { .. } => {
                "head_to_head_inapplicable"
            }
            TraceEntry::StepEvaluated { .. } => "step_evaluated",
            TraceEntry::RandomDraw { .. } => "random_draw",
            TraceEntry::TieGroupResolved { .. } => "tie_group_resolved",
            TraceEntry::FinalRanking { .. } => "final_ranking",
        }
    }
}
