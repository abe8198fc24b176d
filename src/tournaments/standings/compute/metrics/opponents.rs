use std::collections::HashMap;

use indexmap::IndexMap;

use crate::tournaments::{
    points::HalfPoints,
    standings::compute::metrics::{Metric, TeamRecord},
};

/// The sum of the wins of every opponent a team has faced, counted once per
/// meeting. Must be computed after all adjustments have been applied to the
/// records.
pub struct OpponentsResultComputer;

impl Metric<HalfPoints> for OpponentsResultComputer {
    fn compute(
        &self,
        records: &IndexMap<String, TeamRecord>,
    ) -> HashMap<String, HalfPoints> {
        records
            .values()
            .map(|record| {
                let result = record
                    .opponent_ids
                    .iter()
                    .filter_map(|opponent| records.get(opponent))
                    .map(|opponent| opponent.wins)
                    .sum();
                (record.team_id.clone(), result)
            })
            .collect()
    }
}
