//! Results of the matches played between the members of a tie group.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::tournaments::{
    matches::scores::aggregate::MatchTally, points::HalfPoints,
};

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct HeadToHeadRecord {
    pub wins: HalfPoints,
    pub votes: HalfPoints,
    pub score_differential: Decimal,
}

pub struct HeadToHead<'a> {
    tallies: &'a [MatchTally],
}

impl<'a> HeadToHead<'a> {
    pub fn new(tallies: &'a [MatchTally]) -> Self {
        HeadToHead { tallies }
    }

    fn between<'g>(
        &self,
        group: &'g [String],
    ) -> impl Iterator<Item = &'a MatchTally> {
        self.tallies.iter().filter(move |tally| {
            group.contains(&tally.team_a_id) && group.contains(&tally.team_b_id)
        })
    }

    /// Pairs of teams in `group` which have never played each other. The
    /// head-to-head steps only apply to a group with no such pairs.
    pub fn unmet_pairs(&self, group: &[String]) -> Vec<(String, String)> {
        let met = self
            .between(group)
            .map(|tally| {
                if tally.team_a_id < tally.team_b_id {
                    (tally.team_a_id.as_str(), tally.team_b_id.as_str())
                } else {
                    (tally.team_b_id.as_str(), tally.team_a_id.as_str())
                }
            })
            .collect::<HashSet<_>>();

        group
            .iter()
            .sorted()
            .tuple_combinations()
            .filter(|(a, b)| !met.contains(&(a.as_str(), b.as_str())))
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect()
    }

    /// The record of each team of `group`, counting only matches played
    /// against other members of `group`.
    pub fn among(&self, group: &[String]) -> HashMap<String, HeadToHeadRecord> {
        let mut records = group
            .iter()
            .map(|team_id| (team_id.clone(), HeadToHeadRecord::default()))
            .collect::<HashMap<_, _>>();

        for tally in self.between(group) {
            for team_id in [&tally.team_a_id, &tally.team_b_id] {
                if let (Some(outcome), Some(record)) =
                    (tally.outcome_for(team_id), records.get_mut(team_id))
                {
                    record.wins += outcome.wins;
                    record.votes += outcome.votes;
                    record.score_differential = record
                        .score_differential
                        .saturating_add(outcome.score_differential);
                }
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::fixtures::{d, single_judge_match};

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn finds_pairs_that_never_met() {
        let tallies = [
            single_judge_match("m1", "A", "B", "80", "75"),
            single_judge_match("m2", "C", "B", "80", "75"),
        ]
        .iter()
        .map(|repr| MatchTally::of(repr).unwrap())
        .collect::<Vec<_>>();
        let h2h = HeadToHead::new(&tallies);

        assert!(h2h.unmet_pairs(&ids(&["B", "A"])).is_empty());
        assert_eq!(
            h2h.unmet_pairs(&ids(&["C", "A", "B"])),
            vec![("A".to_string(), "C".to_string())]
        );
    }

    #[test]
    fn only_counts_matches_inside_the_group() {
        let tallies = [
            single_judge_match("m1", "A", "B", "80", "75"),
            single_judge_match("m2", "B", "A", "79", "78"),
            single_judge_match("m3", "A", "C", "60", "90"),
        ]
        .iter()
        .map(|repr| MatchTally::of(repr).unwrap())
        .collect::<Vec<_>>();

        let among = HeadToHead::new(&tallies).among(&ids(&["A", "B"]));

        assert_eq!(
            among["A"],
            HeadToHeadRecord {
                wins: HalfPoints::ONE,
                votes: HalfPoints::ONE,
                score_differential: d("4"),
            }
        );
        assert_eq!(among["B"].wins, HalfPoints::ONE);
        assert_eq!(among["B"].score_differential, d("-4"));
    }
}
