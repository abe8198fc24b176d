//! Orders a group of teams that the primary ranking could not separate.
//!
//! The steps are tried in [`TieBreakStep::CASCADE`] order. The first step
//! under which the group's values differ splits the group; every part that is
//! still tied continues with the steps after that one. The final step, a
//! random draw, always separates the teams.

use std::fmt;

use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;

use crate::tournaments::{
    points::HalfPoints,
    standings::compute::{
        draw::Drawer,
        metrics::{
            MetricValue, TeamRecord,
            head_to_head::{HeadToHead, HeadToHeadRecord},
        },
        trace::{StepValue, TraceEntry},
    },
};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakStep {
    HeadToHeadWins,
    HeadToHeadScoreDifferential,
    HeadToHeadVotes,
    Votes,
    OpponentsResult,
    ScoreDifferential,
    RandomDraw,
}

impl TieBreakStep {
    pub const CASCADE: [TieBreakStep; 7] = [
        TieBreakStep::HeadToHeadWins,
        TieBreakStep::HeadToHeadScoreDifferential,
        TieBreakStep::HeadToHeadVotes,
        TieBreakStep::Votes,
        TieBreakStep::OpponentsResult,
        TieBreakStep::ScoreDifferential,
        TieBreakStep::RandomDraw,
    ];

    /// Head-to-head steps only count matches between members of the group,
    /// and only apply if every pair of members has met.
    pub fn is_head_to_head(self) -> bool {
        matches!(
            self,
            TieBreakStep::HeadToHeadWins
                | TieBreakStep::HeadToHeadScoreDifferential
                | TieBreakStep::HeadToHeadVotes
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TieBreakStep::HeadToHeadWins => "head_to_head_wins",
            TieBreakStep::HeadToHeadScoreDifferential => {
                "head_to_head_score_differential"
            }
            TieBreakStep::HeadToHeadVotes => "head_to_head_votes",
            TieBreakStep::Votes => "votes",
            TieBreakStep::OpponentsResult => "opponents_result",
            TieBreakStep::ScoreDifferential => "score_differential",
            TieBreakStep::RandomDraw => "random_draw",
        }
    }
}

impl fmt::Display for TieBreakStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct TieBreaker<'a, R> {
    records: &'a IndexMap<String, TeamRecord>,
    head_to_head: HeadToHead<'a>,
    drawer: Drawer<'a, R>,
    trace: &'a mut Vec<TraceEntry>,
}

impl<'a, R: Rng> TieBreaker<'a, R> {
    pub fn new(
        records: &'a IndexMap<String, TeamRecord>,
        head_to_head: HeadToHead<'a>,
        drawer: Drawer<'a, R>,
        trace: &'a mut Vec<TraceEntry>,
    ) -> Self {
        TieBreaker {
            records,
            head_to_head,
            drawer,
            trace,
        }
    }

    /// Orders `group`, best first.
    pub fn resolve(&mut self, group: Vec<String>) -> Vec<String> {
        self.resolve_from(group, 0)
    }

    /// Records a tie group found in the primary ordering, then resolves it.
    pub fn resolve_tie_group(
        &mut self,
        group: Vec<String>,
        wins: HalfPoints,
        total_matches: i64,
    ) -> Vec<String> {
        tracing::debug!(?group, %wins, total_matches, "tie group detected");
        self.trace.push(TraceEntry::TieGroupDetected {
            team_ids: group.clone(),
            wins,
            total_matches,
        });
        self.resolve(group)
    }

    pub fn into_drawer(self) -> Drawer<'a, R> {
        self.drawer
    }

    fn resolve_from(&mut self, group: Vec<String>, start: usize) -> Vec<String> {
        let mut head_to_head_applies = true;

        for (index, &step) in TieBreakStep::CASCADE.iter().enumerate().skip(start)
        {
            if step.is_head_to_head() {
                if !head_to_head_applies {
                    continue;
                }
                let unmet_pairs = self.head_to_head.unmet_pairs(&group);
                if !unmet_pairs.is_empty() {
                    tracing::trace!(?group, "head-to-head does not apply");
                    self.trace.push(TraceEntry::HeadToHeadInapplicable {
                        team_ids: group.clone(),
                        unmet_pairs,
                    });
                    head_to_head_applies = false;
                    continue;
                }
            }

            if step == TieBreakStep::RandomDraw {
                return self.draw(group);
            }

            let mut values = self.values(step, &group);
            values.sort_by(|a, b| b.value.cmp(&a.value));

            let runs = values
                .chunk_by(|a, b| a.value == b.value)
                .map(|run| {
                    run.iter().map(|v| v.team_id.clone()).collect::<Vec<_>>()
                })
                .collect::<Vec<_>>();
            let discriminated = runs.len() > 1;

            tracing::trace!(%step, discriminated, "evaluated tie-break step");
            self.trace.push(TraceEntry::StepEvaluated {
                step,
                values,
                discriminated,
            });

            if discriminated {
                let order = runs
                    .into_iter()
                    .flat_map(|run| {
                        if run.len() > 1 {
                            self.resolve_from(run, index + 1)
                        } else {
                            run
                        }
                    })
                    .collect::<Vec<_>>();

                self.trace.push(TraceEntry::TieGroupResolved {
                    order: order.clone(),
                    resolved_by: step,
                });
                return order;
            }
        }

        group
    }

    fn values(&self, step: TieBreakStep, group: &[String]) -> Vec<StepValue> {
        let head_to_head = if step.is_head_to_head() {
            self.head_to_head.among(group)
        } else {
            Default::default()
        };

        group
            .iter()
            .filter_map(|team_id| {
                let record = self.records.get(team_id)?;
                let h2h = head_to_head
                    .get(team_id)
                    .copied()
                    .unwrap_or_else(HeadToHeadRecord::default);

                let value = match step {
                    TieBreakStep::HeadToHeadWins => MetricValue::Points(h2h.wins),
                    TieBreakStep::HeadToHeadScoreDifferential => {
                        MetricValue::Decimal(h2h.score_differential)
                    }
                    TieBreakStep::HeadToHeadVotes => {
                        MetricValue::Points(h2h.votes)
                    }
                    TieBreakStep::Votes => MetricValue::Points(record.votes),
                    TieBreakStep::OpponentsResult => {
                        MetricValue::Points(record.opponents_result)
                    }
                    TieBreakStep::ScoreDifferential
                    | TieBreakStep::RandomDraw => {
                        MetricValue::Decimal(record.score_differential)
                    }
                };

                Some(StepValue {
                    team_id: team_id.clone(),
                    value,
                })
            })
            .collect()
    }

    fn draw(&mut self, group: Vec<String>) -> Vec<String> {
        let (order, source) = self.drawer.draw(&group);
        tracing::debug!(?group, ?order, ?source, "tie group decided by lot");

        self.trace.push(TraceEntry::RandomDraw {
            team_ids: group,
            order: order.clone(),
            source,
        });
        self.trace.push(TraceEntry::TieGroupResolved {
            order: order.clone(),
            resolved_by: TieBreakStep::RandomDraw,
        });
        order
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::tournaments::{
        config::RandomDrawPolicy,
        matches::scores::aggregate::MatchTally,
        standings::compute::draw::{DrawSource, group_key},
    };
    use crate::test::fixtures::{MatchBuilder, d, single_judge_match};

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn records(teams: &[&str]) -> IndexMap<String, TeamRecord> {
        teams
            .iter()
            .map(|id| (id.to_string(), TeamRecord::new(id)))
            .collect()
    }

    /// Runs the cascade over `group`, returning the order and the trace.
    fn resolve(
        records: &IndexMap<String, TeamRecord>,
        tallies: &[MatchTally],
        group: &[&str],
    ) -> (Vec<String>, Vec<TraceEntry>) {
        let persisted = HashMap::new();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut trace = Vec::new();

        let order = TieBreaker::new(
            records,
            HeadToHead::new(tallies),
            Drawer::new(RandomDrawPolicy::Reroll, &persisted, &mut rng),
            &mut trace,
        )
        .resolve(ids(group));
        (order, trace)
    }

    fn evaluated(trace: &[TraceEntry]) -> Vec<(TieBreakStep, bool)> {
        trace
            .iter()
            .filter_map(|entry| match entry {
                TraceEntry::StepEvaluated {
                    step,
                    discriminated,
                    ..
                } => Some((*step, *discriminated)),
                _ => None,
            })
            .collect()
    }

    fn tallies(matches: &[(&str, &str, &str, &str)]) -> Vec<MatchTally> {
        matches
            .iter()
            .enumerate()
            .map(|(i, (a, b, ta, tb))| {
                let repr = single_judge_match(&format!("m{i}"), a, b, ta, tb);
                MatchTally::of(&repr).unwrap()
            })
            .collect()
    }

    #[test]
    fn head_to_head_wins_decide_when_all_have_met() {
        let tallies = tallies(&[
            ("A", "B", "80", "70"),
            ("A", "C", "80", "70"),
            ("B", "C", "80", "70"),
        ]);
        let (order, trace) =
            resolve(&records(&["A", "B", "C"]), &tallies, &["C", "B", "A"]);

        assert_eq!(order, ids(&["A", "B", "C"]));
        assert_eq!(evaluated(&trace), vec![(TieBreakStep::HeadToHeadWins, true)]);
        assert_eq!(
            trace.last(),
            Some(&TraceEntry::TieGroupResolved {
                order: ids(&["A", "B", "C"]),
                resolved_by: TieBreakStep::HeadToHeadWins,
            })
        );
    }

    #[test]
    fn cycle_falls_through_to_head_to_head_differential() {
        // each team beat one other, by different margins
        let tallies = tallies(&[
            ("A", "B", "80", "70"),
            ("B", "C", "80", "75"),
            ("C", "A", "80", "79"),
        ]);
        let (order, trace) =
            resolve(&records(&["A", "B", "C"]), &tallies, &["A", "B", "C"]);

        // A: +10 -1 = 9, B: -10 +5 = -5, C: -5 +1 = -4
        assert_eq!(order, ids(&["A", "C", "B"]));
        assert_eq!(
            evaluated(&trace),
            vec![
                (TieBreakStep::HeadToHeadWins, false),
                (TieBreakStep::HeadToHeadScoreDifferential, true),
            ]
        );
    }

    #[test]
    fn head_to_head_votes_decide_after_wins_and_differential() {
        // one win each and a level differential, but A took 3-0 and B only
        // 2-1
        let tallies = [
            MatchBuilder::new("m1", "A", "B")
                .judge("j1", "71", "70")
                .judge("j2", "71", "70")
                .judge("j3", "71", "70")
                .build(),
            MatchBuilder::new("m2", "B", "A")
                .judge("j1", "72", "70")
                .judge("j2", "72", "70")
                .judge("j3", "70", "71")
                .build(),
        ]
        .iter()
        .map(|repr| MatchTally::of(repr).unwrap())
        .collect::<Vec<_>>();

        let (order, trace) =
            resolve(&records(&["A", "B"]), &tallies, &["B", "A"]);

        assert_eq!(order, ids(&["A", "B"]));
        assert_eq!(
            evaluated(&trace),
            vec![
                (TieBreakStep::HeadToHeadWins, false),
                (TieBreakStep::HeadToHeadScoreDifferential, false),
                (TieBreakStep::HeadToHeadVotes, true),
            ]
        );
        assert!(trace.iter().any(|entry| matches!(
            entry,
            TraceEntry::StepEvaluated {
                step: TieBreakStep::HeadToHeadVotes,
                values,
                ..
            } if values[0].team_id == "A"
                && values[0].value
                    == MetricValue::Points(HalfPoints::from_whole(4))
        )));
    }

    #[test]
    fn split_groups_continue_with_later_steps() {
        let mut records = records(&["A", "B", "C"]);
        records["A"].votes = HalfPoints::from_whole(4);
        records["B"].votes = HalfPoints::from_whole(2);
        records["C"].votes = HalfPoints::from_whole(2);
        records["B"].opponents_result = HalfPoints::from_whole(1);
        records["C"].opponents_result = HalfPoints::from_whole(3);

        let (order, trace) = resolve(&records, &[], &["B", "C", "A"]);

        assert_eq!(order, ids(&["A", "C", "B"]));
        assert_eq!(
            evaluated(&trace),
            vec![
                (TieBreakStep::Votes, true),
                (TieBreakStep::OpponentsResult, true),
            ]
        );
        // the sub-group is resolved (and traced) before the whole group
        let resolved = trace
            .iter()
            .filter_map(|entry| match entry {
                TraceEntry::TieGroupResolved { resolved_by, .. } => {
                    Some(*resolved_by)
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            resolved,
            vec![TieBreakStep::OpponentsResult, TieBreakStep::Votes]
        );
    }

    #[test]
    fn head_to_head_skipped_unless_every_pair_met() {
        let tallies = tallies(&[("A", "B", "90", "60")]);
        let mut records = records(&["A", "B", "C"]);
        records["C"].score_differential = d("1");

        let (order, trace) = resolve(&records, &tallies, &["A", "B", "C"]);

        assert_eq!(order[0], "C");
        assert!(matches!(
            &trace[0],
            TraceEntry::HeadToHeadInapplicable { unmet_pairs, .. }
                if unmet_pairs.len() == 2
        ));
        assert_eq!(
            evaluated(&trace),
            vec![
                (TieBreakStep::Votes, false),
                (TieBreakStep::OpponentsResult, false),
                (TieBreakStep::ScoreDifferential, true),
            ]
        );
        // A and B only have the random draw left
        assert!(trace.iter().any(|entry| matches!(
            entry,
            TraceEntry::RandomDraw { team_ids, .. } if *team_ids == ids(&["A", "B"])
        )));
    }

    #[test]
    fn random_draw_only_after_every_other_step() {
        let (order, trace) = resolve(&records(&["A", "B"]), &[], &["A", "B"]);

        assert_eq!(group_key(&order), "A,B");
        assert_eq!(trace.len(), 6);
        assert!(matches!(trace[0], TraceEntry::HeadToHeadInapplicable { .. }));
        assert_eq!(
            evaluated(&trace),
            vec![
                (TieBreakStep::Votes, false),
                (TieBreakStep::OpponentsResult, false),
                (TieBreakStep::ScoreDifferential, false),
            ]
        );
        assert!(matches!(
            trace[4],
            TraceEntry::RandomDraw {
                source: DrawSource::Fresh,
                ..
            }
        ));
        assert_eq!(
            trace[5],
            TraceEntry::TieGroupResolved {
                order: order.clone(),
                resolved_by: TieBreakStep::RandomDraw,
            }
        );
    }
}
