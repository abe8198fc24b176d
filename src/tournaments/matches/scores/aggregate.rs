//! Turns the scores of a match into its result.
//!
//! Each judge who has submitted a score for both teams casts a vote for the
//! team they scored higher (half a vote each if they scored the teams
//! equally). Under the two-judge protocol a third, virtual judge is added,
//! whose totals are the average of the two real judges' totals.

use std::cmp::Ordering;

use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::{EngineError, ValidationError},
    tournaments::{matches::MatchRepr, points::HalfPoints},
};

/// One real judge's totals for the two teams of a match.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct JudgeTotals {
    pub judge_id: String,
    pub team_a: Decimal,
    pub team_b: Decimal,
}

/// The synthesized third judge of the two-judge protocol. This only ever
/// exists as the result of [`synthesize_virtual_judge`]; it is never stored
/// and never listed among the judges of a match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualJudge {
    pub team_a: Decimal,
    pub team_b: Decimal,
}

/// `None` if the mean of the two judges' totals cannot be represented.
pub fn synthesize_virtual_judge(
    first: &JudgeTotals,
    second: &JudgeTotals,
) -> Option<VirtualJudge> {
    let mean =
        |x: Decimal, y: Decimal| x.checked_add(y)?.checked_div(Decimal::TWO);
    Some(VirtualJudge {
        team_a: mean(first.team_a, second.team_a)?,
        team_b: mean(first.team_b, second.team_b)?,
    })
}

/// The vote one judge gives to the team with total `own`, against a team
/// with total `other`.
pub fn vote(own: Decimal, other: Decimal) -> HalfPoints {
    match own.cmp(&other) {
        Ordering::Greater => HalfPoints::ONE,
        Ordering::Equal => HalfPoints::HALF,
        Ordering::Less => HalfPoints::ZERO,
    }
}

/// The aggregated result of a match, from the point of view of team A.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchTally {
    pub match_id: String,
    pub team_a_id: String,
    pub team_b_id: String,
    /// Judges who submitted scores for both teams, in panel order.
    pub judges: Vec<JudgeTotals>,
    pub virtual_judge: Option<VirtualJudge>,
    pub votes_a: HalfPoints,
    pub votes_b: HalfPoints,
    /// Sum over counted judges of (team A total - team B total).
    pub differential_a: Decimal,
}

/// A match result from the perspective of one of its teams.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    pub team_id: String,
    pub opponent_id: String,
    /// 1 for a win, 0.5 for a tie, 0 for a loss.
    pub wins: HalfPoints,
    pub votes: HalfPoints,
    pub score_differential: Decimal,
}

impl MatchTally {
    /// Fails with [`EngineError::Corrupt`] if the stored scores are too large
    /// to be added up.
    pub fn of(repr: &MatchRepr) -> Result<Self, EngineError> {
        let fixture = &repr.fixture;
        let overflow = || EngineError::Corrupt {
            what: "match scores",
            reason: format!("the totals of match {} overflow", fixture.id),
        };

        let judges = repr
            .judges
            .iter()
            .map(|assignment| assignment.judge_id.as_str())
            .unique()
            .filter_map(|judge_id| {
                let a = repr.submitted_score(judge_id, &fixture.team_a_id)?;
                let b = repr.submitted_score(judge_id, &fixture.team_b_id)?;
                Some((judge_id, a, b))
            })
            .map(|(judge_id, a, b)| {
                Ok(JudgeTotals {
                    judge_id: judge_id.to_string(),
                    team_a: a.sheet.total().ok_or_else(overflow)?,
                    team_b: b.sheet.total().ok_or_else(overflow)?,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let virtual_judge = match judges.as_slice() {
            [first, second] if repr.judges.len() == 2 => Some(
                synthesize_virtual_judge(first, second).ok_or_else(overflow)?,
            ),
            _ => None,
        };

        let (votes_a, votes_b, differential_a) = judges
            .iter()
            .map(|j| (j.team_a, j.team_b))
            .chain(virtual_judge.map(|v| (v.team_a, v.team_b)))
            .try_fold(
                (HalfPoints::ZERO, HalfPoints::ZERO, Decimal::ZERO),
                |(votes_a, votes_b, diff), (a, b)| {
                    let diff = diff.checked_add(a.checked_sub(b)?)?;
                    Some((votes_a + vote(a, b), votes_b + vote(b, a), diff))
                },
            )
            .ok_or_else(overflow)?;

        tracing::trace!(
            match_id = %fixture.id,
            judges = judges.len(),
            virtual_judge = virtual_judge.is_some(),
            %votes_a,
            %votes_b,
            "tallied match"
        );

        Ok(MatchTally {
            match_id: fixture.id.clone(),
            team_a_id: fixture.team_a_id.clone(),
            team_b_id: fixture.team_b_id.clone(),
            judges,
            virtual_judge,
            votes_a,
            votes_b,
            differential_a,
        })
    }

    /// The number of votes cast, including the virtual judge's.
    pub fn counted_judges(&self) -> usize {
        self.judges.len() + usize::from(self.virtual_judge.is_some())
    }

    /// The team with strictly more votes, or `None` for a tie.
    pub fn winner(&self) -> Option<&str> {
        match self.votes_a.cmp(&self.votes_b) {
            Ordering::Greater => Some(&self.team_a_id),
            Ordering::Less => Some(&self.team_b_id),
            Ordering::Equal => None,
        }
    }

    pub fn outcome_for(&self, team_id: &str) -> Option<MatchOutcome> {
        let (opponent_id, votes, opponent_votes, differential) =
            if team_id == self.team_a_id {
                (&self.team_b_id, self.votes_a, self.votes_b, self.differential_a)
            } else if team_id == self.team_b_id {
                (&self.team_a_id, self.votes_b, self.votes_a, -self.differential_a)
            } else {
                return None;
            };

        let wins = match votes.cmp(&opponent_votes) {
            Ordering::Greater => HalfPoints::ONE,
            Ordering::Equal => HalfPoints::HALF,
            Ordering::Less => HalfPoints::ZERO,
        };

        Some(MatchOutcome {
            team_id: team_id.to_string(),
            opponent_id: opponent_id.clone(),
            wins,
            votes,
            score_differential: differential,
        })
    }
}

/// The result of a match for `perspective_team_id`. The match must have
/// reached final scoring.
pub fn compute_match_outcome(
    repr: &MatchRepr,
    perspective_team_id: &str,
) -> Result<MatchOutcome, EngineError> {
    if !repr.fixture.stage.is_scoreable() {
        return Err(ValidationError::NotScoreable {
            stage: repr.fixture.stage,
        }
        .into());
    }

    MatchTally::of(repr)?
        .outcome_for(perspective_team_id)
        .ok_or_else(|| {
            ValidationError::TeamNotInMatch {
                match_id: repr.fixture.id.clone(),
                team_id: perspective_team_id.to_string(),
            }
            .into()
        })
}

/// Checks that every judge assigned to the match has submitted a score for
/// both teams.
pub fn validate_completion(repr: &MatchRepr) -> Result<(), ValidationError> {
    if repr.judges.is_empty() {
        return Err(ValidationError::NoJudgesAssigned {
            match_id: repr.fixture.id.clone(),
        });
    }

    let fixture = &repr.fixture;
    for assignment in &repr.judges {
        for team_id in [&fixture.team_a_id, &fixture.team_b_id] {
            if repr.submitted_score(&assignment.judge_id, team_id).is_none() {
                return Err(ValidationError::MissingScore {
                    judge_id: assignment.judge_id.clone(),
                    team_id: team_id.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::fixtures::{MatchBuilder, d},
        tournaments::matches::stages::Stage,
    };

    #[test]
    fn two_judges_get_a_virtual_third() {
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", "80", "75")
            .judge("j2", "78", "77")
            .build();

        let tally = MatchTally::of(&repr).unwrap();
        assert_eq!(
            tally.virtual_judge,
            Some(VirtualJudge {
                team_a: d("79"),
                team_b: d("76"),
            })
        );
        assert_eq!(tally.votes_a, HalfPoints::from_whole(3));
        assert_eq!(tally.votes_b, HalfPoints::ZERO);
        assert_eq!(tally.differential_a, d("9"));
        assert_eq!(tally.winner(), Some("X"));

        // the virtual judge is not listed with the real ones
        assert_eq!(tally.judges.len(), 2);
        assert_eq!(tally.counted_judges(), 3);
    }

    #[test]
    fn split_panel_is_decided_by_the_virtual_judge() {
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", "70", "80")
            .judge("j2", "90", "75")
            .build();

        let tally = MatchTally::of(&repr).unwrap();
        // virtual: 80 vs 77.5
        assert_eq!(tally.votes_a, HalfPoints::from_whole(2));
        assert_eq!(tally.votes_b, HalfPoints::from_whole(1));
        assert_eq!(tally.votes_a + tally.votes_b, HalfPoints::from_whole(3));

        let y = tally.outcome_for("Y").unwrap();
        assert_eq!(y.wins, HalfPoints::ZERO);
        assert_eq!(y.votes, HalfPoints::ONE);
        assert_eq!(y.score_differential, d("-7.5"));
    }

    #[test]
    fn equal_totals_split_the_vote() {
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", "80", "80")
            .build();

        let tally = MatchTally::of(&repr).unwrap();
        assert_eq!(tally.virtual_judge, None);
        assert_eq!(tally.votes_a, HalfPoints::HALF);
        assert_eq!(tally.votes_b, HalfPoints::HALF);
        assert_eq!(tally.winner(), None);
        assert_eq!(tally.outcome_for("X").unwrap().wins, HalfPoints::HALF);
    }

    #[test]
    fn no_virtual_judge_for_larger_panels() {
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", "80", "75")
            .judge("j2", "70", "75")
            .judge("j3", "81", "75")
            .build();

        let tally = MatchTally::of(&repr).unwrap();
        assert_eq!(tally.virtual_judge, None);
        assert_eq!(tally.counted_judges(), 3);
        assert_eq!(tally.votes_a + tally.votes_b, HalfPoints::from_whole(3));
        assert_eq!(tally.votes_a, HalfPoints::from_whole(2));
    }

    #[test]
    fn no_virtual_judge_when_a_submission_is_missing() {
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", "80", "75")
            .judge_only_a("j2", "78")
            .build();

        let tally = MatchTally::of(&repr).unwrap();
        assert_eq!(tally.virtual_judge, None);
        assert_eq!(tally.counted_judges(), 1);
        assert_eq!(tally.votes_a, HalfPoints::ONE);
    }

    #[test]
    fn draft_scores_are_not_counted() {
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", "80", "75")
            .draft_judge("j2", "60", "90")
            .build();

        let tally = MatchTally::of(&repr).unwrap();
        assert_eq!(tally.counted_judges(), 1);
        assert_eq!(tally.votes_b, HalfPoints::ZERO);
    }

    #[test]
    fn outcome_requires_a_scoreable_stage() {
        let repr = MatchBuilder::new("m1", "X", "Y")
            .stage(Stage::Draft)
            .judge("j1", "80", "75")
            .build();
        assert!(matches!(
            compute_match_outcome(&repr, "X"),
            Err(EngineError::Validation(ValidationError::NotScoreable { .. }))
        ));

        let repr = MatchBuilder::new("m1", "X", "Y")
            .stage(Stage::FinalScoring)
            .judge("j1", "80", "75")
            .build();
        assert_eq!(
            compute_match_outcome(&repr, "X").unwrap().wins,
            HalfPoints::ONE
        );
        assert!(matches!(
            compute_match_outcome(&repr, "Z"),
            Err(EngineError::Validation(ValidationError::TeamNotInMatch { .. }))
        ));
    }

    #[test]
    fn completion_names_the_missing_judge_and_team() {
        let repr = MatchBuilder::new("m1", "A", "B")
            .judge("j1", "80", "75")
            .judge_only_a("j2", "78")
            .build();

        assert_eq!(
            validate_completion(&repr),
            Err(ValidationError::MissingScore {
                judge_id: "j2".to_string(),
                team_id: "B".to_string(),
            })
        );
    }

    #[test]
    fn completion_requires_judges() {
        let repr = MatchBuilder::new("m1", "A", "B").build();
        assert_eq!(
            validate_completion(&repr),
            Err(ValidationError::NoJudgesAssigned {
                match_id: "m1".to_string()
            })
        );

        let repr = MatchBuilder::new("m1", "A", "B")
            .judge("j1", "1", "2")
            .build();
        assert_eq!(validate_completion(&repr), Ok(()));
    }

    #[test]
    fn overflowing_scores_are_reported_not_panicked_on() {
        let max = "79228162514264337593543950335";

        // the virtual judge's mean
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", max, "70")
            .judge("j2", max, "75")
            .build();
        assert!(matches!(
            MatchTally::of(&repr),
            Err(EngineError::Corrupt { .. })
        ));

        // the score differential
        let repr = MatchBuilder::new("m1", "X", "Y")
            .judge("j1", max, "-1")
            .build();
        assert!(matches!(
            compute_match_outcome(&repr, "X"),
            Err(EngineError::Corrupt { .. })
        ));
    }
}
