//! The stages a match passes through.
//!
//! The sequence is generated from the number of judge questions configured
//! for the event, so that count is a free parameter rather than something
//! baked into the set of stage names.

use std::{fmt, str::FromStr};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

use crate::error::ValidationError;

/// The fixed part of a match: the moderator introduces each half, and the
/// teams present, comment on and respond to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PresentationStage {
    Moderator1,
    TeamAPresentation,
    TeamBCommentary,
    TeamAResponse,
    Moderator2,
    TeamBPresentation,
    TeamACommentary,
    TeamBResponse,
}

impl PresentationStage {
    pub const ALL: [PresentationStage; 8] = [
        PresentationStage::Moderator1,
        PresentationStage::TeamAPresentation,
        PresentationStage::TeamBCommentary,
        PresentationStage::TeamAResponse,
        PresentationStage::Moderator2,
        PresentationStage::TeamBPresentation,
        PresentationStage::TeamACommentary,
        PresentationStage::TeamBResponse,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            PresentationStage::Moderator1 => "moderator_1",
            PresentationStage::TeamAPresentation => "team_a_presentation",
            PresentationStage::TeamBCommentary => "team_b_commentary",
            PresentationStage::TeamAResponse => "team_a_response",
            PresentationStage::Moderator2 => "moderator_2",
            PresentationStage::TeamBPresentation => "team_b_presentation",
            PresentationStage::TeamACommentary => "team_a_commentary",
            PresentationStage::TeamBResponse => "team_b_response",
        }
    }
}

/// Which of the two judge slots of the two-judge protocol asks a question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JudgeOrdinal {
    First,
    Second,
}

impl JudgeOrdinal {
    pub const ALL: [JudgeOrdinal; 2] = [JudgeOrdinal::First, JudgeOrdinal::Second];

    pub fn number(&self) -> u32 {
        match self {
            JudgeOrdinal::First => 1,
            JudgeOrdinal::Second => 2,
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(JudgeOrdinal::First),
            2 => Some(JudgeOrdinal::Second),
            _ => None,
        }
    }
}

/// A stage of a match.
///
/// The derived ordering is the order in which a match moves through its
/// stages, for any judge-question count: presentation stages in sequence,
/// then every question of the first judge, then every question of the
/// second judge, then final scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Draft,
    Presentation(PresentationStage),
    /// `question` is 1-based.
    JudgeQuestion { judge: JudgeOrdinal, question: u32 },
    FinalScoring,
    Completed,
}

impl Stage {
    /// Whether this stage occurs in a match with `judge_questions` judge
    /// questions.
    pub fn exists_with(&self, judge_questions: u32) -> bool {
        match self {
            Stage::JudgeQuestion { question, .. } => {
                (1..=judge_questions).contains(question)
            }
            _ => true,
        }
    }

    /// Drafts of scores may be saved from the first moderator stage up to and
    /// including final scoring.
    pub fn is_scoring_window(&self) -> bool {
        matches!(
            self,
            Stage::Presentation(_)
                | Stage::JudgeQuestion { .. }
                | Stage::FinalScoring
        )
    }

    /// Scores may only be finalized once the match has reached final scoring.
    pub fn is_submission_window(&self) -> bool {
        self.is_scoring_window() && *self >= Stage::FinalScoring
    }

    /// Whether match results can be aggregated at this stage.
    pub fn is_scoreable(&self) -> bool {
        *self >= Stage::FinalScoring
    }
}

/// Every stage of a match with `judge_questions` judge questions, in order.
pub fn valid_stages(judge_questions: u32) -> Vec<Stage> {
    let mut stages = Vec::with_capacity(11 + 2 * judge_questions as usize);
    stages.push(Stage::Draft);
    stages.extend(PresentationStage::ALL.into_iter().map(Stage::Presentation));
    for judge in JudgeOrdinal::ALL {
        stages.extend(
            (1..=judge_questions)
                .map(|question| Stage::JudgeQuestion { judge, question }),
        );
    }
    stages.push(Stage::FinalScoring);
    stages.push(Stage::Completed);
    stages
}

/// The stages a match at `current` may move to. A draft match may not jump
/// straight to completion, and a completed match cannot move at all.
pub fn next_allowed_stages(current: Stage, judge_questions: u32) -> Vec<Stage> {
    valid_stages(judge_questions)
        .into_iter()
        .filter(|stage| *stage > current)
        .filter(|stage| {
            !(current == Stage::Draft && *stage == Stage::Completed)
        })
        .collect()
}

/// Checks the ordering rules of a transition. Callers are responsible for
/// checking the actor, and for validating completion when `requested` is
/// [`Stage::Completed`].
pub fn check_transition(
    current: Stage,
    requested: Stage,
    judge_questions: u32,
) -> Result<(), ValidationError> {
    if current == Stage::Completed {
        return Err(ValidationError::MatchCompleted);
    }
    if !requested.exists_with(judge_questions) {
        return Err(ValidationError::StageNotInEvent {
            stage: requested,
            judge_questions,
        });
    }
    if requested < current {
        return Err(ValidationError::BackwardTransition {
            from: current,
            to: requested,
        });
    }
    if requested == current {
        return Err(ValidationError::RepeatedStage { stage: requested });
    }
    if current == Stage::Draft && requested == Stage::Completed {
        return Err(ValidationError::DraftToCompleted);
    }
    Ok(())
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Draft => f.write_str("draft"),
            Stage::Presentation(p) => f.write_str(p.as_str()),
            Stage::JudgeQuestion { judge, question } => {
                write!(f, "judge_{}_{question}", judge.number())
            }
            Stage::FinalScoring => f.write_str("final_scoring"),
            Stage::Completed => f.write_str("completed"),
        }
    }
}

impl FromStr for Stage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ValidationError::UnknownStage {
            stage: s.to_string(),
        };

        match s {
            "draft" => return Ok(Stage::Draft),
            "final_scoring" => return Ok(Stage::FinalScoring),
            "completed" => return Ok(Stage::Completed),
            _ => (),
        }

        if let Some(p) = PresentationStage::ALL.iter().find(|p| p.as_str() == s)
        {
            return Ok(Stage::Presentation(*p));
        }

        let (judge, question) = s
            .strip_prefix("judge_")
            .and_then(|rest| rest.split_once('_'))
            .ok_or_else(unknown)?;
        let judge = judge
            .parse::<i64>()
            .ok()
            .and_then(JudgeOrdinal::from_number)
            .ok_or_else(unknown)?;
        let question = question.parse::<u32>().map_err(|_| unknown())?;
        if question == 0 {
            return Err(unknown());
        }

        Ok(Stage::JudgeQuestion { judge, question })
    }
}

impl Serialize for Stage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StageVisitor;

        impl Visitor<'_> for StageVisitor {
            type Value = Stage;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string naming a match stage")
            }

            fn visit_str<E>(self, value: &str) -> Result<Stage, E>
            where
                E: de::Error,
            {
                value.parse().map_err(|e: ValidationError| E::custom(e))
            }
        }

        deserializer.deserialize_str(StageVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(judge: JudgeOrdinal, question: u32) -> Stage {
        Stage::JudgeQuestion { judge, question }
    }

    #[test]
    fn sequence_is_generated_from_question_count() {
        let stages = valid_stages(3);
        assert_eq!(stages.len(), 17);
        assert_eq!(stages.first(), Some(&Stage::Draft));
        assert_eq!(
            stages[1],
            Stage::Presentation(PresentationStage::Moderator1)
        );
        assert_eq!(stages[9], q(JudgeOrdinal::First, 1));
        assert_eq!(stages[11], q(JudgeOrdinal::First, 3));
        assert_eq!(stages[12], q(JudgeOrdinal::Second, 1));
        assert_eq!(stages[15], Stage::FinalScoring);
        assert_eq!(stages.last(), Some(&Stage::Completed));

        // the derived ordering agrees with the generated sequence
        assert!(stages.windows(2).all(|w| w[0] < w[1]));

        let none = valid_stages(0);
        assert_eq!(none.len(), 11);
        assert!(
            !none.iter().any(|s| matches!(s, Stage::JudgeQuestion { .. }))
        );
    }

    #[test]
    fn scoring_window_is_asymmetric() {
        assert!(!Stage::Draft.is_scoring_window());
        assert!(!Stage::Completed.is_scoring_window());
        assert!(
            Stage::Presentation(PresentationStage::Moderator1)
                .is_scoring_window()
        );
        assert!(q(JudgeOrdinal::Second, 2).is_scoring_window());
        assert!(Stage::FinalScoring.is_scoring_window());

        assert!(!q(JudgeOrdinal::Second, 2).is_submission_window());
        assert!(Stage::FinalScoring.is_submission_window());
        assert!(!Stage::Completed.is_submission_window());
    }

    #[test]
    fn draft_cannot_skip_to_completed() {
        let next = next_allowed_stages(Stage::Draft, 2);
        assert_eq!(next.len(), 13);
        assert!(!next.contains(&Stage::Completed));
        assert!(next.contains(&Stage::FinalScoring));

        assert_eq!(
            check_transition(Stage::Draft, Stage::Completed, 2),
            Err(ValidationError::DraftToCompleted)
        );
    }

    #[test]
    fn no_backward_or_repeated_moves() {
        let current = q(JudgeOrdinal::First, 2);
        assert_eq!(
            check_transition(
                current,
                Stage::Presentation(PresentationStage::TeamBResponse),
                3
            ),
            Err(ValidationError::BackwardTransition {
                from: current,
                to: Stage::Presentation(PresentationStage::TeamBResponse),
            })
        );
        assert_eq!(
            check_transition(current, current, 3),
            Err(ValidationError::RepeatedStage { stage: current })
        );
        assert!(check_transition(current, q(JudgeOrdinal::Second, 1), 3).is_ok());
        assert!(check_transition(current, Stage::Completed, 3).is_ok());
    }

    #[test]
    fn completed_is_terminal() {
        assert!(next_allowed_stages(Stage::Completed, 3).is_empty());
        assert_eq!(
            check_transition(Stage::Completed, Stage::Completed, 3),
            Err(ValidationError::MatchCompleted)
        );
    }

    #[test]
    fn questions_beyond_configuration_are_rejected() {
        assert_eq!(
            check_transition(Stage::FinalScoring, q(JudgeOrdinal::First, 4), 3)
                .unwrap_err(),
            ValidationError::StageNotInEvent {
                stage: q(JudgeOrdinal::First, 4),
                judge_questions: 3
            }
        );
        assert!(!next_allowed_stages(Stage::Draft, 3)
            .contains(&q(JudgeOrdinal::First, 4)));
    }

    #[test]
    fn persisted_names_parse_back() {
        for stage in valid_stages(4) {
            assert_eq!(stage.to_string().parse::<Stage>(), Ok(stage));
        }

        for bad in ["judge_3_1", "judge_1_0", "judge_1", "moderator", ""] {
            assert!(bad.parse::<Stage>().is_err(), "{bad} parsed");
        }

        let json = serde_json::to_string(&q(JudgeOrdinal::Second, 3)).unwrap();
        assert_eq!(json, "\"judge_2_3\"");
        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q(JudgeOrdinal::Second, 3));
    }
}
