use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

use crate::error::ValidationError;

/// Used when an event has no (or an unreadable) scoring configuration.
pub const DEFAULT_JUDGE_QUESTIONS: u32 = 3;

/// Upper bound on the number of questions each judge may ask.
pub const MAX_JUDGE_QUESTIONS: u32 = 20;

/// Upper bound on the points given for a single criterion or judge question.
pub const MAX_POINTS: u32 = 1000;

/// The scoring rubric of an event, stored as JSON in
/// `events.scoring_criteria`, e.g.
///
/// ```json
/// {"criteria": ["argument", "clarity", "respect"], "judgeQuestions": 3}
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Names of the rubric criteria. When empty, any criterion name is
    /// accepted.
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub judge_questions: Option<u32>,
}

#[derive(Debug)]
pub enum ScoringConfigError {
    Missing,
    Json(serde_json::Error),
    OutOfRange(ValidationError),
}

impl fmt::Display for ScoringConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringConfigError::Missing => f.write_str("no scoring configuration"),
            ScoringConfigError::Json(e) => write!(f, "invalid JSON: {e}"),
            ScoringConfigError::OutOfRange(e) => write!(f, "{e}"),
        }
    }
}

impl ScoringConfig {
    pub fn parse(raw: Option<&str>) -> Result<Self, ScoringConfigError> {
        let raw = raw
            .filter(|raw| !raw.trim().is_empty())
            .ok_or(ScoringConfigError::Missing)?;
        let config: ScoringConfig =
            serde_json::from_str(raw).map_err(ScoringConfigError::Json)?;

        if let Some(count) = config.judge_questions
            && count > MAX_JUDGE_QUESTIONS
        {
            return Err(ScoringConfigError::OutOfRange(
                ValidationError::JudgeQuestionCountOutOfRange {
                    count,
                    max: MAX_JUDGE_QUESTIONS,
                },
            ));
        }

        Ok(config)
    }

    pub fn judge_question_count(&self) -> u32 {
        self.judge_questions.unwrap_or(DEFAULT_JUDGE_QUESTIONS)
    }

    /// Reads the configuration, falling back to the defaults (and logging a
    /// warning) when it is missing or malformed.
    pub fn parse_or_default(event_id: &str, raw: Option<&str>) -> Self {
        match Self::parse(raw) {
            Ok(config) => config,
            Err(ScoringConfigError::Missing) => Self::default(),
            Err(e) => {
                tracing::warn!(
                    event_id,
                    "scoring configuration is malformed ({e}), using {} judge questions",
                    DEFAULT_JUDGE_QUESTIONS
                );
                Self::default()
            }
        }
    }
}

/// What happens when the tie-break cascade runs out of criteria and has to
/// order teams at random.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RandomDrawPolicy {
    /// The first draw for a group of tied teams is stored, and reused by every
    /// later computation for the same group.
    #[default]
    Persist,
    /// Every computation draws again.
    Reroll,
}

impl RandomDrawPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RandomDrawPolicy::Persist => "persist",
            RandomDrawPolicy::Reroll => "reroll",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "persist" => Some(RandomDrawPolicy::Persist),
            "reroll" => Some(RandomDrawPolicy::Reroll),
            _ => None,
        }
    }
}

impl fmt::Display for RandomDrawPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RandomDrawPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RandomDrawPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PolicyVisitor;

        impl Visitor<'_> for PolicyVisitor {
            type Value = RandomDrawPolicy;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("either \"persist\" or \"reroll\"")
            }

            fn visit_str<E>(self, value: &str) -> Result<RandomDrawPolicy, E>
            where
                E: de::Error,
            {
                RandomDrawPolicy::parse(value).ok_or_else(|| {
                    E::unknown_variant(value, &["persist", "reroll"])
                })
            }
        }

        deserializer.deserialize_str(PolicyVisitor)
    }
}
