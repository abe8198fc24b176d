use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub mod aggregate;
pub mod submit;

#[derive(Queryable, Clone, Debug)]
pub struct ScoreRow {
    pub id: String,
    pub match_id: String,
    pub judge_id: String,
    pub team_id: String,
    pub criteria: String,
    pub judge_questions: String,
    pub notes: String,
    pub is_submitted: bool,
    pub updated_at: NaiveDateTime,
}

/// What a judge records for one team.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSheet {
    /// Points for each named rubric criterion.
    #[serde(default)]
    pub criteria: BTreeMap<String, Decimal>,
    /// Points for each judge question, in the order the questions were
    /// asked.
    #[serde(default)]
    pub judge_questions: Vec<Decimal>,
    #[serde(default)]
    pub notes: String,
}

impl ScoreSheet {
    /// The judge's total for the team: the sum of the criteria, plus the
    /// *mean* of the judge question points (zero if there are none).
    ///
    /// `None` if the total does not fit in a [`Decimal`].
    pub fn total(&self) -> Option<Decimal> {
        let criteria = checked_sum(self.criteria.values())?;
        let questions = if self.judge_questions.is_empty() {
            Decimal::ZERO
        } else {
            checked_sum(&self.judge_questions)?
                .checked_div(Decimal::from(self.judge_questions.len()))?
        };
        criteria.checked_add(questions)
    }
}

fn checked_sum<'a>(
    values: impl IntoIterator<Item = &'a Decimal>,
) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(*value))
}

/// A judge's score for one team in one match. At most one exists per
/// (match, judge, team).
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub id: String,
    pub match_id: String,
    pub judge_id: String,
    pub team_id: String,
    #[serde(flatten)]
    pub sheet: ScoreSheet,
    pub is_submitted: bool,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<ScoreRow> for Score {
    type Error = EngineError;

    fn try_from(row: ScoreRow) -> Result<Self, Self::Error> {
        let corrupt = |e: serde_json::Error| EngineError::Corrupt {
            what: "score sheet",
            reason: format!("score {}: {e}", row.id),
        };

        let criteria = serde_json::from_str(&row.criteria).map_err(corrupt)?;
        let judge_questions =
            serde_json::from_str(&row.judge_questions).map_err(corrupt)?;

        Ok(Score {
            sheet: ScoreSheet {
                criteria,
                judge_questions,
                notes: row.notes,
            },
            id: row.id,
            match_id: row.match_id,
            judge_id: row.judge_id,
            team_id: row.team_id,
            is_submitted: row.is_submitted,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn judge_questions_are_averaged_not_summed() {
        let sheet = ScoreSheet {
            criteria: BTreeMap::from([
                ("argument".to_string(), d("20")),
                ("clarity".to_string(), d("15")),
            ]),
            judge_questions: vec![d("4"), d("5"), d("6")],
            notes: String::new(),
        };
        assert_eq!(sheet.total(), Some(d("40")));
    }

    #[test]
    fn no_judge_questions_contribute_nothing() {
        let sheet = ScoreSheet {
            criteria: BTreeMap::from([("argument".to_string(), d("12.5"))]),
            ..Default::default()
        };
        assert_eq!(sheet.total(), Some(d("12.5")));
        assert_eq!(ScoreSheet::default().total(), Some(Decimal::ZERO));
    }

    #[test]
    fn accepts_numbers_and_strings() {
        let sheet: ScoreSheet = serde_json::from_str(
            r#"{"criteria": {"argument": 20, "clarity": "7.5"}, "judgeQuestions": [3, 4.5]}"#,
        )
        .unwrap();
        assert_eq!(sheet.criteria["clarity"], d("7.5"));
        assert_eq!(sheet.total(), Some(d("31.25")));
    }

    #[test]
    fn total_that_overflows_is_none() {
        let sheet = ScoreSheet {
            criteria: BTreeMap::from([
                ("argument".to_string(), Decimal::MAX),
                ("clarity".to_string(), Decimal::MAX),
            ]),
            ..Default::default()
        };
        assert_eq!(sheet.total(), None);

        let sheet = ScoreSheet {
            judge_questions: vec![Decimal::MAX, Decimal::MAX],
            ..Default::default()
        };
        assert_eq!(sheet.total(), None);
    }
}
