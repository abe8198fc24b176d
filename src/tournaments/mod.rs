use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::Serialize;

use crate::{
    error::{EngineError, NotFound},
    schema::events,
    tournaments::config::{RandomDrawPolicy, ScoringConfig},
};

pub mod config;
pub mod matches;
pub mod points;
pub mod standings;
pub mod teams;

#[derive(Queryable, Serialize, Clone, Debug)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
    pub scoring_criteria: Option<String>,
    pub random_draw_policy: String,
}

impl Event {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Event, EngineError> {
        events::table
            .filter(events::id.eq(event_id))
            .first::<Event>(conn)
            .optional()?
            .ok_or_else(|| NotFound::Event(event_id.to_string()).into())
    }

    /// The scoring rubric of this event. A malformed rubric is logged and
    /// replaced with the defaults.
    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig::parse_or_default(
            &self.id,
            self.scoring_criteria.as_deref(),
        )
    }

    pub fn draw_policy(&self) -> RandomDrawPolicy {
        RandomDrawPolicy::parse(&self.random_draw_policy).unwrap_or_else(|| {
            tracing::warn!(
                event_id = %self.id,
                policy = %self.random_draw_policy,
                "unknown random draw policy, using the default"
            );
            RandomDrawPolicy::default()
        })
    }
}

/// The number of questions each judge asks in this event's matches. Falls
/// back to [`config::DEFAULT_JUDGE_QUESTIONS`] if the stored configuration is
/// missing or malformed.
pub fn fetch_judge_question_count(
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<u32, EngineError> {
    Ok(Event::fetch(event_id, conn)?
        .scoring_config()
        .judge_question_count())
}
