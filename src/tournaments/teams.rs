use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    error::{EngineError, NotFound},
    schema::event_teams,
};

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub affiliation: Option<String>,
}

impl Team {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        team_id: &str,
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Team, EngineError> {
        event_teams::table
            .filter(
                event_teams::id
                    .eq(team_id)
                    .and(event_teams::event_id.eq(event_id)),
            )
            .first::<Team>(conn)
            .optional()?
            .ok_or_else(|| NotFound::Team(team_id.to_string()).into())
    }

    /// All the teams of an event, ordered by name.
    #[tracing::instrument(skip(conn))]
    pub fn of_event(
        event_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<Team>, EngineError> {
        Ok(event_teams::table
            .filter(event_teams::event_id.eq(event_id))
            .order_by((event_teams::name.asc(), event_teams::id.asc()))
            .load::<Team>(conn)?)
    }
}
