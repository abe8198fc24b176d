//! Random draws between teams that nothing else separates.
//!
//! Under [`RandomDrawPolicy::Persist`] the first draw made for a tie group is
//! stored, and every later computation reuses it for as long as the same
//! teams remain tied.

use std::collections::HashMap;

use chrono::Utc;
use diesel::{
    Connection, connection::LoadConnection, prelude::*, sqlite::Sqlite,
};
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::EngineError, schema::standings_draws,
    tournaments::config::RandomDrawPolicy,
};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrawSource {
    Fresh,
    Persisted,
}

/// An ordering of a tie group, best first.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Draw {
    pub group_key: String,
    pub order: Vec<String>,
}

/// Identifies a tie group independently of the order its teams are given
/// in.
pub fn group_key(team_ids: &[String]) -> String {
    let mut sorted = team_ids.to_vec();
    sorted.sort();
    sorted.join(",")
}

/// The draws stored for an event, by group key. Stored orderings that cannot
/// be read are left out (and will be drawn again).
#[tracing::instrument(skip(conn))]
pub fn fetch_persisted_draws(
    event_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<HashMap<String, Vec<String>>, EngineError> {
    let rows = standings_draws::table
        .filter(standings_draws::event_id.eq(event_id))
        .select((standings_draws::group_key, standings_draws::ordering))
        .load::<(String, String)>(conn)?;

    Ok(rows
        .into_iter()
        .filter_map(|(group_key, ordering)| {
            match serde_json::from_str::<Vec<String>>(&ordering) {
                Ok(order) => Some((group_key, order)),
                Err(e) => {
                    tracing::warn!(%group_key, "unreadable stored draw: {e}");
                    None
                }
            }
        })
        .collect())
}

/// Stores new draws. A draw that another computation stored first for the
/// same group is kept, and ours discarded; those stored draws are returned.
#[tracing::instrument(skip(conn, draws))]
pub fn persist_draws(
    event_id: &str,
    draws: &[Draw],
    conn: &mut (impl Connection<Backend = Sqlite> + LoadConnection),
) -> Result<Vec<Draw>, EngineError> {
    conn.transaction(|conn| -> Result<Vec<Draw>, EngineError> {
        let mut superseded = Vec::new();

        for draw in draws {
            let ordering = serde_json::to_string(&draw.order).map_err(|e| {
                EngineError::Corrupt {
                    what: "draw",
                    reason: e.to_string(),
                }
            })?;

            let inserted = diesel::insert_or_ignore_into(standings_draws::table)
                .values((
                    standings_draws::id.eq(Uuid::now_v7().to_string()),
                    standings_draws::event_id.eq(event_id),
                    standings_draws::group_key.eq(&draw.group_key),
                    standings_draws::ordering.eq(ordering),
                    standings_draws::created_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;
            if inserted > 0 {
                continue;
            }

            let stored = standings_draws::table
                .filter(standings_draws::event_id.eq(event_id))
                .filter(standings_draws::group_key.eq(&draw.group_key))
                .select(standings_draws::ordering)
                .first::<String>(conn)?;
            match serde_json::from_str::<Vec<String>>(&stored) {
                Ok(order) => {
                    tracing::debug!(
                        group_key = %draw.group_key,
                        "draw was already stored by another computation"
                    );
                    superseded.push(Draw {
                        group_key: draw.group_key.clone(),
                        order,
                    });
                }
                Err(e) => tracing::warn!(
                    group_key = %draw.group_key,
                    "unreadable stored draw: {e}"
                ),
            }
        }

        Ok(superseded)
    })
}

/// Decides the order of a tie group by lot.
pub struct Drawer<'a, R> {
    policy: RandomDrawPolicy,
    persisted: &'a HashMap<String, Vec<String>>,
    rng: &'a mut R,
    new_draws: Vec<Draw>,
}

impl<'a, R: Rng> Drawer<'a, R> {
    pub fn new(
        policy: RandomDrawPolicy,
        persisted: &'a HashMap<String, Vec<String>>,
        rng: &'a mut R,
    ) -> Self {
        Drawer {
            policy,
            persisted,
            rng,
            new_draws: Vec::new(),
        }
    }

    /// Orders `team_ids`, reusing a stored draw if the policy allows it and
    /// one exists for exactly these teams.
    pub fn draw(&mut self, team_ids: &[String]) -> (Vec<String>, DrawSource) {
        let key = group_key(team_ids);

        if self.policy == RandomDrawPolicy::Persist {
            if let Some(order) = self.persisted.get(&key) {
                if group_key(order) == key {
                    return (order.clone(), DrawSource::Persisted);
                }
                tracing::warn!(
                    group_key = %key,
                    "stored draw does not match its group, drawing again"
                );
            }
        }

        let mut order = team_ids.to_vec();
        order.sort();
        order.shuffle(self.rng);

        if self.policy == RandomDrawPolicy::Persist {
            self.new_draws.push(Draw {
                group_key: key,
                order: order.clone(),
            });
        }

        (order, DrawSource::Fresh)
    }

    /// Draws made that should be stored.
    pub fn into_new_draws(self) -> Vec<Draw> {
        self.new_draws
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn key_ignores_order() {
        assert_eq!(group_key(&ids(&["B", "C", "A"])), "A,B,C");
        assert_eq!(
            group_key(&ids(&["C", "A", "B"])),
            group_key(&ids(&["A", "B", "C"]))
        );
    }

    #[test]
    fn same_seed_same_draw() {
        let persisted = HashMap::new();
        let group = ids(&["A", "B", "C", "D", "E"]);

        let mut first = ChaCha20Rng::seed_from_u64(11);
        let mut second = ChaCha20Rng::seed_from_u64(11);
        let (a, source) =
            Drawer::new(RandomDrawPolicy::Reroll, &persisted, &mut first)
                .draw(&group);
        // input order does not matter either
        let (b, _) =
            Drawer::new(RandomDrawPolicy::Reroll, &persisted, &mut second)
                .draw(&ids(&["E", "D", "C", "B", "A"]));

        assert_eq!(a, b);
        assert_eq!(source, DrawSource::Fresh);
        assert_eq!(group_key(&a), group_key(&group));
    }

    #[test]
    fn persist_reuses_stored_draws() {
        let persisted = HashMap::from([(
            "A,B".to_string(),
            ids(&["B", "A"]),
        )]);
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let mut drawer =
            Drawer::new(RandomDrawPolicy::Persist, &persisted, &mut rng);
        assert_eq!(
            drawer.draw(&ids(&["A", "B"])),
            (ids(&["B", "A"]), DrawSource::Persisted)
        );
        let (order, source) = drawer.draw(&ids(&["C", "D"]));
        assert_eq!(source, DrawSource::Fresh);

        assert_eq!(
            drawer.into_new_draws(),
            vec![Draw {
                group_key: "C,D".to_string(),
                order,
            }]
        );
    }

    #[test]
    fn reroll_ignores_stored_draws() {
        let persisted = HashMap::from([(
            "A,B".to_string(),
            ids(&["B", "A"]),
        )]);
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let mut drawer =
            Drawer::new(RandomDrawPolicy::Reroll, &persisted, &mut rng);
        let (_, source) = drawer.draw(&ids(&["A", "B"]));
        assert_eq!(source, DrawSource::Fresh);
        assert!(drawer.into_new_draws().is_empty());
    }

    #[test]
    fn stored_draw_for_other_teams_is_ignored() {
        let persisted = HashMap::from([(
            "A,B".to_string(),
            ids(&["A", "C"]),
        )]);
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let (order, source) =
            Drawer::new(RandomDrawPolicy::Persist, &persisted, &mut rng)
                .draw(&ids(&["A", "B"]));
        assert_eq!(source, DrawSource::Fresh);
        assert_eq!(group_key(&order), "A,B");
    }
}
