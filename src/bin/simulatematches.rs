//! Simulates an event: pairs teams at random for a number of rounds, has
//! every judge submit scores, completes the matches and prints the
//! standings.

use std::collections::BTreeMap;

use benchtab::{
    MIGRATIONS,
    permission::Actor,
    schema::{event_matches, event_teams, events, match_judges},
    tournaments::{
        matches::{
            manage::request_stage_transition,
            scores::{
                ScoreSheet,
                submit::{ScoreSubmission, save_score},
            },
            stages::Stage,
        },
        standings::compute::standings_of_event,
    },
};
use clap::Parser;
use diesel::{SqliteConnection, prelude::*};
use diesel_migrations::MigrationHarness;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Parser)]
pub struct Simulate {
    /// Defaults to `DATABASE_URL`, then to an in-memory database.
    database_url: Option<String>,
    #[arg(long, default_value_t = 8)]
    teams: usize,
    #[arg(long, default_value_t = 4)]
    rounds: i64,
    /// Judges per match. Two judges brings in the virtual third judge.
    #[arg(long, default_value_t = 2)]
    judges: usize,
    #[arg(long)]
    seed: Option<u64>,
}

const CRITERIA: [&str; 3] = ["argument", "clarity", "rebuttal"];

fn main() {
    tracing_subscriber::fmt::init();

    let args = Simulate::parse();
    let db_url = args
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| ":memory:".to_string());

    let mut conn = SqliteConnection::establish(&db_url).unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();

    let mut rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_os_rng(),
    };

    let event_id = Uuid::now_v7().to_string();
    diesel::insert_into(events::table)
        .values((
            events::id.eq(&event_id),
            events::name.eq("Simulated event"),
            events::scoring_criteria.eq(serde_json::json!({
                "criteria": CRITERIA,
                "judgeQuestions": 2,
            })
            .to_string()),
        ))
        .execute(&mut conn)
        .unwrap();

    let teams = (0..args.teams)
        .map(|i| {
            let id = Uuid::now_v7().to_string();
            diesel::insert_into(event_teams::table)
                .values((
                    event_teams::id.eq(&id),
                    event_teams::event_id.eq(&event_id),
                    event_teams::name.eq(format!("Team {}", i + 1)),
                ))
                .execute(&mut conn)
                .unwrap();
            id
        })
        .collect::<Vec<_>>();

    let admin = Actor::Administrator("simulator".to_string());

    for round in 1..=args.rounds {
        let mut shuffled = teams.clone();
        shuffled.shuffle(&mut rng);

        for (n, pair) in shuffled.chunks_exact(2).enumerate() {
            let match_id = Uuid::now_v7().to_string();
            diesel::insert_into(event_matches::table)
                .values((
                    event_matches::id.eq(&match_id),
                    event_matches::event_id.eq(&event_id),
                    event_matches::round.eq(round),
                    event_matches::team_a_id.eq(&pair[0]),
                    event_matches::team_b_id.eq(&pair[1]),
                    event_matches::stage.eq(Stage::FinalScoring.to_string()),
                    event_matches::room.eq(format!("Room {}", n + 1)),
                ))
                .execute(&mut conn)
                .unwrap();

            for seq in 0..args.judges {
                let judge_id = format!("judge-{round}-{n}-{seq}");
                let seq = seq as i64;
                diesel::insert_into(match_judges::table)
                    .values((
                        match_judges::id.eq(Uuid::now_v7().to_string()),
                        match_judges::match_id.eq(&match_id),
                        match_judges::judge_id.eq(&judge_id),
                        match_judges::ordinal.eq((seq < 2).then_some(seq + 1)),
                        match_judges::seq.eq(seq),
                    ))
                    .execute(&mut conn)
                    .unwrap();

                for team_id in pair {
                    let submission = ScoreSubmission {
                        sheet: random_sheet(&mut rng),
                        submit: true,
                        judge_id: Some(judge_id.clone()),
                    };
                    save_score(&match_id, team_id, &admin, submission, &mut conn)
                        .expect("failed to save score");
                }
            }

            let completed = request_stage_transition(
                &match_id,
                Stage::Completed,
                &admin,
                &mut conn,
            )
            .expect("failed to complete match");
            tracing::info!(
                round,
                winner = ?completed.winner_id,
                "simulated match"
            );
        }
    }

    let report = standings_of_event(&event_id, &mut conn).unwrap();
    println!("{}", serde_json::to_string_pretty(&report).unwrap());
}

fn random_sheet(rng: &mut impl Rng) -> ScoreSheet {
    ScoreSheet {
        criteria: CRITERIA
            .iter()
            .map(|name| (name.to_string(), Decimal::from(rng.random_range(15..=30))))
            .collect::<BTreeMap<_, _>>(),
        judge_questions: (0..2)
            .map(|_| Decimal::from(rng.random_range(1..=5)))
            .collect(),
        notes: String::new(),
    }
}
