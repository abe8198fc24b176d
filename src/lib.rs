use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod config;
pub mod error;
pub mod permission;
pub mod schema;
pub mod state;
pub mod tournaments;
pub mod util_resp;


pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
