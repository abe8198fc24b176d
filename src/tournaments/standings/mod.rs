pub mod cache;
pub mod compute;
pub mod public;
