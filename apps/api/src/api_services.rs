mod database;
mod integrity;
mod state_builder;

pub use database::{connect_and_migrate, connect_fallback_pool};
pub use integrity::spawn_integrity_checks;
pub use state_builder::build_app_state;
