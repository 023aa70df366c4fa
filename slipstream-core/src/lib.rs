pub mod error;
pub mod lobby;
pub mod networking;
pub mod player;
pub mod progress;
pub mod race;
pub mod replication;
pub mod schedule;
pub mod track;
pub mod world;
mod settings;

pub use player::PlayerID;
pub use settings::{Settings, GLOBAL_CONFIG};
