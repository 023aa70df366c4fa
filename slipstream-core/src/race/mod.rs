mod coordinator;
mod countdown;
mod grid;
mod phase;
mod ranking;


pub use coordinator::{NetworkMode, RaceConfig, RaceCoordinator, RaceSession, ReturnToLobby};
pub use countdown::{effective_countdown, CancelToken, Countdown, CountdownStatus};
pub use grid::{assign_start_slots, StartSlot};
pub use phase::{RaceNotification, RacePhase};
pub use ranking::{final_ranking_text, rank, standings_text, RankEntry};
