use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::choices::Participant;
use crate::player::lap_info::LapNumber;
use crate::track::Track;

use super::grid::StartSlot;
use super::ranking::RankEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    // Players are in the lobby choosing vehicles and marking ready
    Idle,
    // Everybody is on the grid and can see the track, but controls are off
    // until the countdown runs out
    Countdown,
    // Controls are live; first across the line ends it
    Racing,
    // Standings are frozen until somebody takes us back to the lobby
    Finished,
}

// Everything the authority tells its peers about the race lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RaceNotification {
    ControlsDisabled,
    ControlsEnabled,
    CountdownStarted {
        session: Uuid,
        participants: Vec<Participant>,
        track: Track,
        laps: LapNumber,
        grid: Vec<StartSlot>,
        no_collisions: bool,
        #[serde(with = "serde_millis")]
        duration: Duration,
    },
    CountdownTick(u64), // whole seconds left
    RaceStarted,
    RaceFinished {
        ranking: Vec<RankEntry>,
        #[serde(with = "serde_millis")]
        elapsed: Duration,
    },
    ReturnedToLobby,
}
