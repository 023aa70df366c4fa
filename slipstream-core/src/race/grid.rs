use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::player::choices::Participant;
use crate::player::PlayerID;
use crate::track::Track;

/// A participant's place on the starting grid, fixed for the whole session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartSlot {
    pub player: PlayerID,
    pub slot: usize,
    pub position: DVec3,
}

/// Hands every participant its own grid slot, in registration order, or with
/// all bots ahead of the humans when `bots_first` is set.
pub fn assign_start_slots(
    participants: &[Participant],
    track: &Track,
    bots_first: bool,
) -> Vec<StartSlot> {
    let mut order: Vec<&Participant> = participants.iter().collect();
    if bots_first {
        // stable, so registration order is kept within bots and within humans
        order.sort_by_key(|participant| !participant.is_bot);
    }

    if order.len() > track.start_positions.len() {
        warn!(
            track = %track.name,
            participants = order.len(),
            start_positions = track.start_positions.len(),
            "not enough start positions, extra cars start at the origin"
        );
    }

    order
        .into_iter()
        .enumerate()
        .map(|(slot, participant)| StartSlot {
            player: participant.slot,
            slot,
            position: track.start_position(slot).unwrap_or(DVec3::ZERO),
        })
        .collect()
}
