use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::player::player_inputs::ControlState;
use crate::player::PlayerID;

/// Who is allowed to write a participant's controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Writer {
    // the client that owns this participant
    Remote(PlayerID),
    // the local simulation, for bots
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub player: PlayerID,
    pub control: ControlState,
    pub position: DVec3,
}

struct Replica {
    writer: Writer,
    control: ControlState,
    position: DVec3,
    pending_control: Option<ControlState>,
    pending_position: Option<DVec3>,
}

impl Replica {
    fn new(writer: Writer) -> Self {
        Self {
            writer,
            control: ControlState::NEUTRAL,
            position: DVec3::ZERO,
            pending_control: None,
            pending_position: None,
        }
    }
}

/// Holds the latest control input and position of every vehicle. Pushes land
/// in a pending slot and only become visible in [`StateReplicator::apply_tick`],
/// so a reader never sees half a tick's worth of updates.
pub struct StateReplicator {
    replicas: BTreeMap<PlayerID, Replica>,
    controls_enabled: bool,
}

impl StateReplicator {
    pub fn new() -> Self {
        Self {
            replicas: BTreeMap::new(),
            controls_enabled: false,
        }
    }

    pub fn register(&mut self, player: PlayerID, writer: Writer) {
        self.replicas.insert(player, Replica::new(writer));
    }

    pub fn unregister(&mut self, player: PlayerID) {
        self.replicas.remove(&player);
    }

    pub fn clear(&mut self) {
        self.replicas.clear();
        self.controls_enabled = false;
    }

    pub fn is_registered(&self, player: PlayerID) -> bool {
        self.replicas.contains_key(&player)
    }

    /// Queues the newest state from `writer` for `player`. Returns false if
    /// `writer` doesn't own that participant. Last value wins.
    pub fn push(
        &mut self,
        writer: Writer,
        player: PlayerID,
        control: ControlState,
        position: DVec3,
    ) -> bool {
        let Some(replica) = self.replicas.get_mut(&player) else {
            debug!(player, "dropping state for unregistered player");
            return false;
        };
        if replica.writer != writer {
            debug!(player, ?writer, "rejecting state from a non-owning writer");
            return false;
        }
        replica.pending_control = Some(control);
        replica.pending_position = Some(position);
        true
    }

    /// Moves a participant to its grid spot; also discards anything pending.
    pub fn place(&mut self, player: PlayerID, position: DVec3) {
        if let Some(replica) = self.replicas.get_mut(&player) {
            replica.position = position;
            replica.pending_position = None;
            replica.pending_control = None;
        }
    }

    /// Publishes everything pushed since the last tick.
    pub fn apply_tick(&mut self) {
        let enabled = self.controls_enabled;
        for replica in self.replicas.values_mut() {
            if let Some(position) = replica.pending_position.take() {
                replica.position = position;
            }
            let control = replica.pending_control.take();
            replica.control = match control {
                Some(control) if enabled => control,
                _ if enabled => replica.control,
                _ => ControlState::NEUTRAL,
            };
        }
    }

    // enabling or disabling always starts everybody from neutral controls
    pub fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
        for replica in self.replicas.values_mut() {
            replica.control = ControlState::NEUTRAL;
            replica.pending_control = None;
        }
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn control(&self, player: PlayerID) -> Option<ControlState> {
        self.replicas.get(&player).map(|replica| replica.control)
    }

    pub fn position(&self, player: PlayerID) -> Option<DVec3> {
        self.replicas.get(&player).map(|replica| replica.position)
    }

    pub fn snapshot(&self) -> Vec<VehicleState> {
        self.replicas
            .iter()
            .map(|(player, replica)| VehicleState {
                player: *player,
                control: replica.control,
                position: replica.position,
            })
            .collect()
    }

    /// Observer side: overwrite remote vehicles with the authority's view,
    /// leaving our own vehicle (if any) alone.
    pub fn apply_snapshot(&mut self, snapshot: &[VehicleState], own: Option<PlayerID>) {
        for state in snapshot.iter().filter(|state| Some(state.player) != own) {
            let replica = self
                .replicas
                .entry(state.player)
                .or_insert_with(|| Replica::new(Writer::Remote(state.player)));
            replica.control = state.control;
            replica.position = state.position;
        }
    }
}

impl Default for StateReplicator {
    fn default() -> Self {
        Self::new()
    }
}
