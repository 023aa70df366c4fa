use std::collections::BTreeSet;

use rand::Rng;
use tracing::debug;

use crate::player::choices::{cycle_index, Participant};
use crate::player::PlayerID;

/// Something about the lobby changed that the other peers should hear about.
#[derive(Clone, Debug, PartialEq)]
pub enum LobbyEvent {
    Joined(Participant),
    Left(PlayerID),
    VehicleChanged(PlayerID, usize),
    TrackChanged(usize),
    ReadinessChanged(PlayerID, bool),
}

/// The session manager: who is in the lobby, what they picked and whether
/// they're ready to go.
pub struct Lobby {
    max_players: usize,
    vehicle_count: usize,
    track_count: usize,
    track_selected: usize,
    // registration order
    participants: Vec<Participant>,
    loaded: BTreeSet<PlayerID>,
    events: Vec<LobbyEvent>,
}

impl Lobby {
    pub fn new(max_players: usize, vehicle_count: usize, track_count: usize) -> Self {
        Self {
            max_players,
            vehicle_count,
            track_count,
            track_selected: 0,
            participants: Vec::new(),
            loaded: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// Puts `info` into `slot`. An occupied slot is overwritten in place.
    pub fn add_participant(&mut self, slot: PlayerID, mut info: Participant) {
        info.slot = slot;
        match self.participants.iter_mut().find(|p| p.slot == slot) {
            Some(existing) => {
                debug!(slot, "overwriting occupied lobby slot");
                *existing = info.clone();
            }
            None => self.participants.push(info.clone()),
        }
        self.events.push(LobbyEvent::Joined(info));
    }

    pub fn remove_participant(&mut self, slot: PlayerID) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.slot == slot)?;
        self.loaded.remove(&slot);
        self.events.push(LobbyEvent::Left(slot));
        Some(self.participants.remove(index))
    }

    /// Adds a ready bot driving a random vehicle.
    pub fn add_bot(&mut self, slot: PlayerID) {
        let vehicle = if self.vehicle_count > 0 {
            rand::thread_rng().gen_range(0..self.vehicle_count)
        } else {
            0
        };
        self.add_participant(slot, Participant::bot(slot, vehicle));
    }

    /// Populates an empty lobby for a quick local race: optionally one human,
    /// then `bots` bots, everybody ready and driving `vehicle`.
    pub fn fill_test_mode(&mut self, human: bool, bots: usize, vehicle: usize) {
        if !self.participants.is_empty() {
            return;
        }

        let mut slot = 0;
        if human {
            let mut player = Participant::human(slot, vehicle).with_name(format!("player{}", slot + 1));
            player.ready = true;
            self.add_participant(slot, player);
            slot += 1;
        }
        for _ in 0..bots {
            self.add_participant(slot, Participant::bot(slot, vehicle));
            slot += 1;
        }
    }

    pub fn is_ready_to_start(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.ready)
    }

    pub fn players_not_ready(&self) -> usize {
        self.participants.iter().filter(|p| !p.ready).count()
    }

    pub fn all_participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, slot: PlayerID) -> Option<&Participant> {
        self.participants.iter().find(|p| p.slot == slot)
    }

    pub fn contains(&self, slot: PlayerID) -> bool {
        self.participant(slot).is_some()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn first_free_slot(&self) -> Option<PlayerID> {
        (0..self.max_players).find(|slot| !self.contains(*slot))
    }

    pub fn set_ready(&mut self, slot: PlayerID, ready: bool) {
        let Some(participant) = self.participants.iter_mut().find(|p| p.slot == slot) else {
            return;
        };
        if participant.ready != ready {
            participant.ready = ready;
            self.events.push(LobbyEvent::ReadinessChanged(slot, ready));
        }
    }

    // vehicle choice is locked in once a player declared themselves ready
    pub fn select_vehicle(&mut self, slot: PlayerID, vehicle: usize) {
        if vehicle >= self.vehicle_count {
            debug!(slot, vehicle, "ignoring unknown vehicle");
            return;
        }
        let Some(participant) = self.participants.iter_mut().find(|p| p.slot == slot) else {
            return;
        };
        if participant.ready {
            return;
        }
        participant.vehicle = vehicle;
        self.events.push(LobbyEvent::VehicleChanged(slot, vehicle));
    }

    pub fn cycle_vehicle(&mut self, slot: PlayerID, direction: i32) {
        if let Some(current) = self.participant(slot).map(|p| p.vehicle) {
            self.select_vehicle(slot, cycle_index(current, direction, self.vehicle_count));
        }
    }

    /// Lowest vehicle index nobody has picked yet, or the last vehicle if all are taken.
    pub fn find_free_vehicle(&self) -> usize {
        let taken: BTreeSet<usize> = self.participants.iter().map(|p| p.vehicle).collect();
        let free = (0..).find(|index| !taken.contains(index)).unwrap_or(0);
        free.min(self.vehicle_count.saturating_sub(1))
    }

    pub fn track_selected(&self) -> usize {
        self.track_selected
    }

    // the player in slot 0 hosts, so they're the one picking the track
    pub fn select_track(&mut self, slot: PlayerID, track: usize) {
        if slot != 0 || track >= self.track_count {
            debug!(slot, track, "ignoring track selection");
            return;
        }
        if self.track_selected != track {
            self.track_selected = track;
            self.events.push(LobbyEvent::TrackChanged(track));
        }
    }

    pub fn cycle_track(&mut self, slot: PlayerID, direction: i32) {
        let track = cycle_index(self.track_selected, direction, self.track_count);
        self.select_track(slot, track);
    }

    pub fn mark_loaded(&mut self, slot: PlayerID) {
        if self.contains(slot) {
            self.loaded.insert(slot);
        }
    }

    pub fn all_loaded(&self) -> bool {
        !self.participants.is_empty()
            && self
                .participants
                .iter()
                .all(|p| p.is_bot || self.loaded.contains(&p.slot))
    }

    pub fn clear_loaded(&mut self) {
        self.loaded.clear();
    }

    /// Back from a race: humans have to ready up again, bots stay ready.
    pub fn reset_readiness(&mut self) {
        self.loaded.clear();
        for participant in self.participants.iter_mut().filter(|p| !p.is_bot) {
            if participant.ready {
                participant.ready = false;
                self.events
                    .push(LobbyEvent::ReadinessChanged(participant.slot, false));
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<LobbyEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> Lobby {
        Lobby::new(4, 4, 2)
    }

    #[test]
    fn test_empty_lobby_is_not_ready() {
        assert!(!lobby().is_ready_to_start());
    }

    #[test]
    fn test_ready_when_everybody_is_ready() {
        let mut lobby = lobby();
        lobby.add_participant(0, Participant::human(0, 0));
        lobby.add_participant(1, Participant::human(1, 1));
        lobby.set_ready(0, true);
        assert!(!lobby.is_ready_to_start());
        assert_eq!(lobby.players_not_ready(), 1);

        lobby.set_ready(1, true);
        assert!(lobby.is_ready_to_start());

        let readiness: Vec<LobbyEvent> = lobby
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, LobbyEvent::ReadinessChanged(..)))
            .collect();
        assert_eq!(
            readiness,
            vec![
                LobbyEvent::ReadinessChanged(0, true),
                LobbyEvent::ReadinessChanged(1, true)
            ]
        );
        assert!(lobby.drain_events().is_empty());
    }

    #[test]
    fn test_occupied_slot_is_overwritten() {
        let mut lobby = lobby();
        lobby.add_participant(0, Participant::human(0, 0));
        lobby.add_participant(1, Participant::human(1, 0));
        lobby.add_participant(0, Participant::human(0, 2).with_name("late"));

        assert_eq!(lobby.len(), 2);
        // keeps its registration position
        assert_eq!(lobby.all_participants()[0].name, "late");
        assert_eq!(lobby.all_participants()[0].vehicle, 2);
    }

    #[test]
    fn test_remove_participant() {
        let mut lobby = lobby();
        lobby.add_participant(0, Participant::human(0, 0));
        lobby.add_participant(1, Participant::human(1, 0));
        lobby.set_ready(1, true);
        lobby.remove_participant(0);

        assert_eq!(lobby.first_free_slot(), Some(0));
        assert!(lobby.is_ready_to_start());
        assert!(lobby.remove_participant(3).is_none());
    }

    #[test]
    fn test_vehicle_selection_wraps_and_locks_when_ready() {
        let mut lobby = lobby();
        lobby.add_participant(0, Participant::human(0, 0));
        lobby.cycle_vehicle(0, -1);
        assert_eq!(lobby.participant(0).unwrap().vehicle, 3);

        lobby.set_ready(0, true);
        lobby.cycle_vehicle(0, 1);
        assert_eq!(lobby.participant(0).unwrap().vehicle, 3);
    }

    #[test]
    fn test_only_host_selects_track() {
        let mut lobby = lobby();
        lobby.select_track(1, 1);
        assert_eq!(lobby.track_selected(), 0);
        lobby.cycle_track(0, -1);
        assert_eq!(lobby.track_selected(), 1);
        lobby.select_track(0, 5);
        assert_eq!(lobby.track_selected(), 1);
    }

    #[test]
    fn test_find_free_vehicle() {
        let mut lobby = Lobby::new(4, 2, 1);
        assert_eq!(lobby.find_free_vehicle(), 0);
        lobby.add_participant(0, Participant::human(0, 0));
        assert_eq!(lobby.find_free_vehicle(), 1);
        lobby.add_participant(1, Participant::human(1, 1));
        // every vehicle is taken, so we fall back to the last one
        assert_eq!(lobby.find_free_vehicle(), 1);
    }

    #[test]
    fn test_fill_test_mode() {
        let mut lobby = lobby();
        lobby.fill_test_mode(true, 2, 1);

        let names: Vec<&str> = lobby
            .all_participants()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["player1", "bot2", "bot3"]);
        assert!(lobby.is_ready_to_start());

        // only fills an empty lobby
        lobby.fill_test_mode(true, 3, 0);
        assert_eq!(lobby.len(), 3);
    }

    #[test]
    fn test_loaded_handshake_skips_bots() {
        let mut lobby = lobby();
        lobby.add_participant(0, Participant::human(0, 0));
        lobby.add_bot(1);
        assert!(!lobby.all_loaded());
        lobby.mark_loaded(0);
        assert!(lobby.all_loaded());

        lobby.reset_readiness();
        assert!(!lobby.all_loaded());
        assert!(lobby.participant(1).unwrap().ready);
    }
}
