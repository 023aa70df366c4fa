use std::path::PathBuf;
use std::time::Duration;

use slipstream_core::networking::{ClientBoundPacket, ServerBoundPacket};
use slipstream_core::player::choices::Participant;
use slipstream_core::race::{NetworkMode, RacePhase, RankEntry};
use slipstream_core::replication::Writer;
use slipstream_core::schedule::Schedule;
use slipstream_core::track::{find_track, Track};
use slipstream_core::world::RaceWorld;
use slipstream_core::{PlayerID, Settings};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    To(PlayerID, ClientBoundPacket),
    Broadcast(ClientBoundPacket),
}

/// Everything the server knows about the session, minus the sockets.
pub struct ServerGameState {
    world: RaceWorld,
    schedule: Schedule<RaceWorld>,
    tracks: Vec<String>,
    track_dir: PathBuf,
    // set while we wait for every client to report the track loaded
    loading: Option<Track>,
    last_standings: Vec<RankEntry>,
    outgoing: Vec<Outgoing>,
}

impl ServerGameState {
    pub fn new(world: RaceWorld, tracks: Vec<String>, track_dir: PathBuf, tick: Duration) -> Self {
        Self {
            world,
            schedule: RaceWorld::build_schedule(tick),
            tracks,
            track_dir,
            loading: None,
            last_standings: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            RaceWorld::from_settings(settings, NetworkMode::Host),
            settings.tracks.clone(),
            PathBuf::from(&settings.track_dir),
            Duration::from_millis(settings.server_tick_ms),
        )
    }

    #[cfg(test)]
    pub fn world(&self) -> &RaceWorld {
        &self.world
    }

    /// Seats a newly connected client. Nobody joins mid-race.
    pub fn player_joined(&mut self) -> Option<PlayerID> {
        if self.world.phase() != RacePhase::Idle || self.loading.is_some() {
            return None;
        }
        let slot = self.world.lobby.first_free_slot()?;
        let vehicle = self.world.lobby.find_free_vehicle();
        self.world
            .lobby
            .add_participant(slot, Participant::human(slot, vehicle));

        let roster = self.world.lobby.all_participants().to_vec();
        self.outgoing
            .push(Outgoing::To(slot, ClientBoundPacket::PlayerNumber(slot, roster)));
        self.outgoing.push(Outgoing::To(
            slot,
            ClientBoundPacket::TrackChoice(self.world.lobby.track_selected()),
        ));
        Some(slot)
    }

    pub fn player_left(&mut self, slot: PlayerID) {
        self.world.drop_participant(slot);
    }

    pub fn handle_packet(&mut self, slot: PlayerID, packet: ServerBoundPacket) {
        let in_lobby = self.world.phase() == RacePhase::Idle;

        match packet {
            ServerBoundPacket::VehicleSelect(vehicle) if in_lobby => {
                self.world.lobby.select_vehicle(slot, vehicle)
            }
            ServerBoundPacket::TrackSelect(track) if in_lobby => {
                self.world.lobby.select_track(slot, track)
            }
            ServerBoundPacket::SetReadyStatus(ready) if in_lobby => {
                self.world.lobby.set_ready(slot, ready)
            }
            ServerBoundPacket::NotifyLoaded => self.world.lobby.mark_loaded(slot),
            ServerBoundPacket::VehicleUpdate { control, position } => {
                self.world
                    .replicator
                    .push(Writer::Remote(slot), slot, control, position);
            }
            ServerBoundPacket::CheckpointCrossed(checkpoint) => {
                self.world.checkpoint_crossed(slot, checkpoint);
            }
            ServerBoundPacket::ReturnToLobby => {
                info!(slot, "player asked to return to the lobby");
                self.world.return_to_lobby();
            }
            packet => debug!(slot, ?packet, "lobby packet outside of the lobby, ignoring"),
        }
    }

    /// One server tick: load handshake, simulation, then queue up what the
    /// clients need to hear about.
    pub fn update(&mut self, frame_dt: Duration) {
        self.check_loading();
        self.schedule.run(&mut self.world, frame_dt);
        self.collect_outgoing();
    }

    // everybody ready -> tell them to load; everybody loaded -> countdown
    fn check_loading(&mut self) {
        if self.world.phase() != RacePhase::Idle {
            return;
        }

        let lobby = &mut self.world.lobby;
        if self.loading.is_none() {
            if !lobby.is_ready_to_start() {
                return;
            }
            let name = self
                .tracks
                .get(lobby.track_selected())
                .cloned()
                .unwrap_or_default();
            match find_track(&name, &self.track_dir) {
                Ok(track) => {
                    info!(track = %track.name, "everybody's ready, loading track");
                    lobby.clear_loaded();
                    self.outgoing
                        .push(Outgoing::Broadcast(ClientBoundPacket::LoadRace(track.name.clone())));
                    self.loading = Some(track);
                }
                Err(e) => {
                    warn!(track = %name, error = %e, "can't load selected track");
                    lobby.reset_readiness();
                }
            }
        } else if !lobby.is_ready_to_start() {
            info!("lobby no longer ready, cancelling race load");
            self.loading = None;
        } else if lobby.all_loaded() {
            if let Some(track) = self.loading.take() {
                self.world.start_race(track);
            }
        }
    }

    fn collect_outgoing(&mut self) {
        for event in self.world.lobby.drain_events() {
            self.outgoing.push(Outgoing::Broadcast(event.into()));
        }
        for notification in self.world.coordinator.drain_notifications() {
            self.outgoing
                .push(Outgoing::Broadcast(ClientBoundPacket::Race(notification)));
        }
        for (player, lap) in self.world.drain_lap_updates() {
            self.outgoing
                .push(Outgoing::To(player, ClientBoundPacket::LapUpdate(lap)));
        }

        match self.world.phase() {
            RacePhase::Countdown | RacePhase::Racing => {
                self.outgoing.push(Outgoing::Broadcast(ClientBoundPacket::VehicleStates(
                    self.world.replicator.snapshot(),
                )));
            }
            RacePhase::Idle | RacePhase::Finished => {}
        }

        if self.world.standings() != self.last_standings.as_slice() {
            self.last_standings = self.world.standings().to_vec();
            if !self.last_standings.is_empty() {
                self.outgoing.push(Outgoing::Broadcast(ClientBoundPacket::Standings(
                    self.last_standings.clone(),
                )));
            }
        }
    }

    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }
}
