use std::time::Duration;

use tracing::{debug, info};

use crate::lobby::Lobby;
use crate::player::lap_info::{CheckpointID, LapNumber};
use crate::player::PlayerID;
use crate::progress::{CheckpointOutcome, ProgressTracker};
use crate::race::{
    standings_text, NetworkMode, RaceConfig, RaceCoordinator, RaceNotification, RacePhase,
    RankEntry, ReturnToLobby,
};
use crate::replication::StateReplicator;
use crate::schedule::{Schedule, TickPhase};
use crate::settings::Settings;
use crate::track::Track;

/// Owns one of each race service and wires them together.
pub struct RaceWorld {
    pub lobby: Lobby,
    pub coordinator: RaceCoordinator,
    pub replicator: StateReplicator,
    pub tracker: ProgressTracker,
    standings: Vec<RankEntry>,
    lap_updates: Vec<(PlayerID, LapNumber)>,
}

impl RaceWorld {
    pub fn new(lobby: Lobby, mode: NetworkMode, config: RaceConfig) -> Self {
        let laps = config.laps;
        Self {
            lobby,
            coordinator: RaceCoordinator::new(mode, config),
            replicator: StateReplicator::new(),
            tracker: ProgressTracker::new(0, laps),
            standings: Vec::new(),
            lap_updates: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings, mode: NetworkMode) -> Self {
        let lobby = Lobby::new(
            settings.max_players,
            settings.vehicles.len(),
            settings.tracks.len(),
        );
        Self::new(lobby, mode, RaceConfig::from_settings(settings))
    }

    pub fn phase(&self) -> RacePhase {
        self.coordinator.phase()
    }

    /// Starts the countdown on `track` if the lobby is ready.
    pub fn start_race(&mut self, track: Track) -> bool {
        let started =
            self.coordinator
                .begin(&self.lobby, track, &mut self.replicator, &mut self.tracker);
        if started {
            self.lobby.clear_loaded();
            self.standings.clear();
            self.lap_updates.clear();
        }
        started
    }

    /// Only counts while racing, and only on the authority.
    pub fn checkpoint_crossed(
        &mut self,
        player: PlayerID,
        checkpoint: CheckpointID,
    ) -> CheckpointOutcome {
        if !self.coordinator.is_authority() || self.phase() != RacePhase::Racing {
            debug!(player, checkpoint, "checkpoint crossed outside of a race, ignoring");
            return CheckpointOutcome::Ignored;
        }

        let outcome = self.tracker.on_checkpoint_crossed(player, checkpoint);
        match outcome {
            CheckpointOutcome::LapCompleted { lap } => {
                info!(player, lap, "lap completed");
                self.lap_updates.push((player, lap));
            }
            CheckpointOutcome::Finished => {
                info!(player, "crossed the finish line");
                self.lap_updates.push((player, self.tracker.laps_target()));
            }
            CheckpointOutcome::Advanced { .. } | CheckpointOutcome::Ignored => {}
        }
        outcome
    }

    /// Back to the lobby. Humans have to ready up again afterwards.
    pub fn return_to_lobby(&mut self) -> ReturnToLobby {
        let result = self
            .coordinator
            .return_to_lobby(&mut self.replicator, &mut self.tracker);
        if result == ReturnToLobby::Done {
            self.lobby.reset_readiness();
            self.standings.clear();
        }
        result
    }

    /// Somebody disconnected: out of the lobby and out of any running race.
    pub fn drop_participant(&mut self, player: PlayerID) {
        self.lobby.remove_participant(player);
        let was_racing = self.phase() != RacePhase::Idle;
        self.coordinator
            .drop_participant(player, &mut self.replicator, &mut self.tracker);
        if was_racing && self.phase() == RacePhase::Idle {
            self.lobby.reset_readiness();
        }
    }

    /// Peer side of the authority's lifecycle messages.
    pub fn apply_notification(&mut self, notification: RaceNotification) {
        if let RaceNotification::RaceFinished { ranking, .. } = &notification {
            self.standings = ranking.clone();
        }
        self.coordinator
            .apply_notification(notification, &mut self.replicator, &mut self.tracker);
    }

    pub fn refresh_standings(&mut self) {
        self.standings = match self.coordinator.final_ranking() {
            Some(ranking) => ranking.to_vec(),
            None => self
                .coordinator
                .live_ranking(&self.replicator, &self.tracker),
        };
    }

    pub fn standings(&self) -> &[RankEntry] {
        &self.standings
    }

    pub fn standings_text(&self) -> String {
        standings_text(&self.standings, self.coordinator.config().laps)
    }

    pub fn drain_lap_updates(&mut self) -> Vec<(PlayerID, LapNumber)> {
        std::mem::take(&mut self.lap_updates)
    }

    /// Fixed phase publishes replicated state and then moves the race along;
    /// the variable phase refreshes the standings shown to players.
    pub fn build_schedule(fixed_step: Duration) -> Schedule<RaceWorld> {
        let mut schedule = Schedule::new(fixed_step);
        schedule.add(TickPhase::Fixed, "replicate", |world: &mut RaceWorld, _| {
            world.replicator.apply_tick();
        });
        schedule.add(TickPhase::Fixed, "race", |world: &mut RaceWorld, dt| {
            world
                .coordinator
                .tick(dt, &mut world.replicator, &world.tracker);
        });
        schedule.add(TickPhase::Variable, "standings", |world: &mut RaceWorld, _| {
            if world.phase() != RacePhase::Idle {
                world.refresh_standings();
            }
        });
        schedule
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::player::player_inputs::ControlState;
    use crate::replication::Writer;
    use crate::track::BUILTIN_TRACKS;

    const STEP: Duration = Duration::from_millis(100);

    fn quick_race() -> RaceWorld {
        let mut lobby = Lobby::new(4, 4, 2);
        lobby.fill_test_mode(true, 2, 1);
        RaceWorld::new(lobby, NetworkMode::Local, RaceConfig::default())
    }

    fn run_until(
        world: &mut RaceWorld,
        schedule: &mut Schedule<RaceWorld>,
        phase: RacePhase,
    ) -> bool {
        for _ in 0..1000 {
            if world.phase() == phase {
                return true;
            }
            schedule.run(world, STEP);
        }
        false
    }

    #[test]
    fn test_local_quick_race_end_to_end() {
        let mut world = quick_race();
        let mut schedule = RaceWorld::build_schedule(STEP);
        let track = BUILTIN_TRACKS[0].clone();
        let checkpoints = track.checkpoint_count();

        assert!(world.start_race(track));
        assert_eq!(world.checkpoint_crossed(0, 0), CheckpointOutcome::Ignored);
        assert!(run_until(&mut world, &mut schedule, RacePhase::Racing));

        world
            .replicator
            .push(Writer::Local, 0, ControlState::new(0.0, 1.0), DVec3::ZERO);
        schedule.run(&mut world, STEP);
        assert_eq!(world.replicator.control(0), Some(ControlState::new(0.0, 1.0)));

        world.checkpoint_crossed(2, 0);
        for lap in 0..3 {
            for checkpoint in 0..checkpoints {
                world.checkpoint_crossed(0, checkpoint);
            }
            if lap < 2 {
                assert_eq!(world.drain_lap_updates(), vec![(0, lap + 1)]);
            }
        }
        assert_eq!(world.drain_lap_updates(), vec![(0, 3)]);

        assert!(run_until(&mut world, &mut schedule, RacePhase::Finished));
        let order: Vec<PlayerID> = world.standings().iter().map(|e| e.player).collect();
        assert_eq!(order[0], 0);
        assert_eq!(order[1], 2);
        assert!(world.standings_text().starts_with("1 | player1 | lap 3/3\n2 | bot3 | lap 1/3"));

        assert_eq!(world.return_to_lobby(), ReturnToLobby::Done);
        assert_eq!(world.phase(), RacePhase::Idle);
        assert!(world.standings().is_empty());
        // the human has to ready up again, the bots don't
        assert_eq!(world.lobby.players_not_ready(), 1);
    }

    #[test]
    fn test_disconnect_of_last_human_and_bots() {
        let mut lobby = Lobby::new(4, 4, 2);
        lobby.fill_test_mode(true, 0, 0);
        let mut world = RaceWorld::new(lobby, NetworkMode::Host, RaceConfig::default());
        assert!(world.start_race(BUILTIN_TRACKS[1].clone()));

        world.drop_participant(0);
        assert_eq!(world.phase(), RacePhase::Idle);
        assert!(world.lobby.is_empty());
    }

    #[test]
    fn test_peer_ignores_crossings() {
        let lobby = Lobby::new(4, 4, 2);
        let mut world = RaceWorld::new(lobby, NetworkMode::Peer, RaceConfig::default());
        assert!(!world.start_race(BUILTIN_TRACKS[0].clone()));
        assert_eq!(world.checkpoint_crossed(0, 0), CheckpointOutcome::Ignored);
    }
}
