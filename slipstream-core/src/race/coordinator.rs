use std::time::Duration;

use glam::DVec3;
use tracing::{debug, info};
use uuid::Uuid;

use crate::lobby::Lobby;
use crate::player::choices::Participant;
use crate::player::lap_info::LapNumber;
use crate::player::PlayerID;
use crate::progress::ProgressTracker;
use crate::replication::{StateReplicator, Writer};
use crate::settings::Settings;
use crate::track::Track;

use super::countdown::{effective_countdown, CancelToken, Countdown, CountdownStatus};
use super::grid::{assign_start_slots, StartSlot};
use super::phase::{RaceNotification, RacePhase};
use super::ranking::{final_ranking_text, rank, RankEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkMode {
    // single machine, every participant simulated here
    Local,
    // networked and we're the authority
    Host,
    // networked, following the authority's lead
    Peer,
}

impl NetworkMode {
    pub fn is_networked(&self) -> bool {
        !matches!(self, NetworkMode::Local)
    }
}

#[derive(Clone, Debug)]
pub struct RaceConfig {
    pub laps: LapNumber,
    pub countdown: Duration,
    pub network_min_countdown: Duration,
    pub bots_first: bool,
    pub no_collisions: bool,
    pub network_no_collisions: bool,
}

impl RaceConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            laps: settings.lap_target,
            countdown: Duration::from_secs_f64(settings.countdown_secs.max(0.0)),
            network_min_countdown: Duration::from_secs_f64(
                settings.network_min_countdown_secs.max(0.0),
            ),
            bots_first: settings.bots_first_in_starting_line,
            no_collisions: settings.no_collisions,
            network_no_collisions: settings.network_no_collisions,
        }
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            laps: 3,
            countdown: Duration::from_secs(3),
            network_min_countdown: Duration::from_secs(2),
            bots_first: true,
            no_collisions: false,
            network_no_collisions: true,
        }
    }
}

/// Everything fixed for the duration of one race.
#[derive(Clone, Debug, PartialEq)]
pub struct RaceSession {
    pub id: Uuid,
    pub participants: Vec<Participant>,
    pub track: Track,
    pub laps: LapNumber,
    pub grid: Vec<StartSlot>,
    pub no_collisions: bool,
}

impl RaceSession {
    pub fn participant(&self, player: PlayerID) -> Option<&Participant> {
        self.participants.iter().find(|p| p.slot == player)
    }
}

enum RaceState {
    Idle,
    Countdown(Countdown),
    Racing { elapsed: Duration },
    Finished { ranking: Vec<RankEntry>, elapsed: Duration },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnToLobby {
    // we're the authority and the session is gone
    Done,
    // we're a peer; the request has to go to the authority
    Forwarded,
    // already in the lobby
    Ignored,
}

/// Drives a race session through `Idle -> Countdown -> Racing -> Finished`.
///
/// Only the authority (local or host mode) moves the state machine on its own;
/// a peer just mirrors the [`RaceNotification`]s it receives. Calls that only
/// make sense on the authority are silently ignored on a peer.
pub struct RaceCoordinator {
    mode: NetworkMode,
    config: RaceConfig,
    state: RaceState,
    session: Option<RaceSession>,
    cancel: CancelToken,
    countdown_display: Option<u64>,
    outbox: Vec<RaceNotification>,
}

impl RaceCoordinator {
    pub fn new(mode: NetworkMode, config: RaceConfig) -> Self {
        Self {
            mode,
            config,
            state: RaceState::Idle,
            session: None,
            cancel: CancelToken::new(),
            countdown_display: None,
            outbox: Vec::new(),
        }
    }

    pub fn mode(&self) -> NetworkMode {
        self.mode
    }

    pub fn is_authority(&self) -> bool {
        self.mode != NetworkMode::Peer
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn phase(&self) -> RacePhase {
        match self.state {
            RaceState::Idle => RacePhase::Idle,
            RaceState::Countdown(_) => RacePhase::Countdown,
            RaceState::Racing { .. } => RacePhase::Racing,
            RaceState::Finished { .. } => RacePhase::Finished,
        }
    }

    pub fn session(&self) -> Option<&RaceSession> {
        self.session.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        match self.state {
            RaceState::Racing { elapsed } | RaceState::Finished { elapsed, .. } => elapsed,
            _ => Duration::ZERO,
        }
    }

    pub fn final_ranking(&self) -> Option<&[RankEntry]> {
        match &self.state {
            RaceState::Finished { ranking, .. } => Some(ranking),
            _ => None,
        }
    }

    pub fn final_ranking_text(&self) -> Option<String> {
        match &self.state {
            RaceState::Finished { ranking, elapsed } => Some(final_ranking_text(ranking, *elapsed)),
            _ => None,
        }
    }

    // what the countdown banner should say right now, if anything
    pub fn countdown_text(&self) -> Option<String> {
        match self.state {
            RaceState::Countdown(_) => self
                .countdown_display
                .map(|seconds| format!("Start in {}", seconds)),
            RaceState::Racing { elapsed } if elapsed < Duration::from_secs(1) => {
                Some("GO !".to_string())
            }
            _ => None,
        }
    }

    /// Idle -> Countdown. Needs the lobby to be ready; puts everybody on the
    /// grid with controls off and progress reset.
    pub fn begin(
        &mut self,
        lobby: &Lobby,
        track: Track,
        replicator: &mut StateReplicator,
        tracker: &mut ProgressTracker,
    ) -> bool {
        if !self.is_authority() {
            debug!("peer tried to start a race, ignoring");
            return false;
        }
        if self.phase() != RacePhase::Idle {
            debug!(phase = ?self.phase(), "race already underway, ignoring start");
            return false;
        }
        if !lobby.is_ready_to_start() {
            debug!(
                not_ready = lobby.players_not_ready(),
                "lobby not ready, ignoring start"
            );
            return false;
        }

        track.validate();
        let participants = lobby.all_participants().to_vec();
        let grid = assign_start_slots(&participants, &track, self.config.bots_first);

        replicator.clear();
        for participant in &participants {
            let writer = if participant.is_bot || self.mode == NetworkMode::Local {
                Writer::Local
            } else {
                Writer::Remote(participant.slot)
            };
            replicator.register(participant.slot, writer);
        }
        for start in &grid {
            replicator.place(start.player, start.position);
        }
        replicator.set_controls_enabled(false);
        self.outbox.push(RaceNotification::ControlsDisabled);

        tracker.reset(
            track.checkpoint_count(),
            self.config.laps,
            participants.iter().map(|p| p.slot),
        );

        let duration = effective_countdown(
            self.config.countdown,
            self.mode.is_networked(),
            self.config.network_min_countdown,
        );
        let no_collisions = if self.mode.is_networked() {
            self.config.network_no_collisions
        } else {
            self.config.no_collisions
        };

        let session = RaceSession {
            id: Uuid::new_v4(),
            participants,
            track,
            laps: self.config.laps,
            grid,
            no_collisions,
        };
        info!(
            session = %session.id,
            track = %session.track.name,
            participants = session.participants.len(),
            countdown_ms = duration.as_millis() as u64,
            "starting race countdown"
        );

        self.outbox.push(RaceNotification::CountdownStarted {
            session: session.id,
            participants: session.participants.clone(),
            track: session.track.clone(),
            laps: session.laps,
            grid: session.grid.clone(),
            no_collisions,
            duration,
        });
        self.start_countdown(duration);
        self.session = Some(session);
        true
    }

    fn start_countdown(&mut self, duration: Duration) {
        self.cancel = CancelToken::new();
        self.countdown_display = None;
        self.state = RaceState::Countdown(Countdown::new(duration, self.cancel.clone()));
    }

    /// Advances timers and checks for the end of the race. Called once per
    /// fixed simulation step.
    pub fn tick(
        &mut self,
        dt: Duration,
        replicator: &mut StateReplicator,
        tracker: &ProgressTracker,
    ) {
        let authority = self.is_authority();
        match &mut self.state {
            RaceState::Idle | RaceState::Finished { .. } => {}
            RaceState::Countdown(countdown) => {
                // peers wait for the authority to say go
                if !authority {
                    return;
                }
                match countdown.advance(dt) {
                    CountdownStatus::Running { announce: Some(seconds) } => {
                        self.countdown_display = Some(seconds);
                        self.outbox.push(RaceNotification::CountdownTick(seconds));
                    }
                    CountdownStatus::Running { announce: None } | CountdownStatus::Cancelled => {}
                    CountdownStatus::Elapsed => self.start_racing(replicator),
                }
            }
            RaceState::Racing { elapsed } => {
                *elapsed += dt;
                if authority && tracker.any_finished() {
                    self.finish(replicator, tracker);
                }
            }
        }
    }

    fn start_racing(&mut self, replicator: &mut StateReplicator) {
        replicator.set_controls_enabled(true);
        self.state = RaceState::Racing {
            elapsed: Duration::ZERO,
        };
        self.countdown_display = None;
        self.outbox.push(RaceNotification::ControlsEnabled);
        self.outbox.push(RaceNotification::RaceStarted);
        info!("race started");
    }

    fn finish(&mut self, replicator: &mut StateReplicator, tracker: &ProgressTracker) {
        replicator.set_controls_enabled(false);
        let ranking = self.live_ranking(replicator, tracker);
        let elapsed = self.elapsed();

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            winner = ranking.first().map(|entry| entry.name.as_str()).unwrap_or(""),
            "race finished"
        );
        self.outbox.push(RaceNotification::ControlsDisabled);
        self.outbox.push(RaceNotification::RaceFinished {
            ranking: ranking.clone(),
            elapsed,
        });
        self.state = RaceState::Finished { ranking, elapsed };
    }

    /// Current standings of everybody still tracked, best first.
    pub fn live_ranking(
        &self,
        replicator: &StateReplicator,
        tracker: &ProgressTracker,
    ) -> Vec<RankEntry> {
        let Some(session) = &self.session else {
            return Vec::new();
        };

        let mut ranking: Vec<RankEntry> = tracker
            .players()
            .map(|(player, info)| {
                let position = replicator.position(player).unwrap_or(DVec3::ZERO);
                RankEntry {
                    player,
                    name: session
                        .participant(player)
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                    score: info.score(tracker.checkpoint_count()),
                    lap: info.lap,
                    // measured to the checkpoint they must cross next, not
                    // the one after it
                    distance_to_next: session
                        .track
                        .distance_to_checkpoint(position, info.next_checkpoint),
                    finished: info.has_finished(tracker.laps_target(), tracker.checkpoint_count()),
                }
            })
            .collect();
        rank(&mut ranking);
        ranking
    }

    /// Tears the session down and goes back to the lobby. On a peer this only
    /// tells the caller to forward the request to the authority.
    pub fn return_to_lobby(
        &mut self,
        replicator: &mut StateReplicator,
        tracker: &mut ProgressTracker,
    ) -> ReturnToLobby {
        if self.phase() == RacePhase::Idle {
            return ReturnToLobby::Ignored;
        }
        if !self.is_authority() {
            return ReturnToLobby::Forwarded;
        }

        self.teardown(replicator, tracker);
        self.outbox.push(RaceNotification::ReturnedToLobby);
        info!("returned to lobby");
        ReturnToLobby::Done
    }

    fn teardown(&mut self, replicator: &mut StateReplicator, tracker: &mut ProgressTracker) {
        self.cancel.cancel();
        replicator.clear();
        tracker.clear();
        self.session = None;
        self.countdown_display = None;
        self.state = RaceState::Idle;
    }

    /// A participant vanished mid-session (lost connection). The race goes
    /// on without them unless nobody is left.
    pub fn drop_participant(
        &mut self,
        player: PlayerID,
        replicator: &mut StateReplicator,
        tracker: &mut ProgressTracker,
    ) {
        if !self.is_authority() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.participants.retain(|p| p.slot != player);
        replicator.unregister(player);
        tracker.remove(player);
        info!(player, remaining = session.participants.len(), "participant left the race");

        if session.participants.is_empty() {
            self.return_to_lobby(replicator, tracker);
        }
    }

    /// Peer side: mirror a lifecycle change announced by the authority.
    pub fn apply_notification(
        &mut self,
        notification: RaceNotification,
        replicator: &mut StateReplicator,
        tracker: &mut ProgressTracker,
    ) {
        if self.is_authority() {
            debug!(?notification, "authority ignores its own notifications");
            return;
        }

        match notification {
            RaceNotification::ControlsDisabled => replicator.set_controls_enabled(false),
            RaceNotification::ControlsEnabled => replicator.set_controls_enabled(true),
            RaceNotification::CountdownStarted {
                session,
                participants,
                track,
                laps,
                grid,
                no_collisions,
                duration,
            } => {
                tracker.reset(track.checkpoint_count(), laps, participants.iter().map(|p| p.slot));
                replicator.clear();
                for participant in &participants {
                    let writer = if participant.is_bot {
                        Writer::Local
                    } else {
                        Writer::Remote(participant.slot)
                    };
                    replicator.register(participant.slot, writer);
                }
                for start in &grid {
                    replicator.place(start.player, start.position);
                }
                self.session = Some(RaceSession {
                    id: session,
                    participants,
                    track,
                    laps,
                    grid,
                    no_collisions,
                });
                self.start_countdown(duration);
            }
            RaceNotification::CountdownTick(seconds) => self.countdown_display = Some(seconds),
            RaceNotification::RaceStarted => {
                self.countdown_display = None;
                self.state = RaceState::Racing {
                    elapsed: Duration::ZERO,
                };
            }
            RaceNotification::RaceFinished { ranking, elapsed } => {
                self.state = RaceState::Finished { ranking, elapsed };
            }
            RaceNotification::ReturnedToLobby => self.teardown(replicator, tracker),
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<RaceNotification> {
        std::mem::take(&mut self.outbox)
    }
}
