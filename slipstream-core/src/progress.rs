use std::collections::BTreeMap;

use tracing::debug;

use crate::player::lap_info::{CheckpointID, LapInformation, LapNumber, Score};
use crate::player::PlayerID;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointOutcome {
    // wrong checkpoint, unknown player, or nothing to track
    Ignored,
    Advanced { score: Score },
    LapCompleted { lap: LapNumber },
    Finished,
}

/// Checkpoint/lap bookkeeping for every participant of the current race.
pub struct ProgressTracker {
    checkpoint_count: usize,
    laps_target: LapNumber,
    progress: BTreeMap<PlayerID, LapInformation>,
}

impl ProgressTracker {
    pub fn new(checkpoint_count: usize, laps_target: LapNumber) -> Self {
        Self {
            checkpoint_count,
            laps_target,
            progress: BTreeMap::new(),
        }
    }

    /// Forgets everything and starts every given player from scratch.
    pub fn reset(
        &mut self,
        checkpoint_count: usize,
        laps_target: LapNumber,
        players: impl IntoIterator<Item = PlayerID>,
    ) {
        self.checkpoint_count = checkpoint_count;
        self.laps_target = laps_target;
        self.progress = players
            .into_iter()
            .map(|player| (player, LapInformation::new()))
            .collect();
    }

    pub fn clear(&mut self) {
        self.progress.clear();
    }

    pub fn remove(&mut self, player: PlayerID) {
        self.progress.remove(&player);
    }

    pub fn on_checkpoint_crossed(
        &mut self,
        player: PlayerID,
        checkpoint: CheckpointID,
    ) -> CheckpointOutcome {
        let Some(info) = self.progress.get_mut(&player) else {
            return CheckpointOutcome::Ignored;
        };

        let lap_before = info.lap;
        if !info.cross_checkpoint(checkpoint, self.checkpoint_count) {
            debug!(
                player,
                checkpoint,
                expected = info.next_checkpoint,
                "ignoring out of order checkpoint"
            );
            return CheckpointOutcome::Ignored;
        }

        if info.has_finished(self.laps_target, self.checkpoint_count) {
            CheckpointOutcome::Finished
        } else if info.lap != lap_before {
            CheckpointOutcome::LapCompleted { lap: info.lap }
        } else {
            CheckpointOutcome::Advanced {
                score: info.score(self.checkpoint_count),
            }
        }
    }

    pub fn lap_info(&self, player: PlayerID) -> Option<LapInformation> {
        self.progress.get(&player).copied()
    }

    pub fn score(&self, player: PlayerID) -> Option<Score> {
        self.progress
            .get(&player)
            .map(|info| info.score(self.checkpoint_count))
    }

    pub fn is_finished(&self, player: PlayerID) -> bool {
        self.progress
            .get(&player)
            .map_or(false, |info| info.has_finished(self.laps_target, self.checkpoint_count))
    }

    pub fn any_finished(&self) -> bool {
        self.progress
            .values()
            .any(|info| info.has_finished(self.laps_target, self.checkpoint_count))
    }

    pub fn players(&self) -> impl Iterator<Item = (PlayerID, LapInformation)> + '_ {
        self.progress.iter().map(|(player, info)| (*player, *info))
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoint_count
    }

    pub fn laps_target(&self) -> LapNumber {
        self.laps_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_over_a_full_race() {
        let mut tracker = ProgressTracker::new(4, 0);
        tracker.reset(4, 3, [0, 1]);

        assert_eq!(
            tracker.on_checkpoint_crossed(0, 0),
            CheckpointOutcome::Advanced { score: 1 }
        );
        tracker.on_checkpoint_crossed(0, 1);
        tracker.on_checkpoint_crossed(0, 2);
        assert_eq!(
            tracker.on_checkpoint_crossed(0, 3),
            CheckpointOutcome::LapCompleted { lap: 1 }
        );

        for checkpoint in [0, 1, 2, 3, 0, 1, 2] {
            tracker.on_checkpoint_crossed(0, checkpoint);
        }
        assert!(!tracker.any_finished());
        assert_eq!(tracker.on_checkpoint_crossed(0, 3), CheckpointOutcome::Finished);
        assert!(tracker.is_finished(0));
        assert!(!tracker.is_finished(1));
        assert_eq!(tracker.score(0), Some(12));
    }

    #[test]
    fn test_unknown_player_and_wrong_checkpoint() {
        let mut tracker = ProgressTracker::new(4, 3);
        tracker.reset(4, 3, [0]);

        assert_eq!(tracker.on_checkpoint_crossed(7, 0), CheckpointOutcome::Ignored);
        assert_eq!(tracker.on_checkpoint_crossed(0, 2), CheckpointOutcome::Ignored);
        assert_eq!(tracker.lap_info(0), Some(LapInformation::new()));
    }

    #[test]
    fn test_remove_player() {
        let mut tracker = ProgressTracker::new(4, 3);
        tracker.reset(4, 3, [0, 1]);
        tracker.remove(1);
        assert_eq!(tracker.players().count(), 1);
        assert_eq!(tracker.score(1), None);
    }
}
