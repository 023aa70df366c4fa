use serde::{Deserialize, Serialize};

pub type LapNumber = u32;
pub type CheckpointID = usize;
pub type Score = u32;

// Where a player is in the race: laps fully completed and the index of the
// checkpoint they have to cross next
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LapInformation {
    pub lap: LapNumber,
    pub next_checkpoint: CheckpointID,
}

impl LapInformation {
    pub fn new() -> Self {
        LapInformation {
            lap: 0,
            next_checkpoint: 0,
        }
    }

    pub fn score(&self, checkpoint_count: usize) -> Score {
        self.lap * checkpoint_count as Score + self.next_checkpoint as Score
    }

    // a track without checkpoints can't be finished at all
    pub fn has_finished(&self, laps_target: LapNumber, checkpoint_count: usize) -> bool {
        checkpoint_count > 0 && self.score(checkpoint_count) >= laps_target * checkpoint_count as Score
    }

    /// Records a crossing of `checkpoint`. Only the expected checkpoint counts;
    /// anything else is ignored. Returns whether the state changed.
    pub fn cross_checkpoint(&mut self, checkpoint: CheckpointID, checkpoint_count: usize) -> bool {
        if checkpoint_count == 0 || checkpoint != self.next_checkpoint {
            return false;
        }

        self.next_checkpoint += 1;
        if self.next_checkpoint == checkpoint_count {
            self.lap += 1;
            self.next_checkpoint = 0;
        }
        true
    }

    // the lap shown on screen: the one being driven, capped once the race is done
    pub fn display_lap(&self, laps_target: LapNumber) -> LapNumber {
        if self.lap >= laps_target {
            laps_target
        } else {
            self.lap + 1
        }
    }
}
