use serde::{Deserialize, Serialize};

use super::PlayerID;

// One entry in the lobby: who sits in which slot, what they drive and whether
// they've confirmed they're ready to race
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub slot: PlayerID,
    pub name: String,
    pub vehicle: usize,
    pub is_bot: bool,
    pub ready: bool,
}

impl Participant {
    pub fn human(slot: PlayerID, vehicle: usize) -> Self {
        Self {
            slot,
            name: format!("Player #{}", slot + 1),
            vehicle,
            is_bot: false,
            ready: false,
        }
    }

    // bots never wait on anybody, so they're born ready
    pub fn bot(slot: PlayerID, vehicle: usize) -> Self {
        Self {
            slot,
            name: format!("bot{}", slot + 1),
            vehicle,
            is_bot: true,
            ready: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// Steps a selection index by `direction`, wrapping around both ends of a list
// of `len` items
pub fn cycle_index(current: usize, direction: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as i64 + direction as i64).rem_euclid(len as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_index_wraps_both_ways() {
        assert_eq!(cycle_index(0, -1, 4), 3);
        assert_eq!(cycle_index(3, 1, 4), 0);
        assert_eq!(cycle_index(1, 1, 4), 2);
        assert_eq!(cycle_index(2, 0, 0), 0);
    }

    #[test]
    fn test_default_names_follow_slot() {
        assert_eq!(Participant::human(0, 0).name, "Player #1");
        let bot = Participant::bot(2, 1);
        assert_eq!(bot.name, "bot3");
        assert!(bot.ready && bot.is_bot);
    }
}
