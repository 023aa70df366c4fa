use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::player::lap_info::{LapInformation, LapNumber, Score};
use crate::player::PlayerID;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub player: PlayerID,
    pub name: String,
    pub score: Score,
    pub lap: LapNumber,
    pub distance_to_next: f64,
    pub finished: bool,
}

impl RankEntry {
    // Higher score first; on a tie whoever is closer to their next checkpoint
    // is ahead
    pub fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.distance_to_next.total_cmp(&other.distance_to_next))
    }
}

pub fn rank(entries: &mut [RankEntry]) {
    entries.sort_by(RankEntry::cmp);
}

// one line per player: "1 | name | lap 2/3"
pub fn standings_text(ranking: &[RankEntry], laps_target: LapNumber) -> String {
    ranking
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let lap = LapInformation {
                lap: entry.lap,
                next_checkpoint: 0,
            }
            .display_lap(laps_target);
            format!("{} | {} | lap {}/{}", index + 1, entry.name, lap, laps_target)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn final_ranking_text(ranking: &[RankEntry], elapsed: Duration) -> String {
    let mut text = format!("--- finished in {:.2} secs. ---", elapsed.as_secs_f64());
    for entry in ranking {
        text.push('\n');
        text.push_str(&entry.name);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(player: PlayerID, score: Score, distance_to_next: f64) -> RankEntry {
        RankEntry {
            player,
            name: format!("p{}", player),
            score,
            lap: 0,
            distance_to_next,
            finished: false,
        }
    }

    #[test]
    fn test_score_then_distance() {
        let mut ranking = vec![
            entry(0, 3, 1.0),
            entry(1, 5, 50.0),
            entry(2, 3, 0.5),
            entry(3, 5, 10.0),
        ];
        rank(&mut ranking);
        let order: Vec<PlayerID> = ranking.iter().map(|e| e.player).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_texts() {
        let mut first = entry(0, 12, 0.0);
        first.lap = 3;
        let second = entry(1, 2, 4.0);
        let ranking = vec![first, second];

        assert_eq!(
            standings_text(&ranking, 3),
            "1 | p0 | lap 3/3\n2 | p1 | lap 1/3"
        );
        assert_eq!(
            final_ranking_text(&ranking, Duration::from_millis(61_234)),
            "--- finished in 61.23 secs. ---\np0\np1"
        );
    }
}
