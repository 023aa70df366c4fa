use std::fs;
use std::path::Path;

use glam::DVec3;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::TrackError;
use crate::player::lap_info::CheckpointID;

/// A race track as far as the session cares: the ordered checkpoints that make
/// up a lap and the ordered grid the cars start from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub checkpoints: Vec<DVec3>,
    pub start_positions: Vec<DVec3>,
    #[serde(default)]
    pub start_heading_degrees: f64,
}

impl Track {
    /// Reads a YAML track description.
    pub fn load(path: &Path) -> Result<Track, TrackError> {
        let contents = fs::read_to_string(path).map_err(|source| TrackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let track: Track = serde_yaml::from_str(&contents)?;
        info!(track = %track.name, path = %path.display(), "loaded track file");
        Ok(track)
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Logs the problems that leave a race degraded; returns true if there were none.
    pub fn validate(&self) -> bool {
        let mut valid = true;
        if self.checkpoints.is_empty() {
            warn!(track = %self.name, "track has no checkpoints, nobody will be able to finish");
            valid = false;
        }
        if self.start_positions.is_empty() {
            warn!(track = %self.name, "track has no start positions, cars start at the origin");
            valid = false;
        }
        valid
    }

    pub fn start_position(&self, slot: usize) -> Option<DVec3> {
        self.start_positions.get(slot).copied()
    }

    // Ranking tie-breaks pass the participant's next expected checkpoint here.
    // 0 on a track without checkpoints so that ties stay ties
    pub fn distance_to_checkpoint(&self, position: DVec3, checkpoint: CheckpointID) -> f64 {
        if self.checkpoints.is_empty() {
            return 0.0;
        }
        let target = self.checkpoints[checkpoint % self.checkpoints.len()];
        position.distance(target)
    }
}

fn ring(radius: f64, count: usize) -> Vec<DVec3> {
    (0..count)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / count as f64;
            DVec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
        })
        .collect()
}

fn grid(origin: DVec3, count: usize) -> Vec<DVec3> {
    (0..count)
        .map(|i| origin + DVec3::new(3.0 * (i % 2) as f64, 0.0, -5.0 * (i / 2) as f64))
        .collect()
}

lazy_static! {
    pub static ref BUILTIN_TRACKS: Vec<Track> = vec![
        Track {
            name: "oval".to_string(),
            checkpoints: ring(60.0, 4),
            start_positions: grid(DVec3::new(60.0, 0.0, -10.0), 4),
            start_heading_degrees: 0.0,
        },
        Track {
            name: "canyon".to_string(),
            checkpoints: ring(120.0, 6),
            start_positions: grid(DVec3::new(120.0, 0.0, -10.0), 4),
            start_heading_degrees: 0.0,
        },
    ];
}

/// Resolves a track by name: built-in tracks first, then `<dir>/<name>.yaml`.
pub fn find_track(name: &str, dir: &Path) -> Result<Track, TrackError> {
    if let Some(track) = BUILTIN_TRACKS.iter().find(|track| track.name == name) {
        return Ok(track.clone());
    }

    let path = dir.join(format!("{}.yaml", name));
    if !path.exists() {
        return Err(TrackError::Unknown(name.to_string()));
    }
    Track::load(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tracks_are_valid() {
        for track in BUILTIN_TRACKS.iter() {
            assert!(track.validate(), "{} should be valid", track.name);
        }
    }

    #[test]
    fn test_find_track_prefers_builtin() {
        let track = find_track("oval", Path::new("does-not-exist")).unwrap();
        assert_eq!(track.checkpoint_count(), 4);
    }

    #[test]
    fn test_unknown_track() {
        let err = find_track("moon-base", Path::new("does-not-exist")).unwrap_err();
        assert!(matches!(err, TrackError::Unknown(name) if name == "moon-base"));
    }

    #[test]
    fn test_load_yaml_track() {
        let dir = std::env::temp_dir().join(format!("slipstream-tracks-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("hairpin.yaml"),
            "name: hairpin\ncheckpoints:\n  - [0.0, 0.0, 10.0]\n  - [0.0, 0.0, 20.0]\nstart_positions:\n  - [0.0, 0.0, 0.0]\n",
        )
        .unwrap();

        let track = find_track("hairpin", &dir).unwrap();
        assert_eq!(track.checkpoint_count(), 2);
        assert_eq!(track.start_heading_degrees, 0.0);
        assert_eq!(track.start_position(0), Some(DVec3::ZERO));
        assert_eq!(track.start_position(1), None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_distance_to_checkpoint() {
        let track = Track {
            name: "line".to_string(),
            checkpoints: vec![DVec3::new(0.0, 0.0, 10.0), DVec3::new(0.0, 0.0, 20.0)],
            start_positions: vec![],
            start_heading_degrees: 0.0,
        };
        assert_eq!(track.distance_to_checkpoint(DVec3::ZERO, 1), 20.0);
        // wraps around
        assert_eq!(track.distance_to_checkpoint(DVec3::ZERO, 2), 10.0);

        let empty = Track {
            checkpoints: vec![],
            ..track
        };
        assert_eq!(empty.distance_to_checkpoint(DVec3::ONE, 0), 0.0);
        assert!(!empty.validate());
    }
}
