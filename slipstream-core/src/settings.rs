use config::{Config, ConfigError, File};
use lazy_static::lazy_static;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct Settings {
    pub port: String,
    pub server_address: String,
    pub server_tick_ms: u64,
    pub max_players: usize,

    // race rules
    pub lap_target: u32,
    pub countdown_secs: f64,
    pub network_min_countdown_secs: f64,
    pub bots_first_in_starting_line: bool,
    pub no_collisions: bool,
    pub network_no_collisions: bool,

    // lobby content, looked up by selection index
    pub vehicles: Vec<String>,
    pub tracks: Vec<String>,
    pub track_dir: String,

    pub log_filter: String,
}

impl Settings {
    fn new() -> Result<Settings, ConfigError> {
        let config = Config::builder()
            .set_default("port", "24247")?
            .set_default("server_address", "0.0.0.0")?
            .set_default("server_tick_ms", 30)?
            .set_default("max_players", 4)?
            .set_default("lap_target", 3)?
            .set_default("countdown_secs", 3.0)?
            .set_default("network_min_countdown_secs", 2.0)?
            .set_default("bots_first_in_starting_line", true)?
            .set_default("no_collisions", false)?
            .set_default("network_no_collisions", true)?
            .set_default(
                "vehicles",
                vec!["peralta", "teller", "underwood", "winchester"],
            )?
            .set_default("tracks", vec!["oval", "canyon"])?
            .set_default("track_dir", "tracks")?
            .set_default("log_filter", "info")?
            .add_source(File::with_name("config.yaml").required(false))
            .build()?;

        config.try_deserialize()
    }
}

lazy_static! {
    pub static ref GLOBAL_CONFIG: Settings = Settings::new().expect("failed to read config file");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let settings = Settings::new().unwrap();
        assert_eq!(settings.max_players, 4);
        assert_eq!(settings.lap_target, 3);
        assert_eq!(settings.tracks, vec!["oval", "canyon"]);
        assert_eq!(settings.vehicles.len(), 4);
    }
}
