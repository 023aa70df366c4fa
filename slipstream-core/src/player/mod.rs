pub mod choices;
pub mod input_device;
pub mod lap_info;
pub mod player_inputs;

pub type PlayerID = usize;
