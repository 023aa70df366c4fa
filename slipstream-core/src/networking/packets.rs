use std::io::{Read, Write};

use bincode::{DefaultOptions, Options, Result};
use glam::DVec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::lobby::LobbyEvent;
use crate::player::{
    choices::Participant,
    lap_info::{CheckpointID, LapNumber},
    player_inputs::ControlState,
    PlayerID,
};
use crate::race::{RankEntry, RaceNotification};
use crate::replication::VehicleState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerBoundPacket {
    // In the lobby
    VehicleSelect(usize),
    TrackSelect(usize),
    SetReadyStatus(bool),
    NotifyLoaded,

    // During the race
    VehicleUpdate {
        control: ControlState,
        position: DVec3,
    },
    CheckpointCrossed(CheckpointID),

    // Any time after the race has started
    ReturnToLobby,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientBoundPacket {
    // In the lobby
    PlayerNumber(PlayerID, Vec<Participant>), // Your slot, and everybody already here
    PlayerJoined(Participant),
    PlayerLeft(PlayerID),
    PlayerVehicleChoice(PlayerID, usize),
    TrackChoice(usize),
    PlayerReadyStatus(PlayerID, bool),

    // Everybody's ready; load this track and tell us when you're done
    LoadRace(String),

    // Race lifecycle, straight from the authority
    Race(RaceNotification),

    // During the race
    VehicleStates(Vec<VehicleState>),
    Standings(Vec<RankEntry>),
    LapUpdate(LapNumber), // What lap are you now on?
}

impl From<LobbyEvent> for ClientBoundPacket {
    fn from(event: LobbyEvent) -> Self {
        match event {
            LobbyEvent::Joined(participant) => ClientBoundPacket::PlayerJoined(participant),
            LobbyEvent::Left(player) => ClientBoundPacket::PlayerLeft(player),
            LobbyEvent::VehicleChanged(player, vehicle) => {
                ClientBoundPacket::PlayerVehicleChoice(player, vehicle)
            }
            LobbyEvent::TrackChanged(track) => ClientBoundPacket::TrackChoice(track),
            LobbyEvent::ReadinessChanged(player, ready) => {
                ClientBoundPacket::PlayerReadyStatus(player, ready)
            }
        }
    }
}

pub trait Packet: Serialize + DeserializeOwned {
    fn parse_packet<R: Read>(reader: &mut R) -> Result<Self> {
        DefaultOptions::new().deserialize_from(reader)
    }
    fn packet_size(&self) -> Result<u64> {
        DefaultOptions::new().serialized_size(self)
    }
    fn write_packet<W: Write>(&self, write: &mut W) -> Result<()> {
        DefaultOptions::new().serialize_into(write, self)
    }
}

impl Packet for ClientBoundPacket {}
impl Packet for ServerBoundPacket {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_events_map_to_packets() {
        assert_eq!(
            ClientBoundPacket::from(LobbyEvent::ReadinessChanged(2, true)),
            ClientBoundPacket::PlayerReadyStatus(2, true)
        );
        assert_eq!(
            ClientBoundPacket::from(LobbyEvent::TrackChanged(1)),
            ClientBoundPacket::TrackChoice(1)
        );
    }

    #[test]
    fn test_size_matches_written_bytes() {
        let packet = ServerBoundPacket::VehicleUpdate {
            control: ControlState::new(-0.25, 1.0),
            position: DVec3::new(1.0, 2.0, 3.0),
        };
        let mut buffer = Vec::new();
        packet.write_packet(&mut buffer).unwrap();
        assert_eq!(packet.packet_size().unwrap(), buffer.len() as u64);
        assert_eq!(
            ServerBoundPacket::parse_packet(&mut buffer.as_slice()).unwrap(),
            packet
        );
    }
}
