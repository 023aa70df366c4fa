use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use slipstream_core::error::NetworkError;
use slipstream_core::networking::{ClientBoundPacket, ClientConnection};
use slipstream_core::{PlayerID, GLOBAL_CONFIG};
use tracing::{info, warn};

pub use self::state::{Outgoing, ServerGameState};

mod state;


pub struct GameServer {
    listener: TcpListener,
    connections: BTreeMap<PlayerID, ClientConnection>,
    game_state: ServerGameState,
}

impl GameServer {
    pub fn new(ip_addr: &str) -> Result<GameServer, NetworkError> {
        // start the TCP listening service
        let listener = TcpListener::bind(ip_addr)?;
        listener.set_nonblocking(true)?;
        info!(address = ip_addr, "game server now listening");

        Ok(GameServer {
            listener,
            connections: BTreeMap::new(),
            game_state: ServerGameState::from_settings(&GLOBAL_CONFIG),
        })
    }

    // WARNING: this function never returns
    pub fn start_loop(&mut self) {
        let max_server_tick_duration = Duration::from_millis(GLOBAL_CONFIG.server_tick_ms);
        let mut last_tick = Instant::now();

        loop {
            let start_time = Instant::now();
            let frame_dt = start_time.duration_since(last_tick);
            last_tick = start_time;

            self.accept_new_connections();

            // poll for input events and add them to the incoming packet queue
            let mut lost = Vec::new();
            for (slot, connection) in self.connections.iter_mut() {
                if let Err(e) = connection.sync_incoming() {
                    Self::log_lost_connection(*slot, &e);
                    lost.push(*slot);
                }
            }
            self.drop_connections(lost);

            self.process_incoming_packets();
            self.game_state.update(frame_dt);
            self.sync_state();

            // empty outgoing packet queue and send to clients
            let mut lost = Vec::new();
            for (slot, connection) in self.connections.iter_mut() {
                if let Err(e) = connection.sync_outgoing() {
                    Self::log_lost_connection(*slot, &e);
                    lost.push(*slot);
                }
            }
            self.drop_connections(lost);

            // wait until server tick time has elapsed
            match max_server_tick_duration.checked_sub(start_time.elapsed()) {
                Some(remaining_tick_duration) => thread::sleep(remaining_tick_duration),
                None => warn!(
                    tick_ms = start_time.elapsed().as_millis() as u64,
                    "server tick took longer than configured length"
                ),
            }
        }
    }

    // takes everybody waiting on the listener, as long as there's a free slot
    fn accept_new_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((socket, addr)) => {
                    let connection = match ClientConnection::new(socket) {
                        Ok(connection) => connection,
                        Err(e) => {
                            warn!(%addr, error = %e, "couldn't set up connection");
                            continue;
                        }
                    };
                    match self.game_state.player_joined() {
                        Some(slot) => {
                            info!(%addr, slot, "new connection");
                            self.connections.insert(slot, connection);
                        }
                        None => info!(%addr, "turning connection away, no free slot"),
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "couldn't get connecting client info");
                    break;
                }
            }
        }
    }

    fn log_lost_connection(slot: PlayerID, error: &NetworkError) {
        match error {
            NetworkError::Disconnected => info!(slot, "player disconnected"),
            _ => warn!(slot, error = %error, "dropping misbehaving connection"),
        }
    }

    fn drop_connections(&mut self, slots: Vec<PlayerID>) {
        for slot in slots {
            self.connections.remove(&slot);
            self.game_state.player_left(slot);
        }
    }

    // handle every packet in received order
    fn process_incoming_packets(&mut self) {
        for (slot, connection) in self.connections.iter_mut() {
            while let Some(packet) = connection.pop_incoming() {
                self.game_state.handle_packet(*slot, packet);
            }
        }
    }

    // queue up sending updated game state
    fn sync_state(&mut self) {
        for outgoing in self.game_state.drain_outgoing() {
            match outgoing {
                Outgoing::To(slot, packet) => {
                    if let Some(connection) = self.connections.get_mut(&slot) {
                        connection.push_outgoing(packet);
                    }
                }
                Outgoing::Broadcast(packet) => Self::broadcast(&mut self.connections, packet),
            }
        }
    }

    fn broadcast(connections: &mut BTreeMap<PlayerID, ClientConnection>, packet: ClientBoundPacket) {
        connections
            .values_mut()
            .for_each(|connection| connection.push_outgoing(packet.clone()));
    }
}
