use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};

use tracing::trace;

use super::Packet;
use crate::error::NetworkError;

// every packet is preceded by its payload size as a big-endian u16
const HEADER_SIZE: usize = 2;
const READ_CHUNK_SIZE: usize = 4096;

fn classify(error: io::Error) -> NetworkError {
    match error.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => NetworkError::Disconnected,
        _ => NetworkError::Io(error),
    }
}

pub struct Connection<T: Packet, V: Packet> {
    tcp_stream: TcpStream,
    // bytes received but not yet making up a whole packet
    read_buffer: Vec<u8>,
    incoming_packets: VecDeque<T>,
    outgoing_packets: VecDeque<V>,
}

impl<T: Packet, V: Packet> Connection<T, V> {
    pub fn new(tcp_stream: TcpStream) -> Result<Connection<T, V>, NetworkError> {
        // disable the Nagle algorithm to allow for real-time transfers
        tcp_stream.set_nodelay(true)?;
        Ok(Connection {
            tcp_stream,
            read_buffer: Vec::new(),
            incoming_packets: VecDeque::new(),
            outgoing_packets: VecDeque::new(),
        })
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.tcp_stream.peer_addr().ok()
    }

    /// Takes whatever is waiting on the socket without ever blocking, and
    /// queues every packet that is now complete. A packet that is only
    /// partly here stays buffered until the next call. An error means the
    /// connection is done for.
    pub fn sync_incoming(&mut self) -> Result<(), NetworkError> {
        // allows us to keep going if there's no input
        self.tcp_stream.set_nonblocking(true)?;

        let mut closed = false;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.tcp_stream.read(&mut chunk) {
                Ok(0) => {
                    closed = true;
                    break;
                }
                Ok(read) => self.read_buffer.extend_from_slice(&chunk[..read]),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(classify(e)),
            }
        }

        self.parse_buffered()?;
        if closed {
            return Err(NetworkError::Disconnected);
        }
        Ok(())
    }

    fn parse_buffered(&mut self) -> Result<(), NetworkError> {
        let mut consumed = 0;
        loop {
            let pending = &self.read_buffer[consumed..];
            if pending.len() < HEADER_SIZE {
                break;
            }
            let packet_size = u16::from_be_bytes([pending[0], pending[1]]) as usize;
            if pending.len() < HEADER_SIZE + packet_size {
                break;
            }

            let mut payload = &pending[HEADER_SIZE..HEADER_SIZE + packet_size];
            let packet = T::parse_packet(&mut payload)?;
            trace!(bytes = packet_size, "received packet");
            self.incoming_packets.push_back(packet);
            consumed += HEADER_SIZE + packet_size;
        }
        self.read_buffer.drain(..consumed);
        Ok(())
    }

    pub fn pop_incoming(&mut self) -> Option<T> {
        self.incoming_packets.pop_front()
    }

    pub fn push_outgoing(&mut self, packet: V) {
        self.outgoing_packets.push_back(packet);
    }

    // send packets on this connection until exhausted
    pub fn sync_outgoing(&mut self) -> Result<(), NetworkError> {
        self.tcp_stream.set_nonblocking(false)?;
        while let Some(packet) = self.outgoing_packets.pop_front() {
            let size = packet.packet_size()?;
            let size = u16::try_from(size).map_err(|_| NetworkError::Oversized(size))?;

            let mut frame = Vec::with_capacity(HEADER_SIZE + size as usize);
            frame.extend_from_slice(&size.to_be_bytes());
            packet.write_packet(&mut frame)?;
            self.tcp_stream.write_all(&frame).map_err(classify)?;
            trace!(bytes = size, "sent packet");
        }
        Ok(())
    }
}
