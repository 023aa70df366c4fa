mod connection;
mod packets;

pub use connection::Connection;
pub use packets::*;

// the server's end of a client connection, and the client's end of the server
pub type ClientConnection = Connection<ServerBoundPacket, ClientBoundPacket>;
pub type ServerConnection = Connection<ClientBoundPacket, ServerBoundPacket>;
