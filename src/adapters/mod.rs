pub mod network;
pub mod resolver;
pub mod transport;

pub use network::NetworkContext;
pub use resolver::{Resolver, SystemResolver};
pub use transport::{DatagramSocket, StdUdpTransport, UdpTransport};
