// Transport layer and session orchestration: datagram and relay variants
// of the same message pipeline.

pub mod error;
pub mod friend;
pub mod messenger;
pub mod print;
pub mod relay;
pub mod transport;
pub mod udp;

pub use error::{MessengerError, TransportError};
pub use friend::Friend;
pub use messenger::{inbound_channels, Messenger};
pub use print::Printer;
pub use relay::RelayTransport;
pub use transport::Transport;
pub use udp::DatagramTransport;
