mod error;
mod motor_link;
mod protocol;
mod serial;
mod sim;
mod transport;

pub use error::LinkError;
pub use motor_link::{LinkState, MotorLink};
pub use protocol::{Command, PONG, READY};
pub use serial::{SerialConnector, SerialTransport};
pub use sim::{SimulatedPort, SimulatedRotator};
pub use transport::{Connector, LinkSettings, Transport};
