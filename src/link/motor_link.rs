use serde::Serialize;

use super::error::LinkError;
use super::protocol::{Command, PONG};
use super::transport::{Connector, LinkSettings, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Connected,
    /// Connected and the controller answered the handshake.
    Ready,
    Closed,
}

/// Session with one rotator controller.
///
/// The link owns its transport exclusively. Sends on a link that is not
/// open are logged and dropped; only [`MotorLink::connect`] and
/// [`MotorLink::ping`] fail hard.
pub struct MotorLink<C: Connector> {
    connector: C,
    settings: LinkSettings,
    transport: Option<C::Transport>,
    state: LinkState,
}

impl<C: Connector> MotorLink<C> {
    pub fn new(connector: C, settings: LinkSettings) -> Self {
        Self {
            connector,
            settings,
            transport: None,
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn connect(&mut self) -> Result<(), LinkError> {
        if self.is_open() {
            log::debug!("Link to {} already open", self.settings.port);
            return Ok(());
        }

        match self.connector.open(&self.settings) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = LinkState::Connected;
                log::info!(
                    "Connected to {} at {} baud",
                    self.settings.port,
                    self.settings.baud_rate
                );
                Ok(())
            }
            Err(source) => {
                log::warn!("Connection to {} failed: {}", self.settings.port, source);
                self.state = LinkState::Disconnected;
                Err(LinkError::Connection {
                    port: self.settings.port.clone(),
                    source,
                })
            }
        }
    }

    /// Sends `PING` and waits for one line. Only an exact `PONG` makes the
    /// link ready; anything else, including silence, is a handshake error.
    pub fn ping(&mut self) -> Result<(), LinkError> {
        self.send(Command::Ping)?;
        let reply = self.receive_line()?;

        if reply.as_deref() == Some(PONG) {
            self.state = LinkState::Ready;
            log::info!("PONG received, link to {} is ready", self.settings.port);
            Ok(())
        } else {
            log::warn!("Handshake with {} failed: {:?}", self.settings.port, reply);
            Err(LinkError::Handshake { reply })
        }
    }

    /// Commands both axes to reach the given angles over `duration_millis`.
    /// Does not wait for the controller to acknowledge.
    pub fn send_move(
        &mut self,
        altitude: i32,
        azimuth: i32,
        duration_millis: u64,
    ) -> Result<(), LinkError> {
        self.send(Command::Move {
            altitude,
            azimuth,
            duration_millis,
        })
    }

    pub fn send_unstow(&mut self) -> Result<(), LinkError> {
        self.send(Command::Unstow)
    }

    pub fn send_stow(&mut self) -> Result<(), LinkError> {
        self.send(Command::Stow)
    }

    /// Tells the controller its current azimuth, read from an external compass.
    pub fn send_compass_calibration(&mut self, angle: i32) -> Result<(), LinkError> {
        self.send(Command::SetAzimuth(angle))
    }

    /// Reads one line. `None` when the link is closed or the read timed out.
    pub fn receive_line(&mut self) -> Result<Option<String>, LinkError> {
        let Some(transport) = self.transport.as_mut() else {
            log::warn!("Link to {} not open, nothing to receive", self.settings.port);
            return Ok(None);
        };

        let line = transport.read_line()?;
        if let Some(line) = &line {
            log::debug!("RX {:?}", line);
        }
        Ok(line)
    }

    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            self.state = LinkState::Closed;
            log::info!("Link to {} closed", self.settings.port);
        }
    }

    fn send(&mut self, command: Command) -> Result<(), LinkError> {
        let Some(transport) = self.transport.as_mut() else {
            log::warn!(
                "Link to {} not open, dropping {}",
                self.settings.port,
                command
            );
            return Ok(());
        };

        let line = command.to_string();
        transport.write_line(&line)?;
        log::debug!("TX {:?}", line);
        Ok(())
    }
}
