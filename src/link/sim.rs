use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::protocol::{Command, PONG, READY};
use super::transport::{Connector, LinkSettings, Transport};

// Stand-in for the serial read timeout when no line is pending.
const POLL_DELAY: Duration = Duration::from_millis(5);

/// In-process rotator controller speaking the line protocol.
///
/// Answers `PING` with `PONG`, then reports `ready`, and reports `ready`
/// again after every `GOT`. Clones share the same device, so a test can
/// hand one clone to a link and inspect the other.
#[derive(Debug, Clone)]
pub struct SimulatedRotator {
    device: Arc<Mutex<Device>>,
}

#[derive(Debug)]
struct Device {
    ping_reply: Option<String>,
    reports_ready: bool,
    refuse_connections: bool,
    write_budget: Option<usize>,
    received: Vec<String>,
    outbox: VecDeque<String>,
    pointing: Option<(i32, i32)>,
}

impl Default for SimulatedRotator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRotator {
    pub fn new() -> Self {
        Self {
            device: Arc::new(Mutex::new(Device {
                ping_reply: Some(PONG.to_string()),
                reports_ready: true,
                refuse_connections: false,
                write_budget: None,
                received: Vec::new(),
                outbox: VecDeque::new(),
                pointing: None,
            })),
        }
    }

    /// Reply sent to `PING`; `None` leaves the handshake unanswered.
    pub fn with_ping_reply(self, reply: Option<&str>) -> Self {
        self.device.lock().unwrap().ping_reply = reply.map(String::from);
        self
    }

    /// Never reports `ready`.
    pub fn without_ready(self) -> Self {
        self.device.lock().unwrap().reports_ready = false;
        self
    }

    pub fn refusing_connections(self) -> Self {
        self.device.lock().unwrap().refuse_connections = true;
        self
    }

    /// Accepts `lines` writes, then fails every further write.
    pub fn failing_after(self, lines: usize) -> Self {
        self.device.lock().unwrap().write_budget = Some(lines);
        self
    }

    /// Every line the device has received, oldest first.
    pub fn received(&self) -> Vec<String> {
        self.device.lock().unwrap().received.clone()
    }

    /// Received move commands, decoded.
    pub fn moves(&self) -> Vec<Command> {
        self.received()
            .iter()
            .filter_map(|line| line.parse().ok())
            .filter(|command| matches!(command, Command::Move { .. }))
            .collect()
    }

    /// Last commanded (altitude, azimuth).
    pub fn pointing(&self) -> Option<(i32, i32)> {
        self.device.lock().unwrap().pointing
    }
}

impl Connector for SimulatedRotator {
    type Transport = SimulatedPort;

    fn open(&self, settings: &LinkSettings) -> io::Result<SimulatedPort> {
        let mut device = self.device.lock().unwrap();
        if device.refuse_connections {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no device at {}", settings.port),
            ));
        }
        device.outbox.clear();

        Ok(SimulatedPort {
            device: self.device.clone(),
        })
    }
}

pub struct SimulatedPort {
    device: Arc<Mutex<Device>>,
}

impl Transport for SimulatedPort {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut device = self.device.lock().unwrap();

        if let Some(budget) = device.write_budget.as_mut() {
            if *budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
            }
            *budget -= 1;
        }
        device.received.push(line.to_string());

        match line.parse::<Command>() {
            Ok(Command::Ping) => {
                if let Some(reply) = device.ping_reply.clone() {
                    let answered = reply == PONG;
                    device.outbox.push_back(reply);
                    if answered && device.reports_ready {
                        device.outbox.push_back(READY.to_string());
                    }
                }
            }
            Ok(Command::Move {
                altitude, azimuth, ..
            }) => {
                device.pointing = Some((altitude, azimuth));
                if device.reports_ready {
                    device.outbox.push_back(READY.to_string());
                }
            }
            Ok(_) => {}
            Err(e) => log::debug!("Simulated rotator ignoring line: {}", e),
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let line = self.device.lock().unwrap().outbox.pop_front();
        if line.is_none() {
            thread::sleep(POLL_DELAY);
        }
        Ok(line)
    }
}
