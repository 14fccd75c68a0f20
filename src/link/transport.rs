use std::io;
use std::time::Duration;

use serde::Deserialize;

use crate::config::deserialize_duration;

const DEFAULT_BAUD_RATE: u32 = 9600;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
// Opening the port resets the controller board; give it time to boot.
const DEFAULT_SETTLE_TIME: Duration = Duration::from_secs(2);

/// Where the rotator controller lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkSettings {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Upper bound for a single blocking line read.
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,
    #[serde(
        default = "default_settle_time",
        deserialize_with = "deserialize_duration"
    )]
    pub settle_time: Duration,
}

impl LinkSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            settle_time: DEFAULT_SETTLE_TIME,
        }
    }
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_settle_time() -> Duration {
    DEFAULT_SETTLE_TIME
}

/// A line-oriented byte stream to the controller.
pub trait Transport: Send {
    /// Writes `line` followed by a newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Reads one line without its trailing whitespace. A read that times
    /// out before a full line arrives yields `Ok(None)`.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Opens transports. Kept separate from [`Transport`] so a link can be
/// closed and reopened, and so tests can hand in a scripted device.
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    fn open(&self, settings: &LinkSettings) -> io::Result<Self::Transport>;
}
