//! ASCII command set spoken by the rotator controller.
//!
//! Every command and reply is a single line terminated by `\n`:
//!
//! ```text
//! TX  PING                          handshake request
//! RX  PONG                          handshake accepted
//! RX  ready                         controller accepts the next move
//! TX  GOT <alt> <az> <duration_ms>  move both axes over the duration
//! TX  STOW / UNSTOW                 park / un-park the antenna
//! TX  SAZ <angle>                   set the current azimuth reference
//! ```

use std::fmt;
use std::str::FromStr;

pub const PONG: &str = "PONG";
pub const READY: &str = "ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Move {
        altitude: i32,
        azimuth: i32,
        duration_millis: u64,
    },
    Stow,
    Unstow,
    SetAzimuth(i32),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping => write!(f, "PING"),
            Command::Move {
                altitude,
                azimuth,
                duration_millis,
            } => write!(f, "GOT {} {} {}", altitude, azimuth, duration_millis),
            Command::Stow => write!(f, "STOW"),
            Command::Unstow => write!(f, "UNSTOW"),
            Command::SetAzimuth(angle) => write!(f, "SAZ {}", angle),
        }
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| "empty command".to_string())?;
        let args: Vec<&str> = parts.collect();

        let command = match (verb, args.as_slice()) {
            ("PING", []) => Command::Ping,
            ("STOW", []) => Command::Stow,
            ("UNSTOW", []) => Command::Unstow,
            ("SAZ", [angle]) => Command::SetAzimuth(parse_arg(angle)?),
            ("GOT", [altitude, azimuth, duration]) => Command::Move {
                altitude: parse_arg(altitude)?,
                azimuth: parse_arg(azimuth)?,
                duration_millis: parse_arg(duration)?,
            },
            _ => return Err(format!("unrecognized command: {:?}", line)),
        };
        Ok(command)
    }
}

fn parse_arg<T: FromStr>(arg: &str) -> Result<T, String> {
    arg.parse()
        .map_err(|_| format!("invalid argument: {:?}", arg))
}
