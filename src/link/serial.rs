use std::io::{self, BufRead, BufReader, Write};
use std::thread;

use serialport::SerialPort;

use super::transport::{Connector, LinkSettings, Transport};

/// Opens real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn open(&self, settings: &LinkSettings) -> io::Result<SerialTransport> {
        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .timeout(settings.timeout)
            .open()?;

        if !settings.settle_time.is_zero() {
            thread::sleep(settings.settle_time);
        }

        Ok(SerialTransport {
            lines: LineReader::new(BufReader::new(port)),
        })
    }
}

pub struct SerialTransport {
    lines: LineReader<BufReader<Box<dyn SerialPort>>>,
}

impl Transport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let port = self.lines.get_mut().get_mut();
        port.write_all(line.as_bytes())?;
        port.write_all(b"\n")?;
        port.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.lines.read_line()
    }
}

/// Newline-framed reads over a source with a read timeout. A line cut by
/// the timeout is kept and completed by the next call.
struct LineReader<R> {
    reader: R,
    // Bytes of a line whose newline has not arrived yet.
    partial: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            partial: Vec::new(),
        }
    }

    fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.reader.read_until(b'\n', &mut self.partial) {
            Ok(0) => Ok(None),
            Ok(_) if self.partial.ends_with(b"\n") => {
                let line = String::from_utf8_lossy(&self.partial).trim_end().to_string();
                self.partial.clear();
                Ok(Some(line))
            }
            Ok(_) => Ok(None),
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Read;

    /// Hands out one scripted chunk or error per read, then end of file.
    struct ScriptedPort(VecDeque<io::Result<&'static [u8]>>);

    impl ScriptedPort {
        fn lines(script: Vec<io::Result<&'static [u8]>>) -> LineReader<BufReader<Self>> {
            LineReader::new(BufReader::new(Self(script.into())))
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    fn timeout() -> io::Error {
        io::Error::new(io::ErrorKind::TimedOut, "read timed out")
    }

    #[test]
    fn test_line_cut_by_timeout_is_completed() {
        let mut lines = ScriptedPort::lines(vec![
            Ok(b"PO"),
            Err(timeout()),
            Ok(b"NG\nrea"),
            Ok(b"dy\r\n"),
        ]);

        assert_eq!(lines.read_line().unwrap(), None);
        assert_eq!(lines.read_line().unwrap().as_deref(), Some("PONG"));
        assert_eq!(lines.read_line().unwrap().as_deref(), Some("ready"));
        assert_eq!(lines.read_line().unwrap(), None);
    }

    #[test]
    fn test_silence_reads_as_nothing() {
        let mut lines = ScriptedPort::lines(vec![
            Err(timeout()),
            Err(io::Error::new(io::ErrorKind::WouldBlock, "no data")),
            Ok(b"ready\n"),
        ]);

        assert_eq!(lines.read_line().unwrap(), None);
        assert_eq!(lines.read_line().unwrap(), None);
        assert_eq!(lines.read_line().unwrap().as_deref(), Some("ready"));
    }

    #[test]
    fn test_partial_line_at_end_of_stream_is_held() {
        let mut lines = ScriptedPort::lines(vec![Ok(b"rea")]);
        assert_eq!(lines.read_line().unwrap(), None);
        assert_eq!(lines.partial, b"rea");
    }

    #[test]
    fn test_other_errors_propagate() {
        let mut lines = ScriptedPort::lines(vec![Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "unplugged",
        ))]);
        let err = lines.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
