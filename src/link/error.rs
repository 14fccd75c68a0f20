use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("handshake failed: {}", describe_reply(.reply))]
    Handshake { reply: Option<String> },
}

impl LinkError {
    /// True when the failure means nothing is listening on the other end,
    /// as opposed to a device that answered with something unexpected.
    pub fn is_no_hardware(&self) -> bool {
        matches!(
            self,
            LinkError::Connection { .. } | LinkError::Handshake { reply: None }
        )
    }
}

fn describe_reply(reply: &Option<String>) -> String {
    match reply {
        Some(line) => format!("expected PONG, got {:?}", line),
        None => "no response".to_string(),
    }
}
