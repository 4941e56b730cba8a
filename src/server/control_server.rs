use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use log::*;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use vclock::control::MAX_COMMAND_LEN;
use vclock::{ClockError, ControlInterface};

/// Serves the control protocol, one request per line, until the listener fails.
pub struct ControlServer {
    listener: TcpListener,
    control: ControlInterface,
}

impl ControlServer {
    pub async fn bind(address: &str, control: ControlInterface) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self { listener, control })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!("Control connection from {peer}");
            let control = self.control.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::serve_connection(stream, control).await {
                    warn!("Control connection {peer} closed: {e}");
                }
            });
        }
    }

    async fn serve_connection(
        stream: TcpStream,
        control: ControlInterface,
    ) -> Result<(), LinesCodecError> {
        let mut lines = Framed::new(stream, LinesCodec::new_with_max_length(MAX_COMMAND_LEN));
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    let err = ClockError::CommandTooLong;
                    warn!("Rejected control write: {err}");
                    lines.send(format!("ERR {} {err}", err.code())).await?;
                    // A decode error ends the stream. The rebuilt one keeps the
                    // codec, which skips the rest of the overlong line.
                    lines = Framed::from_parts(lines.into_parts());
                    continue;
                }
                Err(e) => return Err(e),
            };
            let reply = control.execute_line(&line);
            if reply.starts_with("ERR") {
                warn!("Rejected control write {line:?}: {reply}");
            }
            // Multi-line reports end with an empty line
            lines.send(reply.trim_end_matches('\n').to_string()).await?;
            if reply.ends_with('\n') {
                lines.send(String::new()).await?;
            }
        }
        Ok(())
    }
}
