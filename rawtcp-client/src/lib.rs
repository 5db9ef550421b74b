pub mod config;

use std::io::Write;

use rawtcp::layer::{Error, Result};
use rawtcp::layer::tcp::{Socket, State, WriteSink};
use rawtcp::nic::Transport;
use rawtcp::wire::Ipv4Address;

use config::Config;

/// Connect, send the configured message and print what arrives until the server closes or the
/// wait time is over, then close.
///
/// Returns the sink, so that the caller can check whether writing the answer failed.
pub fn exchange<T, W>(transport: T, out: W, config: &Config) -> Result<WriteSink<W>>
where
    T: Transport,
    W: Write,
{
    let remote = Ipv4Address::from(config.remote);
    let sink = WriteSink::new(out);
    let mut socket = Socket::connect(transport, sink, config.options(), remote, config.port)?;
    log::info!("connecting to {}:{} from port {}", remote, config.port,
               socket.connection().tuple.local_port);

    socket.establish()?;
    log::info!("connection established");

    let sent = socket.send(config.message.as_bytes())?;
    log::info!("sent {} bytes", sent);

    let deadline = socket.transport().now() + config.wait();
    while socket.state() == State::Established && socket.transport().now() < deadline {
        socket.poll()?;
    }

    // Either we close now, or the server already did and only its last ACK is missing.
    socket.close()?;
    socket.run()?;
    log::info!("connection closed in {}", socket.state());

    let (_, sink) = socket.into_parts();
    Ok(sink)
}

/// Like `exchange` but over a fresh raw socket.
#[cfg(target_os = "linux")]
pub fn exchange_raw<W: Write>(out: W, config: &Config) -> Result<WriteSink<W>> {
    let transport = rawtcp::nic::sys::RawSocket::new()
        .map_err(Error::TransportUnavailable)?;
    exchange(transport, out, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawtcp::nic::External;
    use std::time::Duration;
    use structopt::StructOpt;

    #[test]
    fn silent_server_is_unreachable() {
        let config = Config::from_iter(&["rawtcp-client", "10.0.0.2", "80", "--linger-ms", "3000"]);
        let result = exchange(External::new(), Vec::new(), &config);
        assert!(matches!(result, Err(Error::PeerUnreachable)));
    }

    #[test]
    fn options_carry_timeouts() {
        let config = Config::from_iter(&["rawtcp-client", "--poll-ms", "250", "--wait-ms", "100"]);
        assert_eq!(config.options().poll_timeout, Duration::from_millis(250));
        assert_eq!(config.wait(), Duration::from_millis(100));
    }
}
