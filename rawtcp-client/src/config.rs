use std::net;
use std::time::Duration;

use structopt::StructOpt;

use rawtcp::layer::tcp::Options;
use rawtcp::wire::Checksum;

#[derive(Clone, Debug, StructOpt)]
#[structopt(
    name = "rawtcp-client",
    about = "Send one message over a hand-built TCP connection and print the answer.",
)]
pub struct Config {
    /// Address of the server.
    #[structopt(default_value = "127.0.0.1")]
    pub remote: net::Ipv4Addr,

    /// Port of the server.
    #[structopt(default_value = "80")]
    pub port: u16,

    /// Our own address, written into every datagram.
    #[structopt(long, default_value = "127.0.0.1")]
    pub local: net::Ipv4Addr,

    /// A fixed local port instead of an ephemeral one.
    #[structopt(long)]
    pub local_port: Option<u16>,

    /// The message sent once connected.
    #[structopt(short, long, default_value = "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")]
    pub message: String,

    /// Longest single wait for a datagram, in milliseconds.
    #[structopt(long, default_value = "1000")]
    pub poll_ms: u64,

    /// How long to wait for the answer before closing, in milliseconds.
    #[structopt(long, default_value = "2000")]
    pub wait_ms: u64,

    /// Give up on an unresponsive server after this many milliseconds.
    #[structopt(long)]
    pub linger_ms: Option<u64>,

    /// Drop inbound datagrams with a wrong checksum.
    #[structopt(long)]
    pub verify_checksums: bool,
}

impl Config {
    pub fn from_args() -> Self {
        StructOpt::from_args()
    }

    pub fn options(&self) -> Options {
        Options {
            local_addr: self.local.into(),
            local_port: self.local_port,
            poll_timeout: Duration::from_millis(self.poll_ms),
            checksum: if self.verify_checksums { Checksum::Manual } else { Checksum::Ignored },
            linger: self.linger_ms.map(Duration::from_millis),
            ..Options::default()
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawtcp::wire::Ipv4Address;

    #[test]
    fn defaults() {
        let config = Config::from_iter(&["rawtcp-client"]);
        assert_eq!(config.remote, net::Ipv4Addr::LOCALHOST);
        assert_eq!(config.port, 80);
        assert_eq!(config.message, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");

        let options = config.options();
        assert_eq!(options.local_addr, Ipv4Address::LOCALHOST);
        assert_eq!(options.local_port, None);
        assert_eq!(options.checksum, Checksum::Ignored);
        assert_eq!(options.linger, None);
        assert_eq!(options.poll_timeout, Duration::from_secs(1));
    }

    #[test]
    fn flags() {
        let config = Config::from_iter(&[
            "rawtcp-client",
            "10.0.0.2", "8080",
            "--local", "10.0.0.1",
            "--local-port", "40000",
            "-m", "ping",
            "--linger-ms", "500",
            "--verify-checksums",
        ]);

        assert_eq!(config.remote, net::Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(config.port, 8080);
        assert_eq!(config.message, "ping");

        let options = config.options();
        assert_eq!(options.local_addr, Ipv4Address::new(10, 0, 0, 1));
        assert_eq!(options.local_port, Some(40000));
        assert_eq!(options.checksum, Checksum::Manual);
        assert_eq!(options.linger, Some(Duration::from_millis(500)));
    }
}
