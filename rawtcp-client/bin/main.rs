//! A tcp client over a raw socket.
//!
//! Connects to the given host, sends a single message and prints everything the server answers
//! until it closes the connection or the wait time is over. Requires `CAP_NET_RAW`, usually root.
//!
//! The kernel does not know about the connection and may answer the server's segments with resets
//! on its own. Drop those first for a smooth run, for example:
//!
//! * `iptables -A OUTPUT -p tcp --tcp-flags RST RST -j DROP`
//!
//! Call example:
//!
//! * `rawtcp-client 127.0.0.1 80 --wait-ms 2000`
use rawtcp_client::config::Config;

#[cfg(target_os = "linux")]
fn main() {
    use std::io::{stdout, Write};

    env_logger::init();
    let config = Config::from_args();

    println!("[+] Connecting to {}:{}", config.remote, config.port);

    let out = stdout();
    let mut sink = match rawtcp_client::exchange_raw(out.lock(), &config) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("[-] {}", err);
            std::process::exit(1);
        },
    };

    if let Some(err) = sink.take_error() {
        eprintln!("[-] Writing the answer failed: {}", err);
    }

    let mut out = sink.into_inner();
    writeln!(out).expect("Couldn't write to stdout");
    println!("[+] Done");
}

#[cfg(not(target_os = "linux"))]
fn main() {
    env_logger::init();
    let config = Config::from_args();
    eprintln!("[-] Cannot connect to {}:{}, raw sockets are only supported on Linux",
              config.remote, config.port);
    std::process::exit(1);
}
