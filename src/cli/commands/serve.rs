//! Web server command.

use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::Context;

use crate::cli::icons;
use crate::config::Settings;

const DEFAULT_PORT: u16 = 5000;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(&settings.bind);
    let addr = resolve(&host, port)?;

    println!(
        "{} Starting BitBets server at http://{}",
        icons::info(),
        addr
    );
    println!("  {} Data directory: {}", icons::bullet(), settings.data_dir.display());
    println!(
        "  {} Backups every {}s, keeping {}",
        icons::bullet(),
        settings.backup_interval.as_secs(),
        settings.backup_keep
    );
    if settings.admin_token.is_some() {
        println!("  {} Admin token required for destructive endpoints", icons::bullet());
    }
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, addr).await
}

fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?
        .next()
        .with_context(|| format!("Bind address {}:{} did not resolve", host, port))
}

/// Parse a bind address that can be:
/// - Just a port: "5000" -> 0.0.0.0:5000
/// - Just a host: "127.0.0.1" -> 127.0.0.1:5000
/// - Host and port: "127.0.0.1:8080" -> 127.0.0.1:8080
fn parse_bind_address(bind: &str) -> (String, u16) {
    if let Ok(port) = bind.parse::<u16>() {
        return ("0.0.0.0".to_string(), port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.trim_matches(|c| c == '[' || c == ']').to_string(), port);
        }
    }

    (bind.to_string(), DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(parse_bind_address("8080"), ("0.0.0.0".to_string(), 8080));
        assert_eq!(
            parse_bind_address("127.0.0.1"),
            ("127.0.0.1".to_string(), 5000)
        );
        assert_eq!(
            parse_bind_address("127.0.0.1:9000"),
            ("127.0.0.1".to_string(), 9000)
        );
        assert_eq!(parse_bind_address("[::1]:9000"), ("::1".to_string(), 9000));
    }

    #[test]
    fn test_resolve_ip() {
        let addr = resolve("127.0.0.1", 5000).unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 5000)));
    }
}
