#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use session_signal_server::config;
use session_signal_server::logging;
use session_signal_server::server::{ServerConfig, SignalServer};
use session_signal_server::websocket;
use std::net::SocketAddr;

/// Session signal server -- in-memory WebSocket signaling for one-to-one WebRTC sessions
#[derive(Parser, Debug)]
#[command(name = "session-signal-server")]
#[command(about = "An in-memory WebSocket signaling server pairing a host with one guest per room")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON, secrets masked) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg.redacted())
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() only reports validation problems; here they decide the exit code.
    let validation_result = config::validate_config_security(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!(
                    "  Admin auth required: {}",
                    cfg.security.require_admin_auth
                );
                println!(
                    "  Shared room required for signals: {}",
                    cfg.server.require_shared_room_for_signal
                );
                println!("  Idle room timeout (s): {}", cfg.server.idle_room_timeout);
                println!(
                    "  Registration timeout (s): {}",
                    cfg.websocket.registration_timeout_secs
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting session signal server");

    let server = SignalServer::new(ServerConfig::from_config(&cfg), cfg.protocol.clone());

    websocket::run_server(addr, server, &cfg.security.cors_origins).await
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["session-signal-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_long() {
        let cli = Cli::try_parse_from(["session-signal-server", "--validate-config"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_short() {
        let cli = Cli::try_parse_from(["session-signal-server", "-c"]).unwrap();
        assert!(cli.validate_config);
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["session-signal-server", "--print-config"]).unwrap();
        assert!(!cli.validate_config);
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        let result =
            Cli::try_parse_from(["session-signal-server", "--validate-config", "--print-config"]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot be used with"));
    }

    #[test]
    fn test_cli_help_contains_flags() {
        let err = Cli::try_parse_from(["session-signal-server", "--help"]).unwrap_err();
        let help_text = err.to_string();
        assert!(help_text.contains("--validate-config"));
        assert!(help_text.contains("--print-config"));
    }
}
