#[cfg(unix)]
use std::path::PathBuf;

use clap::{Args, Parser};

use crate::midi::DEFAULT_PORT_NAME;

/// flstudio-mcp - MCP server bridging AI assistants to FL Studio over MIDI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// MIDI port name, used for both input and output
    #[arg(long, env = "FLSTUDIO_MIDI_PORT", default_value = DEFAULT_PORT_NAME)]
    pub midi_port: String,

    #[command(flatten)]
    pub transport: TransportArgs,

    /// Default log directive when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// List available MIDI ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

/// Transport selection. Stdio is the only transport off Unix.
#[cfg(unix)]
#[derive(Args, Debug, Clone, Default)]
pub struct TransportArgs {
    /// Serve on this Unix socket instead of stdio
    #[arg(long, env = "FLSTUDIO_MCP_SOCKET")]
    pub socket: Option<PathBuf>,
}

#[cfg(not(unix))]
#[derive(Args, Debug, Clone, Default)]
pub struct TransportArgs {}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Config::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["flstudio-mcp"]).unwrap();
        // Env fallbacks may be set on the test machine
        if std::env::var_os("FLSTUDIO_MIDI_PORT").is_none() {
            assert_eq!(config.midi_port, "FLStudio_MIDI");
        }
        #[cfg(unix)]
        if std::env::var_os("FLSTUDIO_MCP_SOCKET").is_none() {
            assert!(config.transport.socket.is_none());
        }
        assert_eq!(config.log_level, "info");
        assert!(!config.list_ports);
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "flstudio-mcp",
            "--midi-port",
            "loopMIDI Port",
            "--log-level",
            "debug",
            "--list-ports",
        ])
        .unwrap();
        assert_eq!(config.midi_port, "loopMIDI Port");
        assert_eq!(config.log_level, "debug");
        assert!(config.list_ports);
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_flag() {
        let config = Config::try_parse_from(["flstudio-mcp", "--socket", "/tmp/fl.sock"]).unwrap();
        assert_eq!(config.transport.socket, Some(PathBuf::from("/tmp/fl.sock")));
    }

    #[cfg(not(unix))]
    #[test]
    fn test_socket_flag_unavailable() {
        assert!(Config::try_parse_from(["flstudio-mcp", "--socket", "fl.sock"]).is_err());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Config::try_parse_from(["flstudio-mcp", "--theme", "dark"]).is_err());
    }
}
