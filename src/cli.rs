//! Command line interface for the `oversend` demo binary.
//!
//! The demo starts an endpoint on an in-memory transport, sends a message
//! whose handler produces two oversized messages, then sends an oversized
//! message directly.

use clap::Parser;

/// Command line arguments for the `oversend` binary.
#[derive(Debug, Parser)]
#[command(name = "oversend", version, about = "Oversized send recovery demo")]
pub struct Cli {
    /// Largest payload, in bytes, the transport accepts.
    #[arg(long, default_value_t = 256 * 1024)]
    pub max_payload: usize,

    /// Length of the text carried by each oversized message.
    #[arg(long, default_value_t = 256 * 1024)]
    pub payload_size: usize,

    /// Number of characters kept when a message is adjusted.
    #[arg(long, default_value_t = 250)]
    pub truncate_to: usize,

    /// Milliseconds to keep processing looped-back messages before exiting.
    #[arg(long, default_value_t = 500)]
    pub linger_ms: u64,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults_match_the_standard_transport_limit() {
        let cli = Cli::parse_from(["oversend"]);
        assert_eq!(cli.max_payload, 256 * 1024);
        assert_eq!(cli.truncate_to, 250);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from(["oversend", "--max-payload", "100", "--truncate-to", "10"]);
        assert_eq!(cli.max_payload, 100);
        assert_eq!(cli.truncate_to, 10);
    }
}
