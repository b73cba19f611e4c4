//! Command-line interface for geotally
//!
//! Provides argument parsing and subcommand handling for the geotally binary.

use clap::{Parser, Subcommand};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Demo HTTP service for exercising a CI/CD pipeline
#[derive(Parser)]
#[command(name = "geotally")]
#[command(version)]
#[command(about = "Demo HTTP service for exercising a CI/CD pipeline")]
#[command(
    long_about = "geotally serves a small set of text routes in one of three incremental \
    variants. The instrumented variant tags every request with a mock country and exposes \
    Prometheus metrics at /metrics."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Whether the config path was left at its default
    ///
    /// A missing default file falls back to built-in settings; a missing
    /// explicit file is an error.
    pub fn uses_default_config(&self) -> bool {
        self.config == DEFAULT_CONFIG_PATH
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# geotally Configuration
# =======================
#
# Every section is optional. Missing values fall back to the defaults shown here.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address literal to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for loopback only).
# Hostnames such as "localhost" are rejected.
host = "0.0.0.0"

# Port to listen on
port = 5000

# ─────────────────────────────────────────────────────────────────────────────
# APP VARIANT
# ─────────────────────────────────────────────────────────────────────────────
#
#   - "basic":        /, /health, /version, /about
#   - "extended":     basic + /status, /deploy, /dashboard, /api/data, /products
#   - "instrumented": extended + country tagging, /metrics and the demo
#                     fault endpoints (/forbidden, /buggy, /slow, /admin, /debug)

[app]
variant = "instrumented"

# ─────────────────────────────────────────────────────────────────────────────
# MOCK GEOLOCATION
# ─────────────────────────────────────────────────────────────────────────────
#
# Requests from a local address are labelled "Local". Every other request
# gets a country picked at random from `countries`.

[geo]
local_addresses = ["127.0.0.1", "::1", "localhost"]
countries = ["USA", "UK", "Germany", "France", "Japan", "India", "Brazil", "Canada", "Australia"]

# ─────────────────────────────────────────────────────────────────────────────
# DEMO ENDPOINTS
# ─────────────────────────────────────────────────────────────────────────────

[demo]
# /slow sleeps for a random duration in this range (milliseconds, max 10000)
slow_min_ms = 1000
slow_max_ms = 3000

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG overrides this when set.
log_level = "info"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::parse_from(["geotally"]);
        assert_eq!(cli.config, "config.toml");
        assert!(cli.uses_default_config());
        assert!(cli.command.is_none());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["geotally", "--config", "custom.toml"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(!cli.uses_default_config());
    }

    #[test]
    fn config_subcommand() {
        let cli = Cli::parse_from(["geotally", "config"]);
        assert!(matches!(cli.command, Some(Command::Config { output: None })));
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["geotally", "config", "-o", "my-config.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == "my-config.toml"
        ));
    }

    #[test]
    fn template_is_valid_toml() {
        let result: Result<toml::Value, _> = toml::from_str(generate_config_template());
        assert!(
            result.is_ok(),
            "Template should be valid TOML: {:?}",
            result.err()
        );
    }

    #[test]
    fn template_has_all_sections() {
        let template = generate_config_template();
        assert!(template.contains("[server]"));
        assert!(template.contains("[app]"));
        assert!(template.contains("[geo]"));
        assert!(template.contains("[demo]"));
        assert!(template.contains("[observability]"));
    }
}
