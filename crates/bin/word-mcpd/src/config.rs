use clap::Parser;
use std::error::Error;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TRANSPORT: &str = "stdio";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MCP_PATH: &str = "/mcp";
const DEFAULT_SSE_PATH: &str = "/sse";
const DEFAULT_LOG_LEVEL: &str = "INFO";
const DEFAULT_AUTHOR: &str = "Author";
const DEFAULT_LOCK_TTL_SECS: u64 = 300;
const DEFAULT_PDF_TIMEOUT_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(name = "word-mcpd", version, about = "Word document MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "MCP_TRANSPORT", default_value = DEFAULT_TRANSPORT)]
    transport: String,

    #[arg(long, env = "MCP_HOST", default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "PORT")]
    port: Option<u16>,

    #[arg(long, env = "MCP_PORT")]
    mcp_port: Option<u16>,

    #[arg(long, env = "MCP_PATH", default_value = DEFAULT_MCP_PATH)]
    mcp_path: String,

    #[arg(long, env = "MCP_SSE_PATH", default_value = DEFAULT_SSE_PATH)]
    sse_path: String,

    #[arg(long, env = "FASTMCP_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    #[arg(long, env = "MCP_AUTHOR", default_value = DEFAULT_AUTHOR)]
    author: String,

    #[arg(long, env = "MCP_AUTHOR_INITIALS")]
    author_initials: Option<String>,

    #[arg(long, env = "WORD_MCP_ROOT")]
    root: Option<PathBuf>,

    #[arg(
        long,
        env = "WORD_MCP_LOCK_TTL_SECS",
        default_value_t = DEFAULT_LOCK_TTL_SECS
    )]
    lock_ttl_secs: u64,

    #[arg(long, env = "WORD_MCP_LOCK_MAX")]
    lock_max: Option<usize>,

    #[arg(
        long,
        env = "WORD_MCP_PDF_TIMEOUT_SECS",
        default_value_t = DEFAULT_PDF_TIMEOUT_SECS
    )]
    pdf_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    StreamableHttp,
    Sse,
}

impl Transport {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "streamable-http" => Some(Self::StreamableHttp),
            "sse" => Some(Self::Sse),
            _ => None,
        }
    }
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: Transport,
    /// The unrecognised `MCP_TRANSPORT` value that caused a fallback to stdio.
    pub rejected_transport: Option<String>,
    pub http_addr: SocketAddr,
    pub mcp_path: String,
    pub sse_path: String,
    /// `tracing` filter directive derived from `FASTMCP_LOG_LEVEL`.
    pub log_filter: &'static str,
    pub author: String,
    pub author_initials: Option<String>,
    pub root: Option<PathBuf>,
    pub lock_ttl: Option<Duration>,
    pub lock_max: Option<usize>,
    pub pdf_timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl ServerConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    /// Mount path for the selected HTTP transport.
    pub fn http_path(&self) -> &str {
        match self.transport {
            Transport::Sse => &self.sse_path,
            Transport::Stdio | Transport::StreamableHttp => &self.mcp_path,
        }
    }
}

fn log_filter(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARNING" | "WARN" => Some("warn"),
        "ERROR" | "CRITICAL" => Some("error"),
        _ => None,
    }
}

fn mount_path(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with('/') && trimmed.len() > 1 {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::InvalidSetting { name, value })
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let invalid = || ConfigError::InvalidSetting {
        name: "MCP_HOST",
        value: format!("{host}:{port}"),
    };
    (host.trim(), port)
        .to_socket_addrs()
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let transport = Transport::parse(&args.transport);
        let rejected_transport = transport.is_none().then(|| args.transport.clone());
        let transport = transport.unwrap_or(Transport::Stdio);

        let port = args.port.or(args.mcp_port).unwrap_or(DEFAULT_PORT);
        let http_addr = socket_addr(&args.host, port)?;

        let mcp_path = mount_path("MCP_PATH", args.mcp_path)?;
        let sse_path = mount_path("MCP_SSE_PATH", args.sse_path)?;
        if mcp_path == sse_path {
            return Err(ConfigError::InvalidSetting {
                name: "MCP_SSE_PATH",
                value: sse_path,
            });
        }

        let log_filter = log_filter(&args.log_level).ok_or(ConfigError::InvalidSetting {
            name: "FASTMCP_LOG_LEVEL",
            value: args.log_level,
        })?;

        let author = if args.author.trim().is_empty() {
            DEFAULT_AUTHOR.to_string()
        } else {
            args.author
        };

        let lock_ttl = if args.lock_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.lock_ttl_secs))
        };

        Ok(Self {
            transport,
            rejected_transport,
            http_addr,
            mcp_path,
            sse_path,
            log_filter,
            author,
            author_initials: args.author_initials.filter(|value| !value.trim().is_empty()),
            root: args.root,
            lock_ttl,
            lock_max: args.lock_max,
            pdf_timeout: Duration::from_secs(args.pdf_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            transport: DEFAULT_TRANSPORT.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: None,
            mcp_port: None,
            mcp_path: DEFAULT_MCP_PATH.to_string(),
            sse_path: DEFAULT_SSE_PATH.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            author_initials: None,
            root: None,
            lock_ttl_secs: DEFAULT_LOCK_TTL_SECS,
            lock_max: None,
            pdf_timeout_secs: DEFAULT_PDF_TIMEOUT_SECS,
        }
    }

    #[test]
    fn defaults_serve_stdio_on_port_8000() {
        let config = ServerConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(config.transport, Transport::Stdio);
        assert!(config.rejected_transport.is_none());
        assert_eq!(config.http_addr.port(), 8000);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.author, "Author");
        assert_eq!(config.lock_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.pdf_timeout, Duration::from_secs(60));
    }

    #[test]
    fn transport_is_case_insensitive_and_unknown_falls_back() {
        let mut args = base_args();
        args.transport = "Streamable-HTTP".to_string();
        let config = ServerConfig::try_from(args).expect("config should parse");
        assert_eq!(config.transport, Transport::StreamableHttp);
        assert_eq!(config.http_path(), "/mcp");

        let mut args = base_args();
        args.transport = "SSE".to_string();
        let config = ServerConfig::try_from(args).expect("config should parse");
        assert_eq!(config.http_path(), "/sse");

        let mut args = base_args();
        args.transport = "carrier-pigeon".to_string();
        let config = ServerConfig::try_from(args).expect("config should parse");
        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.rejected_transport.as_deref(), Some("carrier-pigeon"));
    }

    #[test]
    fn port_wins_over_mcp_port() {
        let mut args = base_args();
        args.port = Some(9100);
        args.mcp_port = Some(9200);
        let config = ServerConfig::try_from(args).expect("config should parse");
        assert_eq!(config.http_addr.port(), 9100);

        let mut args = base_args();
        args.mcp_port = Some(9200);
        let config = ServerConfig::try_from(args).expect("config should parse");
        assert_eq!(config.http_addr.port(), 9200);
    }

    #[test]
    fn log_levels_map_to_tracing_filters() {
        for (level, expected) in [
            ("debug", "debug"),
            ("WARNING", "warn"),
            ("Error", "error"),
            ("CRITICAL", "error"),
        ] {
            let mut args = base_args();
            args.log_level = level.to_string();
            let config = ServerConfig::try_from(args).expect("config should parse");
            assert_eq!(config.log_filter, expected);
        }

        let mut args = base_args();
        args.log_level = "LOUD".to_string();
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn mount_paths_are_validated() {
        let mut args = base_args();
        args.mcp_path = "mcp".to_string();
        assert!(ServerConfig::try_from(args).is_err());

        let mut args = base_args();
        args.sse_path = "/mcp/".to_string();
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn cli_flags_parse_typed_values() {
        let args = CliArgs::try_parse_from([
            "word-mcpd",
            "--transport",
            "sse",
            "--port",
            "9100",
            "--lock-ttl-secs",
            "0",
            "--lock-max",
            "16",
        ])
        .expect("flags should parse");
        let config = ServerConfig::try_from(args).expect("config should parse");
        assert_eq!(config.transport, Transport::Sse);
        assert_eq!(config.http_addr.port(), 9100);
        assert!(config.lock_ttl.is_none());
        assert_eq!(config.lock_max, Some(16));

        assert!(CliArgs::try_parse_from(["word-mcpd", "--lock-ttl-secs", "soon"]).is_err());
        assert!(CliArgs::try_parse_from(["word-mcpd", "--port", "70000"]).is_err());
    }

    #[test]
    fn zero_ttl_disables_lock_eviction_and_blank_initials_are_dropped() {
        let mut args = base_args();
        args.lock_ttl_secs = 0;
        args.author_initials = Some("  ".to_string());
        let config = ServerConfig::try_from(args).expect("config should parse");
        assert!(config.lock_ttl.is_none());
        assert!(config.author_initials.is_none());
    }
}
