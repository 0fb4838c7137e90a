use std::time::Duration;

use axum::http::Uri;
use clap::{Parser, ValueEnum};
use coursemate_rag::RagConfig;
use coursemate_rag::config::DEFAULT_EMBED_BATCH_DELAY_MS;
use coursemate_rag::fetch::is_remote;

/// Which hosted model family embeds text and answers questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Gemini,
    Openai,
}

/// Coursemate document service.
#[derive(Debug, Clone, Parser)]
#[command(name = "coursemate", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "COURSEMATE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "COURSEMATE_PORT", default_value_t = 6000)]
    pub port: u16,

    /// Embedding and generation provider
    #[arg(long, env = "COURSEMATE_EMBEDDING_PROVIDER", value_enum, default_value = "gemini")]
    pub embedding_provider: ProviderKind,

    /// PostgreSQL connection string; documents are kept in memory when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Pause between embedding batches, in milliseconds
    #[arg(long, env = "COURSEMATE_BATCH_DELAY_MS", default_value_t = DEFAULT_EMBED_BATCH_DELAY_MS)]
    pub batch_delay_ms: u64,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Allowed CORS origin; any origin when unset
    #[arg(long, env = "FRONTEND_URL")]
    pub cors_origin: Option<String>,

    /// Let uploads without content name a path on this machine
    #[arg(long, env = "COURSEMATE_ALLOW_LOCAL_SOURCES")]
    pub allow_local_sources: bool,

    /// Host that uploads without content may be downloaded from
    #[arg(long = "source-host", env = "COURSEMATE_SOURCE_HOSTS", value_delimiter = ',')]
    pub source_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6000,
            embedding_provider: ProviderKind::Gemini,
            database_url: None,
            batch_delay_ms: DEFAULT_EMBED_BATCH_DELAY_MS,
            log_json: false,
            cors_origin: None,
            allow_local_sources: false,
            source_hosts: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Indexing and retrieval settings derived from the flags.
    pub fn rag_config(&self) -> coursemate_rag::Result<RagConfig> {
        RagConfig::builder().embed_batch_delay(Duration::from_millis(self.batch_delay_ms)).build()
    }

    pub fn source_policy(&self) -> SourcePolicy {
        SourcePolicy {
            allowed_hosts: self.source_hosts.iter().map(|h| h.trim().to_lowercase()).collect(),
            allow_local: self.allow_local_sources,
        }
    }
}

/// Which upload sources the server will read on a client's behalf.
///
/// The default admits nothing: uploads must carry their own bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePolicy {
    /// Lowercase hosts `http(s)` sources may point at.
    pub allowed_hosts: Vec<String>,
    /// Whether bare paths on the server's filesystem may be read.
    pub allow_local: bool,
}

impl SourcePolicy {
    /// Check a client-supplied locator, returning the reason it is refused.
    pub fn check(&self, source: &str) -> Result<(), String> {
        if !is_remote(source) {
            return if self.allow_local {
                Ok(())
            } else {
                Err("Local sources are disabled; send the document as content_base64".to_string())
            };
        }
        let host = source
            .parse::<Uri>()
            .ok()
            .and_then(|uri| uri.host().map(str::to_lowercase))
            .ok_or_else(|| format!("Invalid source URL {source:?}"))?;
        if self.allowed_hosts.iter().any(|allowed| *allowed == host) {
            Ok(())
        } else {
            Err(format!("Downloads from {host} are not allowed; send content_base64 instead"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "coursemate",
            "--port",
            "7000",
            "--embedding-provider",
            "openai",
            "--batch-delay-ms",
            "0",
        ]);
        assert_eq!(config.port, 7000);
        assert_eq!(config.embedding_provider, ProviderKind::Openai);
        assert_eq!(config.rag_config().unwrap().embed_batch_delay(), Duration::ZERO);
        assert_eq!(config.source_policy(), SourcePolicy::default());
    }

    #[test]
    fn default_policy_refuses_every_locator() {
        let policy = ServerConfig::default().source_policy();
        assert!(policy.check("/etc/passwd").is_err());
        assert!(policy.check("notes.pdf").is_err());
        assert!(policy.check("http://169.254.169.254/latest/meta-data").is_err());
    }

    #[test]
    fn allow_listed_hosts_and_opt_in_local_paths_pass() {
        let config = ServerConfig::parse_from([
            "coursemate",
            "--source-host",
            "res.cloudinary.com,Files.Example.org",
            "--allow-local-sources",
        ]);
        let policy = config.source_policy();
        assert!(policy.check("https://res.cloudinary.com/demo/raw/upload/a.pdf").is_ok());
        assert!(policy.check("https://files.example.org/b.pdf").is_ok());
        assert!(policy.check("https://res.cloudinary.com.evil.io/a.pdf").is_err());
        assert!(policy.check("/srv/seed/intro.pdf").is_ok());
    }
}
