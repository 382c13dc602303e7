use crate::email::{EmailService, MailTransport, SmtpMailTransport};
use crate::services;
use anyhow::{Context, Result};
use selfservice_core::resource::Router as ResourceRouter;
use selfservice_core::{StageTypeRegistry, WorkflowDefinition, WorkflowLoader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub emailserver: EmailServerConfig,

    /// Workflow name -> definition file
    #[serde(default)]
    pub workflows: BTreeMap<String, PathBuf>,

    /// Create the demo users on startup
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
}

/// Outgoing mail server settings (`emailserver.*`)
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailServerConfig {
    #[serde(default = "default_email_host")]
    pub host: String,

    #[serde(default = "default_email_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

fn default_seed_demo_data() -> bool {
    true
}

fn default_email_host() -> String {
    "localhost".to_string()
}

fn default_email_port() -> u16 {
    587
}

fn default_starttls() -> bool {
    true
}

impl Default for EmailServerConfig {
    fn default() -> Self {
        Self {
            host: default_email_host(),
            port: default_email_port(),
            username: None,
            password: None,
            starttls: default_starttls(),
        }
    }
}

impl fmt::Debug for EmailServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("starttls", &self.starttls)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            emailserver: EmailServerConfig::default(),
            workflows: BTreeMap::new(),
            seed_demo_data: default_seed_demo_data(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read configuration file")?;
        let mut config: Self =
            toml::from_str(&content).context("Failed to parse configuration file")?;

        // Workflow paths are relative to the configuration file
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        for path in config.workflows.values_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }

        Ok(config)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<ResourceRouter>,
    pub registry: Arc<StageTypeRegistry>,
    pub workflows: Arc<BTreeMap<String, Arc<WorkflowDefinition>>>,
}

impl AppState {
    /// Build state with an SMTP transport for the configured mail server
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        let transport = Arc::new(
            SmtpMailTransport::new(&config.emailserver)
                .context("Failed to create mail transport")?,
        );
        Self::with_transport(config, transport).await
    }

    pub async fn with_transport(
        config: &ServerConfig,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        let registry = Arc::new(
            StageTypeRegistry::with_builtin_stages().context("Failed to register stage types")?,
        );
        tracing::info!("Registered stage types: {:?}", registry.identifiers());

        let loader = WorkflowLoader::new(registry.clone());
        let mut workflows = BTreeMap::new();
        for (name, path) in &config.workflows {
            let definition = loader
                .load_file(path)
                .with_context(|| format!("Failed to load workflow '{}'", name))?;
            tracing::info!(
                "Published workflow {} with stages {:?}",
                name,
                definition.stage_names()
            );
            workflows.insert(name.clone(), definition);
        }

        let email = Arc::new(EmailService::new(transport));
        let resources = services::initialise(email);
        if config.seed_demo_data {
            services::create_demo_data(&resources)
                .await
                .context("Failed to create demo data")?;
        }

        Ok(Self {
            resources: Arc::new(resources),
            registry,
            workflows: Arc::new(workflows),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("selfservice.toml")).unwrap();

        assert_eq!(config.emailserver.host, "localhost");
        assert_eq!(config.emailserver.port, 587);
        assert!(config.emailserver.starttls);
        assert!(config.workflows.is_empty());
        assert!(config.seed_demo_data);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfservice.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
seed_demo_data = false

[emailserver]
host = "smtp.example.com"
port = 2525
username = "mailer"
password = "secret"

[workflows]
reset = "workflows/reset.json"
"#
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.emailserver.host, "smtp.example.com");
        assert_eq!(config.emailserver.port, 2525);
        assert_eq!(config.emailserver.username.as_deref(), Some("mailer"));
        assert!(!config.seed_demo_data);
        assert_eq!(
            config.workflows["reset"],
            dir.path().join("workflows/reset.json")
        );
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfservice.toml");
        std::fs::write(&path, "emailserver = 7").unwrap();
        assert!(ServerConfig::load(&path).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = EmailServerConfig {
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
