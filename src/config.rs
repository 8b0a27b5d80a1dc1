//! Connection configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{CouchError, CouchResult};

/// CouchDB version the wire mapping in this crate was written against.
pub const SUPPORTED_VERSION: &str = "1.5.0";

/// How non-success responses are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Failures degrade to `None`, `false` or an empty list.
    #[default]
    Suppress,
    /// Failures become [`CouchError::Server`].
    Surface,
}

impl FromStr for ErrorMode {
    type Err = CouchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "suppress" => Ok(ErrorMode::Suppress),
            "surface" => Ok(ErrorMode::Surface),
            other => Err(CouchError::Config(format!("unknown error mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Basic,
    /// Never send credentials, even when a user is configured.
    None,
}

/// Connection settings, fixed for the lifetime of a [`Client`](crate::Client).
///
/// No value is validated; a bad host or port shows up as a transport error on
/// first use.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Name of the caller's primary database.
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    /// Ask the server to flush writes to disk before answering.
    pub full_commit: bool,
    pub auth_method: AuthMethod,
    pub verify_tls: bool,
    /// Request document ids from `/_uuids` instead of generating them locally.
    pub server_uuids: bool,
    pub error_mode: ErrorMode,
    pub tls: bool,
    /// Whole-request timeout. Read from `timeout_secs` in config files.
    #[serde(rename = "timeout_secs", deserialize_with = "duration_from_secs")]
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            database: "db-test".to_owned(),
            user: None,
            password: None,
            host: "127.0.0.1".to_owned(),
            port: 5984,
            full_commit: true,
            auth_method: AuthMethod::Basic,
            verify_tls: false,
            server_uuids: true,
            error_mode: ErrorMode::Suppress,
            tls: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("full_commit", &self.full_commit)
            .field("auth_method", &self.auth_method)
            .field("verify_tls", &self.verify_tls)
            .field("server_uuids", &self.server_uuids)
            .field("error_mode", &self.error_mode)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create config from environment variables, keeping defaults for unset ones.
    ///
    /// - `COUCHDB_HOST`, `COUCHDB_PORT`
    /// - `COUCHDB_USER`, `COUCHDB_PASSWORD`
    /// - `COUCHDB_DATABASE`
    /// - `COUCHDB_TLS` (`true`/`false`)
    /// - `COUCHDB_TIMEOUT_SECS`
    /// - `COUCHDB_ERROR_MODE` (`suppress`/`surface`)
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let mut config = ClientConfig::default();

        if let Some(host) = lookup("COUCHDB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("COUCHDB_PORT") {
            config.port = parse("COUCHDB_PORT", &port)?;
        }
        if let Some(user) = lookup("COUCHDB_USER") {
            config.user = Some(user);
        }
        if let Some(password) = lookup("COUCHDB_PASSWORD") {
            config.password = Some(password);
        }
        if let Some(database) = lookup("COUCHDB_DATABASE") {
            config.database = database;
        }
        if let Some(tls) = lookup("COUCHDB_TLS") {
            config.tls = parse("COUCHDB_TLS", &tls)?;
        }
        if let Some(timeout) = lookup("COUCHDB_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse("COUCHDB_TIMEOUT_SECS", &timeout)?);
        }
        if let Some(mode) = lookup("COUCHDB_ERROR_MODE") {
            config.error_mode = mode.parse()?;
        }

        Ok(config)
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_full_commit(mut self, full_commit: bool) -> Self {
        self.full_commit = full_commit;
        self
    }

    pub fn with_auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn with_server_uuids(mut self, server_uuids: bool) -> Self {
        self.server_uuids = server_uuids;
        self
    }

    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> CouchResult<T> {
    value
        .parse()
        .map_err(|_| CouchError::Config(format!("{} has invalid value '{}'", key, value)))
}

fn duration_from_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}
