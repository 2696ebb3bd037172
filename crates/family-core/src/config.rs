//! Configuration management for the family tree service.
//!
//! Settings are layered (lowest priority first):
//! 1. Defaults from the `OPTIONS` table
//! 2. Config file (`family.toml`, optional)
//! 3. Environment variables (`FAMILY_` prefix)
//! 4. Command-line flags

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::FamilyError;

pub const ENV_PREFIX: &str = "FAMILY";

/// Literal `graph_hosts` value selecting the in-process store.
pub const MEMORY_STORE: &str = "memory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Text,
    Switch,
}

/// One recognized setting: where it comes from and which field it fills.
#[derive(Debug, Clone, Copy)]
pub struct ConfigOption {
    /// Target field in `Settings`, also the config file key.
    pub key: &'static str,
    pub flag: &'static str,
    pub env: &'static str,
    pub default: &'static str,
    pub kind: OptionKind,
    pub help: &'static str,
}

pub const OPTIONS: &[ConfigOption] = &[
    ConfigOption {
        key: "address",
        flag: "addr",
        env: "FAMILY_ADDRESS",
        default: "0.0.0.0:8088",
        kind: OptionKind::Text,
        help: "IP address and port to listen on",
    },
    ConfigOption {
        key: "graph_hosts",
        flag: "graph-hosts",
        env: "FAMILY_GRAPH_HOSTS",
        default: "bolt://localhost:7687",
        kind: OptionKind::Text,
        help: "Comma-separated graph database URIs, or \"memory\"",
    },
    ConfigOption {
        key: "graph_user",
        flag: "graph-user",
        env: "FAMILY_GRAPH_USER",
        default: "neo4j",
        kind: OptionKind::Text,
        help: "Graph database user",
    },
    ConfigOption {
        key: "graph_password",
        flag: "graph-password",
        env: "FAMILY_GRAPH_PASSWORD",
        default: "family-dev",
        kind: OptionKind::Text,
        help: "Graph database password",
    },
    ConfigOption {
        key: "auth_host",
        flag: "auth-host",
        env: "FAMILY_AUTH_HOST",
        default: "",
        kind: OptionKind::Text,
        help: "Base URL of the OIDC auth host; empty disables auth",
    },
    ConfigOption {
        key: "oidc_realm",
        flag: "oidc-realm",
        env: "FAMILY_OIDC_REALM",
        default: "demo",
        kind: OptionKind::Text,
        help: "OIDC realm used to authenticate to the auth host",
    },
    ConfigOption {
        key: "client_id",
        flag: "client-id",
        env: "FAMILY_CLIENT_ID",
        default: "",
        kind: OptionKind::Text,
        help: "OAuth2 client id",
    },
    ConfigOption {
        key: "client_secret",
        flag: "client-secret",
        env: "FAMILY_CLIENT_SECRET",
        default: "",
        kind: OptionKind::Text,
        help: "OAuth2 client secret",
    },
    ConfigOption {
        key: "callback_url",
        flag: "callback-url",
        env: "FAMILY_CALLBACK_URL",
        default: "",
        kind: OptionKind::Text,
        help: "Redirect URL for the three-legged auth flow",
    },
    ConfigOption {
        key: "verbose",
        flag: "verbose",
        env: "FAMILY_VERBOSE",
        default: "false",
        kind: OptionKind::Switch,
        help: "Switch on debug / verbose logging",
    },
];

/// Look up an option by its settings key.
pub fn option(key: &str) -> Option<&'static ConfigOption> {
    OPTIONS.iter().find(|o| o.key == key)
}

/// Fully-populated service settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub address: String,
    pub graph_hosts: String,
    pub graph_user: String,
    pub graph_password: String,
    pub auth_host: String,
    pub oidc_realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8088".to_string(),
            graph_hosts: "bolt://localhost:7687".to_string(),
            graph_user: "neo4j".to_string(),
            graph_password: "family-dev".to_string(),
            auth_host: String::new(),
            oidc_realm: "demo".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: String::new(),
            verbose: false,
        }
    }
}

impl Settings {
    /// Load settings from the process environment, an optional config file
    /// and explicit flag overrides given as `(key, value)` pairs.
    pub fn load(file_prefix: Option<&str>, overrides: &[(&str, String)]) -> Result<Self, FamilyError> {
        Self::load_from(file_prefix, None, overrides)
    }

    /// Like [`Settings::load`], but reads environment variables from `env`
    /// instead of the process when given.
    pub fn load_from(
        file_prefix: Option<&str>,
        env: Option<HashMap<String, String>>,
        overrides: &[(&str, String)],
    ) -> Result<Self, FamilyError> {
        let mut builder = config::Config::builder();

        for opt in OPTIONS {
            builder = match opt.kind {
                OptionKind::Text => builder.set_default(opt.key, opt.default)?,
                OptionKind::Switch => builder.set_default(opt.key, parse_switch(opt.default))?,
            };
        }

        if let Some(prefix) = file_prefix {
            builder = builder.add_source(config::File::with_name(prefix).required(false));
        }

        // Values stay strings; `verbose` is coerced to bool on deserialize.
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).source(env));

        for (key, value) in overrides {
            let opt = option(key).ok_or_else(|| FamilyError::UnknownOption(key.to_string()))?;
            builder = match opt.kind {
                OptionKind::Text => builder.set_override(opt.key, value.as_str())?,
                OptionKind::Switch => builder.set_override(opt.key, parse_switch(value))?,
            };
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// The configured graph hosts, split on commas.
    pub fn graph_hosts(&self) -> Vec<String> {
        self.graph_hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn uses_memory_store(&self) -> bool {
        self.graph_hosts.trim() == MEMORY_STORE
    }

    pub fn auth_enabled(&self) -> bool {
        !self.auth_host.trim().is_empty()
    }
}

fn parse_switch(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
