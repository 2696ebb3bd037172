//! CLI entry point for the family tree HTTP service.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::{fmt, EnvFilter};

use family_core::config::{OptionKind, OPTIONS};
use family_core::Settings;
use family_graph::{GraphClient, GraphConfig, MemoryStore, PersonStore};

use family_api::auth::AuthConfig;
use family_api::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "family-tree")]
#[command(about = "REST API for managing a family tree stored in a graph database")]
struct Cli {
    /// Config file prefix (default: family).
    #[arg(short, long, default_value = "family")]
    config: String,
}

/// The CLI: `--config` plus one flag per entry of the option table.
fn command() -> Command {
    OPTIONS.iter().fold(Cli::command(), |cmd, opt| {
        let help = format!("{} [env: {}]", opt.help, opt.env);
        let arg = Arg::new(opt.key).long(opt.flag).help(help);
        cmd.arg(match opt.kind {
            OptionKind::Text => arg.value_name("VALUE").action(ArgAction::Set),
            OptionKind::Switch => arg.action(ArgAction::SetTrue),
        })
    })
}

/// Flags given on the command line, as settings overrides.
fn overrides(matches: &ArgMatches) -> Vec<(&'static str, String)> {
    OPTIONS
        .iter()
        .filter_map(|opt| match opt.kind {
            OptionKind::Text => matches
                .get_one::<String>(opt.key)
                .map(|value| (opt.key, value.clone())),
            OptionKind::Switch => matches
                .get_flag(opt.key)
                .then(|| (opt.key, "true".to_string())),
        })
        .collect()
}

fn log_filter(settings: &Settings) -> EnvFilter {
    let default_level = if settings.verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let settings = Settings::load(Some(cli.config.as_str()), &overrides(&matches))?;

    fmt().with_env_filter(log_filter(&settings)).json().init();
    tracing::debug!(
        config = %cli.config,
        address = %settings.address,
        graph_hosts = %settings.graph_hosts,
        auth_enabled = settings.auth_enabled(),
        "Settings loaded"
    );

    let store = open_store(&settings).await?;

    let auth = if settings.auth_enabled() {
        Some(AuthConfig::discover(&settings).await?)
    } else {
        tracing::info!("No auth host configured, login disabled");
        None
    };

    let app = router(AppState::new(store, auth));
    let listener = tokio::net::TcpListener::bind(&settings.address).await?;
    tracing::info!(address = %settings.address, "Family tree API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn PersonStore>> {
    if settings.uses_memory_store() {
        tracing::warn!("Using in-memory person store, data is lost on exit");
        let store: Arc<dyn PersonStore> = Arc::new(MemoryStore::new());
        return Ok(store);
    }
    let graph = GraphClient::connect(&GraphConfig::from_settings(settings)).await?;
    let store: Arc<dyn PersonStore> = Arc::new(graph);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ArgMatches {
        command().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn test_every_option_has_a_flag() {
        let cmd = command();
        for opt in OPTIONS {
            let arg = cmd
                .get_arguments()
                .find(|arg| arg.get_long() == Some(opt.flag))
                .unwrap_or_else(|| panic!("missing --{}", opt.flag));
            assert!(arg.get_help().unwrap().to_string().contains(opt.env));
        }
    }

    #[test]
    fn test_overrides_only_include_given_flags() {
        let matches = parse(&["family-tree", "--addr", "127.0.0.1:9000", "--verbose"]);
        assert_eq!(
            overrides(&matches),
            vec![
                ("address", "127.0.0.1:9000".to_string()),
                ("verbose", "true".to_string())
            ]
        );
        assert!(overrides(&parse(&["family-tree"])).is_empty());
    }

    #[test]
    fn test_config_prefix_flag() {
        let matches = parse(&["family-tree", "--config", "prod"]);
        assert_eq!(Cli::from_arg_matches(&matches).unwrap().config, "prod");
        let matches = parse(&["family-tree"]);
        assert_eq!(Cli::from_arg_matches(&matches).unwrap().config, "family");
    }

    #[test]
    fn test_overrides_load_into_settings() {
        let matches = parse(&["family-tree", "--graph-hosts", "memory", "--client-secret", "007"]);
        let settings = Settings::load_from(None, Some(Default::default()), &overrides(&matches)).unwrap();
        assert!(settings.uses_memory_store());
        assert_eq!(settings.client_secret, "007");
        assert_eq!(settings.address, "0.0.0.0:8088");
    }

    #[test]
    fn test_verbose_raises_default_level() {
        let settings = Settings {
            verbose: true,
            ..Settings::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(log_filter(&settings).to_string(), "debug");
            assert_eq!(log_filter(&Settings::default()).to_string(), "info");
        }
    }
}
