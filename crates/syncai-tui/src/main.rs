//! SyncAI - a terminal chat front-end for hosted and local LLMs.

mod app;
mod handler;
mod logging;
mod markdown;
mod tui;
mod ui;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use syncai_core::{build_client, Config, ConversationStore, Provider};

use crate::app::App;
use crate::tui::EventHandler;

/// SyncAI - ask anything from your terminal ✦
#[derive(Parser, Debug)]
#[command(name = "syncai")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Provider to talk to (gemini, openai, claude, ollama)
    #[arg(short, long, env = "SYNCAI_PROVIDER")]
    provider: Option<String>,

    /// Model name; defaults to the provider's default model
    #[arg(short, long, env = "SYNCAI_MODEL")]
    model: Option<String>,

    /// Seconds to wait for a reply before giving up
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Override the provider endpoint (Gemini and Ollama)
    #[arg(long)]
    base_url: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short, long)]
    debug: bool,

    /// Where to write the log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Persist provider, model and timeout overrides to the config file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file.clone() {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init(&log_path, cli.debug)?;

    let config = resolve_config(&cli)?;
    if cli.save_config {
        let path = config.save()?;
        tracing::info!(path = %path.display(), "saved config");
    }

    let provider = config.provider();
    let client = build_client(&config);
    tracing::info!(
        provider = provider.as_str(),
        model = client.model(),
        timeout_secs = config.timeout().as_secs(),
        "starting"
    );

    let store = ConversationStore::with_timeout(client, config.timeout());
    let mut app = App::new(store, provider);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;
    app.shutdown();

    if let Err(err) = &result {
        tracing::error!(error = %err, "exited with error");
    }
    result
}

/// Merge the config file with command-line overrides.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not load config, using defaults");
        Config::new()
    });
    resolve_config_from(config, cli)
}

fn resolve_config_from(mut config: Config, cli: &Cli) -> Result<Config> {
    if let Some(name) = &cli.provider {
        let Some(provider) = Provider::parse(name) else {
            let known: Vec<&str> = Provider::all().iter().map(|p| p.as_str()).collect();
            bail!("unknown provider '{name}' (expected one of: {})", known.join(", "));
        };
        // A new provider invalidates a saved model unless one is given
        if config.provider() != provider && cli.model.is_none() {
            config.model = None;
        }
        config.provider = Some(provider.as_str().to_string());
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(secs) = cli.timeout {
        if secs == 0 {
            bail!("--timeout must be at least 1 second");
        }
        config.timeout_secs = Some(secs);
    }
    if let Some(url) = &cli.base_url {
        config.base_url = Some(url.clone());
    }

    Ok(config)
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        app.sync_store();
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(event) => handler::handle_event(app, event),
                None => break,
            },
            Some(settlement) = app.store.next_settlement() => {
                app.store.apply(settlement);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn cli(provider: Option<&str>, model: Option<&str>, timeout: Option<u64>) -> Cli {
        Cli {
            provider: provider.map(str::to_string),
            model: model.map(str::to_string),
            timeout,
            base_url: None,
            debug: false,
            log_file: None,
            save_config: false,
        }
    }

    fn saved_openai() -> Config {
        Config {
            provider: Some("openai".to_string()),
            model: Some("gpt-4o".to_string()),
            timeout_secs: Some(30),
            ..Config::default()
        }
    }

    #[test]
    fn cli_overrides_provider_and_timeout() {
        let config =
            resolve_config_from(saved_openai(), &cli(Some("ollama"), None, Some(5))).unwrap();

        assert_eq!(config.provider(), Provider::Ollama);
        assert_eq!(config.model(), Provider::Ollama.default_model());
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn saved_values_survive_without_flags() {
        let config = resolve_config_from(saved_openai(), &cli(None, None, None)).unwrap();

        assert_eq!(config, saved_openai());
    }

    #[test]
    fn explicit_model_is_kept_when_switching_provider() {
        let config =
            resolve_config_from(saved_openai(), &cli(Some("claude"), Some("claude-x"), None))
                .unwrap();

        assert_eq!(config.provider(), Provider::Claude);
        assert_eq!(config.model(), "claude-x");
    }

    #[test]
    fn unknown_provider_and_zero_timeout_are_rejected() {
        let err = resolve_config_from(Config::new(), &cli(Some("skynet"), None, None)).unwrap_err();
        assert!(err.to_string().contains("skynet"));

        assert!(resolve_config_from(Config::new(), &cli(None, None, Some(0))).is_err());
    }

    #[test]
    fn flags_parse_into_cli() {
        let parsed = Cli::parse_from(["syncai", "-p", "gemini", "-t", "9", "--save-config"]);
        assert_eq!(parsed.provider.as_deref(), Some("gemini"));
        assert_eq!(parsed.timeout, Some(9));
        assert!(parsed.save_config);
    }
}
