use clap::Parser;
use eyecare::commands::{self, MenuAction};
use eyecare::config::{Cli, Command, Config};
use eyecare::page::PageSnapshot;
use eyecare::palette::ThemeEntry;
use eyecare::replay::replay;
use eyecare::store::{FileStore, Preferences};
use eyecare::unpack_error;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match out {
        Ok(out) => println!("{}", out),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode output");
            std::process::exit(1);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::resolve(args.config_path.as_deref()).unwrap_or_else(|e| {
        tracing::error!(error = ?e, path = ?args.config_path, "failed to load config file");
        std::process::exit(1);
    });

    let mut store = FileStore::open(&cfg.store.path).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&e), "failed to open store");
        std::process::exit(1);
    });
    let prefs = Preferences::load(&store);

    match args.command {
        Command::Run { snapshot, pretty } => {
            let snapshot = PageSnapshot::load(&snapshot).unwrap_or_else(|e| {
                tracing::error!(error = %unpack_error(&e), "failed to load snapshot");
                std::process::exit(1);
            });
            let report = replay(snapshot, &prefs, &cfg).await;
            print_json(&report, pretty);
        }
        Command::Menu { host } => {
            print_json(&commands::menu(&prefs, &host), true);
        }
        Command::Theme { key } => {
            let Some(theme) = ThemeEntry::lookup(&key) else {
                tracing::error!(theme = %key, "unknown theme");
                std::process::exit(1);
            };
            run_action(&MenuAction::SelectTheme(theme.key), &mut store, "");
        }
        Command::Toggle { host } => {
            run_action(&MenuAction::ToggleSite, &mut store, &host);
        }
    }
}

fn run_action(action: &MenuAction, store: &mut FileStore, hostname: &str) {
    match commands::invoke(action, store, hostname) {
        Ok(outcome) => {
            tracing::info!(path = ?store.path(), "preferences saved");
            print_json(&outcome, false);
        }
        Err(e) => {
            tracing::error!(error = %unpack_error(&e), "failed to save preferences");
            std::process::exit(1);
        }
    }
}
