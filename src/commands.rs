//! The user-facing menu: one entry per palette theme plus a per-site
//! toggle. Invoking an entry only persists the choice and asks for a
//! reload; nothing is reconfigured live.

use serde::Serialize;

use crate::error::StoreError;
use crate::palette::PALETTE;
use crate::store::{ConfigStore, DISABLED_SITES_KEY, Preferences, SiteScope, THEME_KEY, get_or, set_typed};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "theme", rename_all = "snake_case")]
pub enum MenuAction {
    SelectTheme(&'static str),
    ToggleSite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuCommand {
    pub label: String,
    #[serde(flatten)]
    pub action: MenuAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    ReloadRequested,
}

pub fn menu(prefs: &Preferences, hostname: &str) -> Vec<MenuCommand> {
    let mut commands: Vec<MenuCommand> = PALETTE
        .iter()
        .map(|theme| {
            let icon = if theme.key == prefs.theme.key { "✅ " } else { "○ " };
            MenuCommand {
                label: format!("{}{}", icon, theme.display_name),
                action: MenuAction::SelectTheme(theme.key),
            }
        })
        .collect();

    let toggle = if prefs.site_scope.is_disabled(hostname) {
        "🚀 Enable on this site"
    } else {
        "🛑 Disable on this site"
    };
    commands.push(MenuCommand {
        label: toggle.to_string(),
        action: MenuAction::ToggleSite,
    });
    commands
}

pub fn invoke<S: ConfigStore + ?Sized>(action: &MenuAction, store: &mut S, hostname: &str) -> Result<Outcome, StoreError> {
    match action {
        MenuAction::SelectTheme(key) => {
            set_typed(store, THEME_KEY, key)?;
            tracing::info!(theme = *key, "theme selected");
        }
        MenuAction::ToggleSite => {
            // Re-read so toggles from other pages are not lost.
            let mut scope = SiteScope::new(get_or(store, DISABLED_SITES_KEY, Vec::new()));
            if scope.is_disabled(hostname) {
                scope.enable(hostname);
                tracing::info!(hostname, "site enabled");
            } else {
                scope.disable(hostname);
                tracing::info!(hostname, "site disabled");
            }
            set_typed(store, DISABLED_SITES_KEY, &scope.hostnames())?;
        }
    }
    Ok(Outcome::ReloadRequested)
}
