use serde::Serialize;

pub const DEFAULT_THEME: &str = "green";

/// One selectable color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeEntry {
    pub key: &'static str,
    pub display_name: &'static str,
    pub background: &'static str,
    pub foreground: Option<&'static str>,
}

pub const PALETTE: &[ThemeEntry] = &[
    ThemeEntry {
        key: "yellow",
        display_name: "Earthy Yellow",
        background: "#F6F4EC",
        foreground: Some("#333"),
    },
    ThemeEntry {
        key: "green",
        display_name: "Bean Green",
        background: "#CCE8CF",
        foreground: Some("#222"),
    },
    ThemeEntry {
        key: "grey",
        display_name: "Light Grey",
        background: "#E5E5E5",
        foreground: Some("#333"),
    },
    ThemeEntry {
        key: "olive",
        display_name: "Pale Olive",
        background: "#E1E6D7",
        foreground: Some("#222"),
    },
];

impl ThemeEntry {
    pub fn lookup(key: &str) -> Option<&'static ThemeEntry> {
        PALETTE.iter().find(|t| t.key == key)
    }

    /// Like [`ThemeEntry::lookup`], falling back to the default theme.
    pub fn resolve(key: &str) -> &'static ThemeEntry {
        Self::lookup(key).unwrap_or_else(Self::default_theme)
    }

    pub fn default_theme() -> &'static ThemeEntry {
        &PALETTE[1]
    }
}
