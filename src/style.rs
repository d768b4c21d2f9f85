use crate::dom::StyleInjector;
use crate::marker::MarkNames;
use crate::palette::ThemeEntry;

pub const STYLE_ID: &str = "eye-protection-global";

/// The complete rule set for `theme`. Rules are keyed on the mark
/// attributes only, so the same string serves every element on the page.
pub fn render_rules(theme: &ThemeEntry, names: &MarkNames) -> String {
    let mut css = String::new();

    css.push_str(":root {\n");
    css.push_str(&format!("    --eye-bg: {} !important;\n", theme.background));
    if let Some(fg) = theme.foreground {
        css.push_str(&format!("    --eye-text: {} !important;\n", fg));
    }
    css.push_str("}\n");

    css.push_str(&format!("[{}] {{\n", names.override_attribute));
    css.push_str("    background-color: var(--eye-bg) !important;\n");
    if theme.foreground.is_some() {
        css.push_str("    color: var(--eye-text) !important;\n");
    }
    css.push_str("    border-color: rgba(0, 0, 0, 0.1) !important;\n");
    css.push_str("}\n");

    css.push_str(&format!("[{}] {{\n", names.neutral_attribute));
    css.push_str("    background-color: transparent !important;\n");
    css.push_str("}\n");

    css.push_str("img, video, canvas, svg, [role=\"img\"] {\n");
    css.push_str("    background-color: transparent !important;\n");
    css.push_str("}\n");

    css
}

pub fn inject<S: StyleInjector + ?Sized>(target: &mut S, style_id: &str, theme: &ThemeEntry, names: &MarkNames) {
    target.inject_style(style_id, &render_rules(theme, names));
}
