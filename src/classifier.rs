//! Decides, per element, whether its rendered background is a light page
//! surface that should take the theme color.
//!
//! Rules run in a fixed order and the first exclusion wins. Anything the
//! classifier cannot make sense of (detached nodes, unparsable colors,
//! missing layout) is a [`Decision::Skip`], never an error.

use serde::{Deserialize, Serialize};

use crate::color::parse_color;
use crate::dom::{Document, NodeId};
use crate::marker::MarkNames;

/// Tags whose content is not a reflowable page surface.
pub const EXCLUDED_TAGS: &[&str] = &[
    "img", "video", "canvas", "svg", "input", "textarea", "select", "script", "style",
];

pub const ROOT_TAGS: &[&str] = &["html", "body"];

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FullBleed {
    pub enabled: bool,
    pub min_viewport_width: f64,
    pub max_width_ratio: f64,
}

impl Default for FullBleed {
    fn default() -> Self {
        FullBleed {
            enabled: true,
            min_viewport_width: 800.0,
            max_width_ratio: 0.95,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Every channel must be strictly above this to count as near-white.
    pub threshold: u8,
    pub min_width: f64,
    pub min_height: f64,
    /// Backgrounds at or below this opacity count as "no background".
    pub min_alpha: f32,
    pub full_bleed: FullBleed,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        ClassifierSettings {
            threshold: 235,
            min_width: 50.0,
            min_height: 20.0,
            min_alpha: 0.5,
            full_bleed: FullBleed::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotElement,
    Detached,
    AlreadyMarked,
    ExcludedTag,
    RootContainer,
    TooSmall,
    FullBleed,
    BackgroundImage,
    Unresolvable,
    Translucent,
    NotLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Mark,
    Skip(SkipReason),
}

#[derive(Debug, Clone)]
pub struct Classifier {
    settings: ClassifierSettings,
    marks: MarkNames,
}

impl Classifier {
    pub fn new(settings: ClassifierSettings, marks: MarkNames) -> Self {
        Classifier { settings, marks }
    }

    pub fn classify<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> Decision {
        match self.evaluate(doc, node) {
            Ok(()) => Decision::Mark,
            Err(reason) => Decision::Skip(reason),
        }
    }

    fn evaluate<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> Result<(), SkipReason> {
        let tag = doc.tag_name(node).ok_or(SkipReason::NotElement)?;
        if !doc.is_connected(node) {
            return Err(SkipReason::Detached);
        }

        if self.marks.mark_of(doc, node).is_some() {
            return Err(SkipReason::AlreadyMarked);
        }

        if EXCLUDED_TAGS.contains(&tag) || doc.attribute(node, "role") == Some("img") {
            return Err(SkipReason::ExcludedTag);
        }

        if ROOT_TAGS.contains(&tag) {
            return Err(SkipReason::RootContainer);
        }

        let rect = doc.bounding_rect(node).ok_or(SkipReason::Detached)?;
        if rect.width < self.settings.min_width || rect.height < self.settings.min_height {
            return Err(SkipReason::TooSmall);
        }

        let bleed = &self.settings.full_bleed;
        let viewport = doc.viewport();
        if bleed.enabled
            && viewport.width > bleed.min_viewport_width
            && rect.width > viewport.width * bleed.max_width_ratio
        {
            return Err(SkipReason::FullBleed);
        }

        let style = doc.computed_style(node).ok_or(SkipReason::Detached)?;
        let image = style.background_image.trim();
        if !image.is_empty() && !image.eq_ignore_ascii_case("none") {
            return Err(SkipReason::BackgroundImage);
        }

        let color = parse_color(&style.background_color).ok_or(SkipReason::Unresolvable)?;
        if color.a <= self.settings.min_alpha {
            return Err(SkipReason::Translucent);
        }

        if !color.all_channels_above(self.settings.threshold) {
            return Err(SkipReason::NotLight);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Viewport, Document};
    use crate::page::{NodeSpec, Page};

    fn classify_one(viewport_width: f64, spec: NodeSpec) -> Decision {
        let mut page = Page::new("example.com", Viewport { width: viewport_width, height: 900.0 });
        let body = page.body().unwrap();
        let node = page.append(body, spec).unwrap();
        let classifier = Classifier::new(ClassifierSettings::default(), MarkNames::default());
        classifier.classify(&page, node)
    }

    fn white_div(width: f64, height: f64) -> NodeSpec {
        NodeSpec::element("div").background("rgb(255, 255, 255)").size(width, height)
    }

    #[test]
    fn test_threshold_boundary() {
        let at = NodeSpec::element("div").background("rgb(235, 235, 235)").size(300.0, 100.0);
        let above = NodeSpec::element("div").background("rgb(236, 236, 236)").size(300.0, 100.0);
        assert_eq!(classify_one(1200.0, at), Decision::Skip(SkipReason::NotLight));
        assert_eq!(classify_one(1200.0, above), Decision::Mark);
    }

    #[test]
    fn test_alpha_boundary() {
        let half = NodeSpec::element("div").background("rgba(255, 255, 255, 0.5)").size(300.0, 100.0);
        let more = NodeSpec::element("div").background("rgba(255, 255, 255, 0.51)").size(300.0, 100.0);
        assert_eq!(classify_one(1200.0, half), Decision::Skip(SkipReason::Translucent));
        assert_eq!(classify_one(1200.0, more), Decision::Mark);
    }

    #[test]
    fn test_size_exclusion() {
        assert_eq!(classify_one(1200.0, white_div(49.0, 100.0)), Decision::Skip(SkipReason::TooSmall));
        assert_eq!(classify_one(1200.0, white_div(300.0, 19.0)), Decision::Skip(SkipReason::TooSmall));
        assert_eq!(classify_one(1200.0, white_div(50.0, 20.0)), Decision::Mark);
    }

    #[test]
    fn test_full_bleed_exclusion() {
        assert_eq!(classify_one(1200.0, white_div(1150.0, 400.0)), Decision::Skip(SkipReason::FullBleed));
        assert_eq!(classify_one(1200.0, white_div(1100.0, 400.0)), Decision::Mark);
        // narrow viewports never trigger the heuristic
        assert_eq!(classify_one(780.0, white_div(780.0, 400.0)), Decision::Mark);
    }

    #[test]
    fn test_full_bleed_can_be_disabled() {
        let mut page = Page::new("example.com", Viewport { width: 1200.0, height: 900.0 });
        let body = page.body().unwrap();
        let node = page.append(body, white_div(1190.0, 400.0)).unwrap();
        let settings = ClassifierSettings {
            full_bleed: FullBleed {
                enabled: false,
                ..FullBleed::default()
            },
            ..ClassifierSettings::default()
        };
        let classifier = Classifier::new(settings, MarkNames::default());
        assert_eq!(classifier.classify(&page, node), Decision::Mark);
    }

    #[test]
    fn test_media_and_controls_excluded() {
        for tag in ["img", "video", "canvas", "svg", "input", "textarea", "select", "script", "style"] {
            let spec = NodeSpec::element(tag).background("#fff").size(300.0, 300.0);
            assert_eq!(classify_one(1200.0, spec), Decision::Skip(SkipReason::ExcludedTag), "{tag}");
        }
        let role_img = white_div(300.0, 300.0).attr("role", "img");
        assert_eq!(classify_one(1200.0, role_img), Decision::Skip(SkipReason::ExcludedTag));
    }

    #[test]
    fn test_root_containers_skipped() {
        let mut page = Page::new("example.com", Viewport::default());
        let classifier = Classifier::new(ClassifierSettings::default(), MarkNames::default());
        let body = page.body().unwrap();
        let root = page.root().unwrap();
        page.set_style(body, crate::dom::ComputedStyle {
            background_color: "#fff".to_string(),
            background_image: "none".to_string(),
        });
        assert_eq!(classifier.classify(&page, body), Decision::Skip(SkipReason::RootContainer));
        assert_eq!(classifier.classify(&page, root), Decision::Skip(SkipReason::RootContainer));
    }

    #[test]
    fn test_background_image_and_unparsable_colors() {
        let image = white_div(300.0, 300.0).background_image("url(hero.png)");
        assert_eq!(classify_one(1200.0, image), Decision::Skip(SkipReason::BackgroundImage));

        let inherit = NodeSpec::element("div").background("inherit").size(300.0, 100.0);
        assert_eq!(classify_one(1200.0, inherit), Decision::Skip(SkipReason::Unresolvable));

        let transparent = NodeSpec::element("div").size(300.0, 100.0);
        assert_eq!(classify_one(1200.0, transparent), Decision::Skip(SkipReason::Translucent));
    }

    #[test]
    fn test_marked_elements_are_never_reclassified() {
        let marks = MarkNames::default();
        for attr in [marks.override_attribute.clone(), marks.neutral_attribute.clone()] {
            let spec = white_div(300.0, 300.0).attr(&attr, "true");
            assert_eq!(classify_one(1200.0, spec), Decision::Skip(SkipReason::AlreadyMarked));
        }
    }

    #[test]
    fn test_text_and_detached_nodes_skip() {
        let mut page = Page::new("example.com", Viewport::default());
        let body = page.body().unwrap();
        let text = page.append(body, NodeSpec::text("hello")).unwrap();
        let div = page.append(body, white_div(300.0, 300.0)).unwrap();
        page.remove(div);
        let classifier = Classifier::new(ClassifierSettings::default(), MarkNames::default());
        assert_eq!(classifier.classify(&page, text), Decision::Skip(SkipReason::NotElement));
        assert_eq!(classifier.classify(&page, div), Decision::Skip(SkipReason::Detached));
    }
}
