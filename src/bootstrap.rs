use crate::classifier::Classifier;
use crate::config::Config;
use crate::dom::{Document, ObserveOptions, StyleInjector};
use crate::engine::{Engine, PassReport};
use crate::marker::Marker;
use crate::scheduler::Scheduler;
use crate::store::Preferences;
use crate::style;

/// A page the engine is attached to. Until [`Session::start`] has run the
/// style rules are in place but nothing is classified or observed.
#[derive(Debug)]
pub struct Session {
    pub engine: Engine,
    pub scheduler: Scheduler,
    /// Report of the first full pass, once it has run.
    pub initial: Option<PassReport>,
}

impl Session {
    pub fn is_started(&self) -> bool {
        self.initial.is_some()
    }

    /// Classifies the existing tree and starts observing. Runs once; later
    /// calls return `None`.
    pub fn start<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<PassReport> {
        if self.is_started() {
            return None;
        }
        let report = self.engine.full_pass(doc);
        doc.observe(ObserveOptions::ENGINE);
        self.initial = Some(report);

        tracing::info!(
            hostname = %doc.hostname(),
            visited = report.visited,
            marked = report.marked,
            neutralized = report.neutralized,
            "initial pass complete"
        );
        Some(report)
    }
}

/// Injects the theme rules right away and, if the document is already
/// interactive, starts the session. A page still loading is started by the
/// runtime on its ready signal, so the rules are in place before the first
/// paint while classification waits for a parsed tree.
///
/// Returns `None` when the page's host has opted out, in which case nothing
/// on the page is touched.
pub fn bootstrap<D: Document + StyleInjector + ?Sized>(doc: &mut D, prefs: &Preferences, cfg: &Config) -> Option<Session> {
    let hostname = doc.hostname().to_string();
    if prefs.site_scope.is_disabled(&hostname) {
        tracing::info!(hostname = %hostname, "site opted out, engine inert");
        return None;
    }

    let names = cfg.marks.names.clone();
    style::inject(doc, &cfg.marks.style_id, prefs.theme, &names);
    tracing::info!(hostname = %hostname, theme = prefs.theme.key, "style rules injected");

    let mut session = Session {
        engine: Engine::new(
            Classifier::new(cfg.classifier.clone(), names.clone()),
            Marker::new(names),
        ),
        scheduler: Scheduler::new(&cfg.scheduler),
        initial: None,
    };
    if doc.ready_state().is_interactive() {
        session.start(doc);
    } else {
        tracing::debug!(hostname = %hostname, "document loading, first pass deferred");
    }
    Some(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ReadyState, Viewport};
    use crate::marker::{Mark, MarkNames};
    use crate::page::{NodeSpec, Page};
    use crate::scheduler::Phase;
    use crate::store::{ConfigStore, DISABLED_SITES_KEY, MemoryStore};
    use crate::style::STYLE_ID;
    use serde_json::json;

    fn sample_page() -> Page {
        let mut page = Page::new("docs.example.com", Viewport { width: 1200.0, height: 900.0 });
        let body = page.body().unwrap();
        page.append(body, NodeSpec::element("div").id("card").background("#fff").size(400.0, 300.0));
        page
    }

    #[test]
    fn test_opted_out_host_is_untouched() {
        let mut store = MemoryStore::new();
        store.set(DISABLED_SITES_KEY, json!(["docs.example.com"])).unwrap();
        let prefs = Preferences::load(&store);

        let mut page = sample_page();
        assert!(bootstrap(&mut page, &prefs, &Config::default()).is_none());
        assert!(page.style_elements().is_empty());
        let card = page.element_by_id("card").unwrap();
        assert_eq!(MarkNames::default().mark_of(&page, card), None);

        // not observing: host edits produce no records
        let body = page.body().unwrap();
        page.append(body, NodeSpec::element("div"));
        assert!(page.take_records().is_empty());
    }

    #[test]
    fn test_bootstrap_injects_scans_and_observes() {
        let prefs = Preferences::load(&MemoryStore::new());
        let mut page = sample_page();
        let session = bootstrap(&mut page, &prefs, &Config::default()).unwrap();

        assert!(page.style_element(STYLE_ID).unwrap().contains("#CCE8CF"));
        let card = page.element_by_id("card").unwrap();
        assert_eq!(MarkNames::default().mark_of(&page, card), Some(Mark::Override));
        assert_eq!(session.initial.map(|r| r.marked), Some(1));
        assert_eq!(session.scheduler.phase(), Phase::Idle);

        // marking did not leave records behind, structure changes do
        assert!(page.take_records().is_empty());
        let body = page.body().unwrap();
        page.append(body, NodeSpec::element("div"));
        assert_eq!(page.take_records().len(), 1);
    }

    #[test]
    fn test_loading_page_gets_style_before_classification() {
        let prefs = Preferences::load(&MemoryStore::new());
        let mut page = sample_page();
        page.set_ready_state(ReadyState::Loading);

        let mut session = bootstrap(&mut page, &prefs, &Config::default()).unwrap();
        assert!(page.style_element(STYLE_ID).is_some());
        let card = page.element_by_id("card").unwrap();
        assert_eq!(MarkNames::default().mark_of(&page, card), None);
        assert!(!session.is_started());

        // parser still running: not observing yet
        let body = page.body().unwrap();
        page.append(body, NodeSpec::element("div"));
        assert!(page.take_records().is_empty());

        page.set_ready_state(ReadyState::Interactive);
        let report = session.start(&mut page).unwrap();
        assert_eq!(report.marked, 1);
        assert_eq!(MarkNames::default().mark_of(&page, card), Some(Mark::Override));
        assert!(session.start(&mut page).is_none());

        page.append(body, NodeSpec::element("div"));
        assert_eq!(page.take_records().len(), 1);
    }
}
