use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::bootstrap::bootstrap;
use crate::config::Config;
use crate::dom::{Document, NodeId, descendants};
use crate::marker::Mark;
use crate::page::{HostAction, Page, PageSnapshot};
use crate::runtime::{self, Runtime, RunSummary, Signal};
use crate::store::Preferences;

#[derive(Debug, Serialize)]
pub struct MarkedNode {
    pub node: NodeId,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub mark: Mark,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub hostname: String,
    pub theme: &'static str,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    pub marks: Vec<MarkedNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
}

/// Bootstraps the engine on a captured page and replays its timeline in
/// (tokio) time, returning every mark left on the page.
pub async fn replay(snapshot: PageSnapshot, prefs: &Preferences, cfg: &Config) -> ReplayReport {
    let mut page = Page::from_snapshot(&snapshot);
    let mut report = ReplayReport {
        hostname: snapshot.hostname.clone(),
        theme: prefs.theme.key,
        active: false,
        summary: None,
        marks: Vec::new(),
        css: None,
    };

    let Some(session) = bootstrap(&mut page, prefs, cfg) else {
        return report;
    };

    let (tx, rx) = runtime::channel::<Page>();
    let runtime = Runtime::new(page, session, rx, CancellationToken::new());
    // Long enough for the window opened by the last step to close.
    let settle = Duration::from_millis(cfg.scheduler.coalesce_ms * 2 + 1);

    let timeline = snapshot.timeline;
    let driver = async move {
        let start = Instant::now();
        for step in timeline {
            sleep_until(start + Duration::from_millis(step.at_ms)).await;
            // Lifecycle steps update the page before the event is dispatched.
            let event = match step.action {
                HostAction::Ready => Some(Signal::Ready),
                HostAction::Load => Some(Signal::Load),
                _ => None,
            };
            let action = step.action;
            let edit = Signal::Edit(Box::new(move |page: &mut Page| {
                if let Err(e) = page.apply(&action) {
                    tracing::warn!(error = %e, "skipping timeline step");
                }
            }));
            if tx.send(edit).is_err() || event.is_some_and(|event| tx.send(event).is_err()) {
                break;
            }
        }
        sleep(settle).await;
    };

    let ((page, summary), ()) = tokio::join!(runtime.run(), driver);

    report.active = true;
    report.summary = Some(summary);
    report.css = page.style_element(&cfg.marks.style_id).map(str::to_string);
    report.marks = collect_marks(&page, cfg);
    report
}

fn collect_marks(page: &Page, cfg: &Config) -> Vec<MarkedNode> {
    let Some(root) = page.root() else {
        return Vec::new();
    };
    descendants(page, root)
        .into_iter()
        .filter_map(|node| {
            let mark = cfg.marks.names.mark_of(page, node)?;
            Some(MarkedNode {
                node,
                tag: page.tag_name(node)?.to_string(),
                id: page.attribute(node, "id").map(str::to_string),
                mark,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConfigStore, DISABLED_SITES_KEY, MemoryStore};
    use serde_json::json;

    const SNAPSHOT: &str = r##"{
        "hostname": "news.example.com",
        "viewport": {"width": 1280, "height": 800},
        "body": [
            {"tag": "main", "attributes": {"id": "page"}, "rect": {"width": 1280, "height": 3000},
             "children": [
                {"tag": "div", "attributes": {"id": "feed"}, "rect": {"width": 700, "height": 2000}}
             ]}
        ],
        "timeline": [
            {"at_ms": 10, "kind": "append", "parent_id": "feed",
             "node": {"tag": "article", "attributes": {"id": "story"},
                      "style": {"background_color": "rgb(255, 255, 255)"},
                      "rect": {"width": 680, "height": 240},
                      "children": [
                        {"tag": "p", "attributes": {"id": "lede"},
                         "style": {"background_color": "#fff"},
                         "rect": {"width": 660, "height": 60}}
                      ]}},
            {"at_ms": 30, "kind": "append", "parent_id": "missing",
             "node": {"tag": "div"}},
            {"at_ms": 400, "kind": "load"}
        ]
    }"##;

    fn find<'a>(report: &'a ReplayReport, id: &str) -> Option<&'a MarkedNode> {
        report.marks.iter().find(|m| m.id.as_deref() == Some(id))
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_marks_lazy_content() {
        let snapshot: PageSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let prefs = Preferences::load(&MemoryStore::new());
        let report = replay(snapshot, &prefs, &Config::default()).await;

        assert!(report.active);
        let summary = report.summary.unwrap();
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.load_rescans, 1);
        assert_eq!(find(&report, "story").map(|m| m.mark), Some(Mark::Override));
        assert_eq!(find(&report, "lede").map(|m| m.mark), Some(Mark::Neutral));
        assert!(find(&report, "feed").is_none());
        assert!(report.css.unwrap().contains("#CCE8CF"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_of_loading_page_starts_at_ready() {
        let raw = r##"{
            "hostname": "blog.example.com",
            "viewport": {"width": 1280, "height": 800},
            "ready_state": "loading",
            "body": [
                {"tag": "div", "attributes": {"id": "post"},
                 "style": {"background_color": "#fafafa"},
                 "rect": {"width": 720, "height": 900}}
            ],
            "timeline": [
                {"at_ms": 5, "kind": "append",
                 "node": {"tag": "aside", "attributes": {"id": "sidebar"},
                          "style": {"background_color": "#fff"},
                          "rect": {"width": 300, "height": 600}}},
                {"at_ms": 50, "kind": "ready"}
            ]
        }"##;
        let snapshot: PageSnapshot = serde_json::from_str(raw).unwrap();
        let prefs = Preferences::load(&MemoryStore::new());
        let report = replay(snapshot, &prefs, &Config::default()).await;

        let summary = report.summary.unwrap();
        // both were classified by the first pass, none through a batch
        assert_eq!(summary.batches, 0);
        assert_eq!(summary.totals.marked, 2);
        assert_eq!(find(&report, "post").map(|m| m.mark), Some(Mark::Override));
        assert_eq!(find(&report, "sidebar").map(|m| m.mark), Some(Mark::Override));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_on_opted_out_host() {
        let snapshot: PageSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let mut store = MemoryStore::new();
        store.set(DISABLED_SITES_KEY, json!(["news.example.com"])).unwrap();
        let report = replay(snapshot, &Preferences::load(&store), &Config::default()).await;

        assert!(!report.active);
        assert!(report.marks.is_empty());
        assert!(report.css.is_none());
    }
}
