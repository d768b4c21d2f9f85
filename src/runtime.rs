//! Single-threaded event loop around a [`Session`].
//!
//! Everything that can happen to a page arrives as a [`Signal`] through one
//! inbox: the page's own scripts editing the tree, observer records from a
//! host that delivers them directly, `DOMContentLoaded` and the window
//! `load` event. The loop
//! interleaves those with the scheduler's coalescing deadline and stops on
//! cancellation or when every sender is gone.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::bootstrap::Session;
use crate::dom::{Document, MutationRecord};
use crate::engine::PassReport;

pub type HostEdit<D> = Box<dyn FnOnce(&mut D) + Send>;

pub enum Signal<D> {
    /// A change made by the page itself. Observer records it produces are
    /// collected right after it runs.
    Edit(HostEdit<D>),
    Mutations(Vec<MutationRecord>),
    /// The document became interactive.
    Ready,
    Load,
}

impl<D> fmt::Debug for Signal<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Edit(_) => write!(f, "Edit"),
            Signal::Mutations(records) => write!(f, "Mutations({})", records.len()),
            Signal::Ready => write!(f, "Ready"),
            Signal::Load => write!(f, "Load"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub batches: usize,
    pub load_rescans: usize,
    /// Records still waiting in an open window at shutdown.
    pub discarded_records: usize,
    pub totals: PassReport,
}

pub fn channel<D>() -> (mpsc::UnboundedSender<Signal<D>>, mpsc::UnboundedReceiver<Signal<D>>) {
    mpsc::unbounded_channel()
}

enum Step<D> {
    Stop,
    Deadline,
    Signal(Option<Signal<D>>),
}

#[derive(Debug)]
pub struct Runtime<D> {
    doc: D,
    session: Session,
    inbox: mpsc::UnboundedReceiver<Signal<D>>,
    cancel: CancellationToken,
    loaded: bool,
    summary: RunSummary,
}

impl<D: Document> Runtime<D> {
    pub fn new(
        doc: D,
        session: Session,
        inbox: mpsc::UnboundedReceiver<Signal<D>>,
        cancel: CancellationToken,
    ) -> Self {
        let mut summary = RunSummary::default();
        if let Some(initial) = &session.initial {
            summary.totals.merge(initial);
        }
        Runtime {
            doc,
            session,
            inbox,
            cancel,
            loaded: false,
            summary,
        }
    }

    pub async fn run(mut self) -> (D, RunSummary) {
        let cancel = self.cancel.clone();
        loop {
            let deadline = self.session.scheduler.deadline();
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Stop,
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Step::Deadline,
                signal = self.inbox.recv() => Step::Signal(signal),
            };

            match step {
                Step::Stop => {
                    tracing::debug!("runtime cancelled");
                    break;
                }
                Step::Deadline => self.on_deadline(),
                Step::Signal(Some(signal)) => self.on_signal(signal),
                Step::Signal(None) => {
                    tracing::debug!("inbox closed");
                    break;
                }
            }
        }

        self.summary.discarded_records = self.session.scheduler.pending();
        if self.summary.discarded_records > 0 {
            tracing::debug!(records = self.summary.discarded_records, "discarding open batch");
        }
        (self.doc, self.summary)
    }

    fn on_signal(&mut self, signal: Signal<D>) {
        match signal {
            Signal::Edit(edit) => {
                edit(&mut self.doc);
                let records = self.doc.take_records();
                self.session.scheduler.observe(records, Instant::now());
            }
            Signal::Mutations(records) => {
                if !self.session.is_started() {
                    tracing::debug!(records = records.len(), "records before ready, dropped");
                    return;
                }
                self.session.scheduler.observe(records, Instant::now());
            }
            Signal::Ready => self.on_ready(),
            Signal::Load => self.on_load(),
        }
    }

    fn on_ready(&mut self) {
        if let Some(report) = self.session.start(&mut self.doc) {
            self.summary.totals.merge(&report);
        }
    }

    fn on_deadline(&mut self) {
        let session = &mut self.session;
        if let Some(report) = session.scheduler.fire(Instant::now(), &session.engine, &mut self.doc) {
            self.summary.batches += 1;
            self.summary.totals.merge(&report);
        }
    }

    fn on_load(&mut self) {
        if self.loaded {
            tracing::debug!("load already handled");
            return;
        }
        self.loaded = true;
        // `load` implies the tree was parsed.
        self.on_ready();
        let report = self.session.engine.rescan_structural(&mut self.doc);
        tracing::debug!(visited = report.visited, marked = report.marked, "load rescan complete");
        self.summary.load_rescans += 1;
        self.summary.totals.merge(&report);
    }
}
