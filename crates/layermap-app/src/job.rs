use crate::ControllerError;
use crossbeam_channel::{Receiver, bounded};
use layermap_graph::{GraphModel, LayeredLayouter, LayoutResult, Layouter};
use std::thread::JoinHandle;

/// A finished background layout, tagged with the revision of the snapshot it ran on.
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    pub revision: u64,
    pub result: LayoutResult,
}

/// Layout running on a worker thread over a private copy of the graph.
pub struct LayoutJob {
    revision: u64,
    rx: Receiver<LayoutOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl LayoutJob {
    pub fn spawn(snapshot: GraphModel, layouter: LayeredLayouter) -> Self {
        let revision = snapshot.revision();
        let (tx, rx) = bounded(1);

        // Use a dedicated thread so the editing loop stays responsive on large boards.
        let handle = std::thread::spawn(move || {
            let result = layouter.execute(&snapshot);
            let _ = tx.send(LayoutOutcome { revision, result });
        });

        Self {
            revision,
            rx,
            handle: Some(handle),
        }
    }

    /// Revision of the graph snapshot this job lays out.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Non-blocking poll, for callers pumping a UI loop.
    pub fn try_recv(&self) -> Option<LayoutOutcome> {
        self.rx.try_recv().ok()
    }

    pub fn receiver(&self) -> Receiver<LayoutOutcome> {
        self.rx.clone()
    }

    /// Blocks until the worker delivers its result.
    pub fn wait(mut self) -> Result<LayoutOutcome, ControllerError> {
        let outcome = self.rx.recv().map_err(|_| ControllerError::LayoutWorker);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Layout worker for revision {} panicked", self.revision);
            }
        }
        outcome
    }
}
