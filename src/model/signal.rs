//! Change notifications and the observers that receive them.

use tokio::sync::mpsc;

use super::iter::{TreeIter, TreePath};
use super::sort::SortSettings;
use crate::fs::loader::DirectoryHandle;

/// A structural change to the model, delivered in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    RowInserted {
        path: TreePath,
        iter: TreeIter,
    },
    RowChanged {
        path: TreePath,
        iter: TreeIter,
    },
    /// The row at `path` is gone; its iterators are dead.
    RowDeleted {
        path: TreePath,
    },
    /// Children of `path` (the top level when `iter` is `None`) were
    /// permuted: `new_order[new_position] == old_position`.
    RowsReordered {
        path: TreePath,
        iter: Option<TreeIter>,
        new_order: Vec<usize>,
    },
    RowHasChildToggled {
        path: TreePath,
        iter: TreeIter,
    },
    /// A directory scan session was released by the model.
    SubdirectoryUnloaded {
        directory: DirectoryHandle,
    },
    SortColumnChanged {
        settings: SortSettings,
    },
}

/// Token returned by [`crate::model::ListModel::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Box<dyn FnMut(&ModelEvent) + Send>;

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    callbacks: Vec<(ObserverId, Callback)>,
    channels: Vec<mpsc::UnboundedSender<ModelEvent>>,
}

impl Observers {
    pub fn connect(&mut self, callback: Callback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ModelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.push(tx);
        rx
    }

    /// Callbacks run first, in registration order; closed channels are pruned.
    pub fn emit(&mut self, event: ModelEvent) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(&event);
        }
        if !self.channels.is_empty() {
            self.channels.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("callbacks", &self.callbacks.len())
            .field("channels", &self.channels.len())
            .finish()
    }
}
