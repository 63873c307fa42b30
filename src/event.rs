use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::fs::loader::LoaderEvent;

/// Events delivered to the control thread.
#[derive(Debug)]
pub enum Event {
    /// Progress from a directory scan.
    Loader(LoaderEvent),
    /// Filesystem change detected by watcher.
    FsChange(Vec<PathBuf>),
}

/// Channel that background work reports into and the driver drains.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { rx, tx }
    }

    /// Get a sender clone for loaders and watchers.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (waits until one is available).
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take an event if one is already queued.
    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_events_arrive_in_order() {
        let mut handler = EventHandler::new();
        let tx = handler.sender();
        tx.send(Event::FsChange(vec![PathBuf::from("/a")])).unwrap();
        tx.send(Event::FsChange(vec![PathBuf::from("/b")])).unwrap();

        match handler.next().await {
            Some(Event::FsChange(paths)) => assert_eq!(paths, vec![PathBuf::from("/a")]),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(handler.try_next(), Some(Event::FsChange(_))));
        assert!(handler.try_next().is_none());
    }
}
