use callsight_core::NodeId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Display-facing events. The renderer consumes these; the session layer only
/// publishes and never blocks on delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// The whole graph was replaced by a push from the analysis side.
    GraphReplaced {
        node_count: usize,
        edge_count: usize,
    },
    /// An expansion fragment was merged into the running graph.
    NodesMerged {
        source: NodeId,
        nodes_added: usize,
        edges_added: usize,
    },
    NodeExpanded {
        id: NodeId,
    },
    /// The highlighted-files overlay changed. Positions are untouched.
    HighlightChanged {
        files: Vec<String>,
    },
    NavigateRequested {
        filepath: String,
        line: u32,
    },
    StatusUpdate {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsight_core::NodeId;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let receiver = bus.receiver();

        bus.publish(Event::NodesMerged {
            source: NodeId::from("fileA"),
            nodes_added: 3,
            edges_added: 2,
        });

        match receiver.recv().unwrap() {
            Event::NodesMerged {
                source,
                nodes_added,
                edges_added,
            } => {
                assert_eq!(source.as_str(), "fileA");
                assert_eq!(nodes_added, 3);
                assert_eq!(edges_added, 2);
            }
            _ => panic!("Expected NodesMerged event"),
        }
    }

    #[test]
    fn test_dispatch_to_listener() {
        struct Counter(usize);
        impl EventListener for Counter {
            fn handle_event(&mut self, _event: &Event) {
                self.0 += 1;
            }
        }

        let bus = EventBus::new();
        bus.publish(Event::StatusUpdate {
            message: "ready".to_string(),
        });
        bus.publish(Event::HighlightChanged { files: vec![] });

        let mut counter = Counter(0);
        bus.dispatch_to(&mut counter);
        assert_eq!(counter.0, 2);
    }
}
