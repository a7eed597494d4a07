//! Hand-off from the receive task to the presentation context.
//!
//! The receive task owns a [`Dispatcher`] and pushes every decoded event
//! into an unbounded FIFO channel. The presentation context owns the single
//! [`EventQueue`] and drains it from its own loop, so events reach the
//! [`PresentationSink`] one at a time and in decode order.

use tokio::sync::mpsc;
use tracing::trace;

use chatline_protocol::ChatEvent;

/// What the receive task reports to the presentation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A decoded inbound event.
    Event(ChatEvent),
    /// The receive loop ended while the session was connected.
    ConnectionLost,
}

/// The consumer of session events, typically a UI.
///
/// Both methods run on the presentation context, never concurrently.
pub trait PresentationSink {
    /// Renders one inbound event.
    fn on_event(&mut self, event: ChatEvent);

    /// Reports that the connection dropped without a local disconnect.
    fn on_connection_lost(&mut self);
}

/// Sending half, held by the receive task.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

/// Receiving half, held by the presentation context.
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Dispatcher {
    /// Creates a connected dispatcher/queue pair.
    pub fn channel() -> (Dispatcher, EventQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher { tx }, EventQueue { rx })
    }

    /// Queues a decoded event. Returns false once the queue is gone.
    pub fn dispatch_event(&self, event: ChatEvent) -> bool {
        self.dispatch(SessionEvent::Event(event))
    }

    /// Queues the connection-lost notice. Returns false once the queue is gone.
    pub fn connection_lost(&self) -> bool {
        self.dispatch(SessionEvent::ConnectionLost)
    }

    fn dispatch(&self, event: SessionEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                trace!(?event, "presentation queue closed, dropping event");
                false
            }
        }
    }
}

impl EventQueue {
    /// Waits for the next event.
    ///
    /// Returns `None` once every [`Dispatcher`] is dropped and the queue is
    /// empty, i.e. the receive task has finished.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Takes the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// Delivers every queued event to `sink` without waiting.
    ///
    /// Meant to be called once per iteration of a presentation loop.
    /// Returns the number of events delivered.
    pub fn drain_into<S: PresentationSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.try_next() {
            deliver(event, sink);
            delivered += 1;
        }
        delivered
    }
}

/// Routes one session event to the matching sink method.
pub fn deliver<S: PresentationSink + ?Sized>(event: SessionEvent, sink: &mut S) {
    match event {
        SessionEvent::Event(event) => sink.on_event(event),
        SessionEvent::ConnectionLost => sink.on_connection_lost(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Sink recording everything it is given, in order.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) seen: Vec<SessionEvent>,
    }

    impl PresentationSink for RecordingSink {
        fn on_event(&mut self, event: ChatEvent) {
            self.seen.push(SessionEvent::Event(event));
        }

        fn on_connection_lost(&mut self) {
            self.seen.push(SessionEvent::ConnectionLost);
        }
    }

    #[test]
    fn drain_preserves_order() {
        let (dispatcher, mut queue) = Dispatcher::channel();
        for i in 0..100 {
            assert!(dispatcher.dispatch_event(ChatEvent::system(format!("n{i}"))));
        }
        assert!(dispatcher.connection_lost());

        let mut sink = RecordingSink::default();
        assert_eq!(queue.drain_into(&mut sink), 101);
        for (i, seen) in sink.seen[..100].iter().enumerate() {
            assert_eq!(seen, &SessionEvent::Event(ChatEvent::system(format!("n{i}"))));
        }
        assert_eq!(sink.seen[100], SessionEvent::ConnectionLost);
        assert_eq!(queue.drain_into(&mut sink), 0);
    }

    #[tokio::test]
    async fn order_holds_across_threads() {
        let (dispatcher, mut queue) = Dispatcher::channel();
        let producer = std::thread::spawn(move || {
            for i in 0..1000u32 {
                dispatcher.dispatch_event(ChatEvent::system(i.to_string()));
                if i % 97 == 0 {
                    std::thread::yield_now();
                }
            }
        });

        let mut expected = 0u32;
        while let Some(event) = queue.recv().await {
            assert_eq!(event, SessionEvent::Event(ChatEvent::system(expected.to_string())));
            expected += 1;
        }
        producer.join().unwrap();
        assert_eq!(expected, 1000);
    }

    #[test]
    fn dispatch_reports_closed_queue() {
        let (dispatcher, queue) = Dispatcher::channel();
        drop(queue);
        assert!(!dispatcher.dispatch_event(ChatEvent::system("late")));
        assert!(!dispatcher.connection_lost());
    }

    #[test]
    fn deliver_routes_variants() {
        let mut sink = RecordingSink::default();
        deliver(SessionEvent::Event(ChatEvent::join("U1", "a")), &mut sink);
        deliver(SessionEvent::ConnectionLost, &mut sink);
        assert_eq!(
            sink.seen,
            vec![
                SessionEvent::Event(ChatEvent::join("U1", "a")),
                SessionEvent::ConnectionLost
            ]
        );
    }
}
