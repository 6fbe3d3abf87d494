//! Output ports - the `dout` half of the operator contract (§6).
//!
//! Per §5's scheduling model, an edge out of an operator is either a
//! direct in-thread function call (the hot path) or a cross-thread
//! hand-off through a [`ws_core::queue::MwmrQueue`] (the slow path). Both
//! are expressed uniformly here as an [`OutputPort`] so `process_fn`
//! never needs to know which kind of edge it is writing to.

use std::sync::Arc;

use ws_core::flush::EdgeMessage;
use ws_core::queue::MwmrQueue;
use ws_core::record::Record;

/// One outbound edge a kid can write to.
pub trait OutputPort: Send + Sync {
    /// Send a message, blocking (with the queue's configured attempt cap)
    /// if the edge is backed by a bounded cross-thread queue. Returns
    /// `false` if the edge could not accept the message (closed, or
    /// back-pressure exhausted its attempt budget) - the caller increments
    /// a drop counter and continues, per §7's resource-exhaustion policy.
    fn send(&self, msg: EdgeMessage<Record>) -> bool;
}

/// An in-thread edge: `process_fn` calls straight into the next
/// operator's own `process_fn`, no queue, no thread hop.
pub struct DirectPort<F>(F)
where
    F: Fn(EdgeMessage<Record>) -> bool + Send + Sync;

impl<F> DirectPort<F>
where
    F: Fn(EdgeMessage<Record>) -> bool + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> OutputPort for DirectPort<F>
where
    F: Fn(EdgeMessage<Record>) -> bool + Send + Sync,
{
    fn send(&self, msg: EdgeMessage<Record>) -> bool {
        (self.0)(msg)
    }
}

/// A cross-thread edge backed by the C7 bounded MWMR queue.
impl OutputPort for MwmrQueue<EdgeMessage<Record>, ()> {
    fn send(&self, msg: EdgeMessage<Record>) -> bool {
        self.push_blocking(msg, ())
    }
}

/// The full set of output edges `input_set` negotiated for one input
/// port, indexed the same way the source project indexes `dout` by
/// `type_index`.
#[derive(Clone, Default)]
pub struct OutputPorts {
    ports: Vec<Arc<dyn OutputPort>>,
}

impl OutputPorts {
    pub fn new() -> Self {
        Self { ports: Vec::new() }
    }

    pub fn push(&mut self, port: Arc<dyn OutputPort>) {
        self.ports.push(port);
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Send to the port at `type_index`. Returns `false` (instead of
    /// panicking) if `type_index` was never registered - a kid that races
    /// `input_set` against a bad index is a programmer error per §7, not
    /// a crash.
    pub fn send(&self, type_index: usize, msg: EdgeMessage<Record>) -> bool {
        match self.ports.get(type_index) {
            Some(port) => port.send(msg),
            None => {
                log::error!("output port index {type_index} out of range ({})", self.ports.len());
                false
            }
        }
    }

    /// Forward a flush to every declared output port, per §6's "terminal
    /// flushes must be forwarded until they reach a sink".
    pub fn forward_flush(&self, kind: ws_core::FlushKind) {
        for port in &self.ports {
            port.send(EdgeMessage::Flush(kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn direct_port_invokes_closure() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        let port = DirectPort::new(move |_msg| {
            seen2.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert!(port.send(EdgeMessage::Flush(ws_core::FlushKind::Terminal)));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn output_ports_dispatch_by_index() {
        let mut ports = OutputPorts::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        ports.push(Arc::new(DirectPort::new(move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
            true
        })));

        assert!(ports.send(0, EdgeMessage::Flush(ws_core::FlushKind::Terminal)));
        assert!(!ports.send(1, EdgeMessage::Flush(ws_core::FlushKind::Terminal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn forward_flush_reaches_every_port() {
        let mut ports = OutputPorts::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = calls.clone();
            ports.push(Arc::new(DirectPort::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                true
            })));
        }
        ports.forward_flush(ws_core::FlushKind::Terminal);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn mwmr_queue_as_output_port() {
        let q: MwmrQueue<EdgeMessage<Record>, ()> = MwmrQueue::new(4, 10);
        assert!(q.send(EdgeMessage::Flush(ws_core::FlushKind::Terminal)));
        assert_eq!(q.len(), 1);
    }
}
