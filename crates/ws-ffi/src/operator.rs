//! The operator contract (§6): `init`, `input_set`, `process_fn`, `destroy`.
//!
//! The source project dispatches every one of these through a process-wide
//! function-pointer vtable, keyed by an index into a flat array of "kid"
//! descriptors. Per the Design Notes' "function-pointer vtables" redesign,
//! this is re-expressed as a plain Rust trait generic over the kid's own
//! state type, so the hot path (`process_fn`) is monomorphized whenever
//! the concrete operator type is known at the call site - exactly the
//! graphs built directly against a fixed set of kids, which is the common
//! case. [`DynOperator`] is the narrow, object-safe fallback used only at
//! the graph-loader boundary (itself out of scope, per §1), where the
//! concrete kid type is erased behind configuration-driven construction.

use std::any::Any;
use std::sync::Arc;

use ws_core::flush::EdgeMessage;
use ws_core::record::Record;
use ws_core::Runtime;

use crate::metadata::OperatorMetadata;
use crate::ports::OutputPorts;

/// Final per-instance counters an operator reports from `destroy`, per
/// §6's "final cleanup; reports counters".
#[derive(Debug, Clone, Default)]
pub struct OperatorCounters {
    pub processed: u64,
    pub emitted: u64,
    pub dropped: u64,
}

/// A negotiated hot-path function: given the operator's own state, an
/// inbound message, the output ports `input_set` wired up for this edge,
/// and the type index the record arrived as, process it and report
/// whether it was handled.
pub type ProcessFn<S> =
    Arc<dyn Fn(&mut S, EdgeMessage<Record>, &OutputPorts, u32) -> bool + Send + Sync>;

/// A hook a source kid uses during `init` to register itself with the
/// scheduler (the source project's `ws_register_source`). The scheduler
/// itself is out of scope (§1); this is the seam a source kid's `init`
/// compiles against.
pub trait SourceRegistry {
    fn register_source(&mut self, name: &str);
}

/// The operator contract a leaf kid implements (§6).
///
/// `State` is the kid's own per-instance data, constructed by `init` and
/// consumed by `destroy`. Nothing about `Operator` requires `State` to be
/// `'static` or object-safe-friendly; that constraint only shows up on
/// [`DynOperator`], the type-erased adapter used at the loader boundary.
pub trait Operator: Send + Sync {
    type State: Send;

    /// Static metadata published once, before any instance exists.
    fn metadata(&self) -> OperatorMetadata;

    /// Called once per instance. Registers labels/datatypes through
    /// `runtime` and, for source kids, calls back into `sources`.
    fn init(
        &self,
        argv: &[String],
        runtime: &Runtime,
        sources: Option<&mut dyn SourceRegistry>,
    ) -> ws_core::Result<Self::State>;

    /// Negotiate the per-edge hot-path function for one inbound edge.
    /// Returns `None` if this kid does not handle `input_type` at all.
    fn input_set(
        &self,
        state: &mut Self::State,
        input_type: &str,
        port: u32,
        runtime: &Runtime,
    ) -> Option<ProcessFn<Self::State>>;

    /// Final cleanup; reports the instance's lifetime counters.
    fn destroy(&self, state: Self::State) -> OperatorCounters;
}

/// Type-erased adapter so a graph loader can hold a homogeneous
/// collection of kids without knowing each one's concrete `State` type.
/// `state` is boxed as `dyn Any` purely for storage; the loader never
/// downcasts it itself - it only round-trips the box between
/// `init`/`process`/`destroy` on the same instance.
pub trait DynOperator: Send + Sync {
    fn metadata(&self) -> OperatorMetadata;

    fn dyn_init(
        &self,
        argv: &[String],
        runtime: &Runtime,
        sources: Option<&mut dyn SourceRegistry>,
    ) -> ws_core::Result<Box<dyn Any + Send>>;

    fn dyn_input_set(
        &self,
        state: &mut Box<dyn Any + Send>,
        input_type: &str,
        port: u32,
        runtime: &Runtime,
    ) -> Option<Arc<dyn Fn(&mut (dyn Any + Send), EdgeMessage<Record>, &OutputPorts, u32) -> bool + Send + Sync>>;

    fn dyn_destroy(&self, state: Box<dyn Any + Send>) -> OperatorCounters;
}

/// Blanket adapter: any `Operator` whose `State` is `'static` can be used
/// wherever a `DynOperator` is needed.
impl<O> DynOperator for O
where
    O: Operator,
    O::State: 'static,
{
    fn metadata(&self) -> OperatorMetadata {
        Operator::metadata(self)
    }

    fn dyn_init(
        &self,
        argv: &[String],
        runtime: &Runtime,
        sources: Option<&mut dyn SourceRegistry>,
    ) -> ws_core::Result<Box<dyn Any + Send>> {
        let state = self.init(argv, runtime, sources)?;
        Ok(Box::new(state))
    }

    fn dyn_input_set(
        &self,
        state: &mut Box<dyn Any + Send>,
        input_type: &str,
        port: u32,
        runtime: &Runtime,
    ) -> Option<Arc<dyn Fn(&mut (dyn Any + Send), EdgeMessage<Record>, &OutputPorts, u32) -> bool + Send + Sync>> {
        let typed = state.downcast_mut::<O::State>()?;
        let process = self.input_set(typed, input_type, port, runtime)?;
        Some(Arc::new(move |state, msg, ports, type_index| {
            let typed = state
                .downcast_mut::<O::State>()
                .expect("DynOperator invariant: state box always holds O::State");
            process(typed, msg, ports, type_index)
        }))
    }

    fn dyn_destroy(&self, state: Box<dyn Any + Send>) -> OperatorCounters {
        let typed = *state
            .downcast::<O::State>()
            .unwrap_or_else(|_| panic!("DynOperator invariant: state box always holds O::State"));
        self.destroy(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{DirectPort, OutputPorts};
    use std::sync::atomic::{AtomicBool, Ordering};
    use ws_core::RuntimeConfig;

    /// A minimal kid used to exercise the contract end to end: forwards
    /// every record it sees to output port 0 and counts what it handled.
    struct PassThrough;

    struct PassThroughState {
        label: ws_core::label::Label,
        counters: OperatorCounters,
    }

    impl Operator for PassThrough {
        type State = PassThroughState;

        fn metadata(&self) -> OperatorMetadata {
            OperatorMetadata::new("passthrough", "1.0.0")
        }

        fn init(
            &self,
            _argv: &[String],
            runtime: &Runtime,
            _sources: Option<&mut dyn SourceRegistry>,
        ) -> ws_core::Result<Self::State> {
            let label = runtime.labels().register("PASSTHROUGH");
            Ok(PassThroughState {
                label,
                counters: OperatorCounters::default(),
            })
        }

        fn input_set(
            &self,
            _state: &mut Self::State,
            input_type: &str,
            _port: u32,
            _runtime: &Runtime,
        ) -> Option<ProcessFn<Self::State>> {
            if input_type != "TUPLE" {
                return None;
            }
            Some(Arc::new(|state: &mut PassThroughState, msg, ports: &OutputPorts, _type_index| {
                match &msg {
                    EdgeMessage::Record(r) => {
                        r.add_container_label(state.label.clone());
                        state.counters.processed += 1;
                    }
                    EdgeMessage::Flush(_) => {}
                }
                let sent = ports.send(0, msg);
                if sent {
                    state.counters.emitted += 1;
                } else {
                    state.counters.dropped += 1;
                }
                sent
            }))
        }

        fn destroy(&self, state: Self::State) -> OperatorCounters {
            state.counters
        }
    }

    #[test]
    fn operator_contract_end_to_end() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let kid = PassThrough;
        let mut state = kid.init(&[], &runtime, None).unwrap();
        let process = kid.input_set(&mut state, "TUPLE", 0, &runtime).unwrap();

        let seen = Arc::new(AtomicBool::new(false));
        let seen2 = seen.clone();
        let mut ports = OutputPorts::new();
        ports.push(Arc::new(DirectPort::new(move |_msg| {
            seen2.store(true, Ordering::SeqCst);
            true
        })));

        let dt = runtime.datatypes().register("uint32", 4, Default::default()).unwrap();
        let record = dt.allocate().unwrap();
        let handled = process(&mut state, EdgeMessage::Record(record), &ports, 0);

        assert!(handled);
        assert!(seen.load(Ordering::SeqCst));

        let counters = kid.destroy(state);
        assert_eq!(counters.processed, 1);
        assert_eq!(counters.emitted, 1);
    }

    #[test]
    fn input_set_rejects_unknown_type() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let kid = PassThrough;
        let mut state = kid.init(&[], &runtime, None).unwrap();
        assert!(kid.input_set(&mut state, "CSV_ROW", 0, &runtime).is_none());
    }

    #[test]
    fn dyn_operator_round_trips_through_type_erasure() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let kid: Box<dyn DynOperator> = Box::new(PassThrough);
        let mut state = kid.dyn_init(&[], &runtime, None).unwrap();
        let process = kid.dyn_input_set(&mut state, "TUPLE", 0, &runtime).unwrap();

        let mut ports = OutputPorts::new();
        ports.push(Arc::new(DirectPort::new(|_msg| true)));

        let dt = runtime.datatypes().register("uint32", 4, Default::default()).unwrap();
        let record = dt.allocate().unwrap();
        assert!(process(&mut *state, EdgeMessage::Record(record), &ports, 0));

        let counters = kid.dyn_destroy(state);
        assert_eq!(counters.processed, 1);
    }

    #[test]
    fn terminal_flush_forwards_without_touching_counters() {
        let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
        let kid = PassThrough;
        let mut state = kid.init(&[], &runtime, None).unwrap();
        let process = kid.input_set(&mut state, "TUPLE", 0, &runtime).unwrap();

        let mut ports = OutputPorts::new();
        ports.push(Arc::new(DirectPort::new(|_msg| true)));

        let handled = process(
            &mut state,
            EdgeMessage::Flush(ws_core::FlushKind::Terminal),
            &ports,
            0,
        );
        assert!(handled);
        assert_eq!(state.counters.processed, 0);
        assert_eq!(state.counters.emitted, 1);
    }
}
