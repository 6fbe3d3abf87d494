//! Runtime core integration tests - the literal end-to-end scenarios.
//!
//! Each test here exercises the `Runtime` facade the way an operator
//! would, rather than reaching into a single module's internals (that's
//! what the per-module `#[cfg(test)]` blocks are for).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ws_core::datatype::DatatypeCallbacks;
use ws_core::flush::{EdgeMessage, FlushKind};
use ws_core::index::RbTree;
use ws_core::queue::MwmrQueue;
use ws_core::record::Record;
use ws_core::{Runtime, RuntimeConfig};

#[test]
fn register_and_lookup() {
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let a1 = runtime.labels().register("A");
    let b = runtime.labels().register("B");
    let a2 = runtime.labels().register("A");

    assert_eq!(a1, a2);
    assert_ne!(a1, b);

    let found = runtime.labels().find_by_hash(a1.hash()).unwrap();
    assert_eq!(found, a1);
}

#[test]
fn tuple_pool_round_trip() {
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let uint32 = runtime
        .datatypes()
        .register("uint32", 4, DatatypeCallbacks::default())
        .unwrap();

    let before = runtime.tuples().stats().small;

    {
        let mut tuple = runtime.tuples().allocate().unwrap();
        for i in 0..10 {
            let label = runtime.labels().register(&format!("K{i}"));
            let child = uint32.allocate().unwrap();
            tuple.add_member(runtime.tuples(), label, child).unwrap();
        }
        assert_eq!(tuple.len(), 10);
        // `tuple` (and every member) drops here - the one consumer in the
        // scenario receiving and releasing it.
    }

    let after = runtime.tuples().stats().small;
    assert_eq!(after.size, before.size + 1);
}

#[test]
fn dependency_release_order() {
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let string_dt = runtime
        .datatypes()
        .register("string", 0, DatatypeCallbacks::default())
        .unwrap();

    let mut parent_tuple = runtime.tuples().allocate().unwrap();
    for name in ["S0", "S1", "S2"] {
        let child = string_dt.allocate().unwrap();
        let label = runtime.labels().register(name);
        parent_tuple
            .add_member(runtime.tuples(), label, child)
            .unwrap();
    }
    let parent: Record = parent_tuple.into_record();
    assert_eq!(parent.references(), 1);

    // Alias through the parent's own datatype (the shared "TUPLE" shape
    // `TupleStore` registers) - the pointer free list is per-datatype.
    let child = parent.datatype().make_alias(&parent).unwrap();
    // make_alias pushed `parent` onto `child`'s dependency stack, which is
    // an owning handle - refcount goes to 2.
    assert_eq!(parent.references(), 2);

    drop(parent);
    // The caller's own handle is gone, but the alias's dependency stack
    // keeps it alive - still exactly one more handle than zero.
    assert_eq!(child.dependencies()[0].references(), 1);

    drop(child);
    // Dropping the alias drops its dependency stack, releasing `parent`
    // exactly once, after `child`. `Arc`'s own bookkeeping makes a
    // double-release or a leak here a compile-time impossibility, not
    // just a runtime guarantee.
}

#[test]
fn rb_ordered_emit() {
    let mut tree: RbTree<i32, ()> = RbTree::new(0, |a, b| a.cmp(b));
    for (i, k) in [7, 3, 9, 1, 5, 8, 2, 6, 4].into_iter().enumerate() {
        if i == 0 {
            tree.insert_initial(k, (), 0);
        } else {
            tree.insert(k, (), 0);
        }
    }
    assert!(tree.check_invariants());

    let mut emitted = Vec::new();
    while let Some((k, _)) = tree.delete_min() {
        emitted.push(k);
    }
    assert_eq!(emitted, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn bounded_queue_back_pressure() {
    let queue = Arc::new(MwmrQueue::<u32, ()>::new(4, 1000));
    for i in 0..4 {
        assert!(queue.push(i, ()));
    }

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            queue.pop()
        })
    };

    // The 5th push must succeed within the attempt cap, not hang forever.
    assert!(queue.push_blocking(4, ()));
    let popped = consumer.join().unwrap().unwrap();
    assert_eq!(popped.0, 0);

    let mut remaining = Vec::new();
    while let Some((v, _)) = queue.pop() {
        remaining.push(v);
    }
    assert_eq!(remaining, vec![1, 2, 3, 4]);
}

#[test]
fn bundle_transport_delivers_all_records_in_order() {
    let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
    let uint32 = runtime
        .datatypes()
        .register("uint32", 4, DatatypeCallbacks::default())
        .unwrap();
    let queue: Arc<MwmrQueue<EdgeMessage<Record>, ()>> = Arc::new(MwmrQueue::new(16, 1000));

    let producer = {
        let queue = queue.clone();
        let uint32 = uint32.clone();
        thread::spawn(move || {
            for i in 0u32..1000 {
                let record = uint32.allocate().unwrap();
                record
                    .with_bytes_mut(|b| b.copy_from_slice(&i.to_le_bytes()))
                    .unwrap();
                while !queue.push_blocking(EdgeMessage::Record(record.clone()), ()) {}
            }
            queue.push_blocking(EdgeMessage::Flush(FlushKind::Terminal), ());
        })
    };

    let mut received = Vec::with_capacity(1000);
    loop {
        let (msg, _) = queue.pop_blocking().unwrap();
        match msg {
            EdgeMessage::Record(r) => {
                let value = r.with_bytes(|b| u32::from_le_bytes(b.try_into().unwrap())).unwrap();
                received.push(value);
            }
            EdgeMessage::Flush(kind) => {
                assert!(kind.is_terminal());
                break;
            }
        }
    }
    producer.join().unwrap();

    let expected: Vec<u32> = (0..1000).collect();
    assert_eq!(received, expected);
}
