//! Exercises the processing-iteration fan-out rules of §4.3 against the
//! in-process thread binding, plus the TTL/DeathLog invariants of §8.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use triage_dispatcher::Dispatcher;
use triage_protocol::{Kind, Object, Payload};
use triage_queue::{Command, ObjectQueue, ThreadProcLock, ThreadQueue};
use triage_worker::WorkerHandle;

fn noop_handle(name: &str, declared_kinds: Option<HashSet<Kind>>) -> WorkerHandle {
    let to_worker: Arc<dyn ObjectQueue<Object>> = Arc::new(ThreadQueue::unbounded());
    let from_worker: Arc<dyn ObjectQueue<Object>> = Arc::new(ThreadQueue::unbounded());
    let cmd_queue: Arc<dyn ObjectQueue<Command>> = Arc::new(ThreadQueue::unbounded());
    let proc_lock = Arc::new(ThreadProcLock::new());
    let join = thread::spawn(|| {});
    WorkerHandle::new(
        name,
        to_worker,
        from_worker,
        cmd_queue,
        proc_lock,
        declared_kinds,
        join,
    )
}

fn log_entry(ttl: i64) -> Object {
    Object::new(
        Payload::LogEntry {
            log_data: "hello".to_string(),
        },
        ttl,
    )
}

#[test]
fn sink_observes_log_entry_no_death_log() {
    let funnel = noop_handle("funnel", None);
    let producer = noop_handle("producer", None);
    let mut sink_kinds = HashSet::new();
    sink_kinds.insert(Kind::LogEntry);
    let sink = noop_handle("log-sink", Some(sink_kinds));

    producer.from_worker.send(log_entry(5)).unwrap();

    let dispatcher = Dispatcher {
        funnel,
        producers: vec![producer],
        transformers: vec![],
        sinks: vec![sink],
    };

    assert!(dispatcher.processing_iteration());
    let delivered = dispatcher.sinks[0].to_worker.try_recv().unwrap();
    assert!(delivered.is_some());
    assert!(dispatcher.funnel.to_worker.try_recv().unwrap().is_none());
}

#[test]
fn unhandled_kind_produces_exactly_one_death_log() {
    let funnel = noop_handle("funnel", None);
    let producer = noop_handle("producer", None);

    producer.from_worker.send(log_entry(5)).unwrap();

    let dispatcher = Dispatcher {
        funnel,
        producers: vec![producer],
        transformers: vec![],
        sinks: vec![],
    };

    assert!(dispatcher.processing_iteration());
    let death = dispatcher.funnel.to_worker.try_recv().unwrap();
    assert!(matches!(
        death.unwrap().payload,
        Payload::DeathLog { .. }
    ));
    assert!(dispatcher.funnel.to_worker.try_recv().unwrap().is_none());
}

#[test]
fn expired_ttl_routes_straight_to_death_log() {
    let funnel = noop_handle("funnel", None);
    let producer = noop_handle("producer", None);
    let mut sink_kinds = HashSet::new();
    sink_kinds.insert(Kind::LogEntry);
    let sink = noop_handle("log-sink", Some(sink_kinds));

    producer.from_worker.send(log_entry(-1)).unwrap();

    let dispatcher = Dispatcher {
        funnel,
        producers: vec![producer],
        transformers: vec![],
        sinks: vec![sink],
    };

    assert!(dispatcher.processing_iteration());
    assert!(dispatcher.sinks[0].to_worker.try_recv().unwrap().is_none());
    let death = dispatcher.funnel.to_worker.try_recv().unwrap().unwrap();
    assert!(matches!(death.payload, Payload::DeathLog { .. }));
}

#[test]
fn fan_out_copies_to_every_accepting_consumer() {
    let funnel = noop_handle("funnel", None);
    let producer = noop_handle("producer", None);
    let mut kinds = HashSet::new();
    kinds.insert(Kind::LogEntry);
    let sink_a = noop_handle("sink-a", Some(kinds.clone()));
    let sink_b = noop_handle("sink-b", Some(kinds));

    producer.from_worker.send(log_entry(5)).unwrap();

    let dispatcher = Dispatcher {
        funnel,
        producers: vec![producer],
        transformers: vec![],
        sinks: vec![sink_a, sink_b],
    };

    assert!(dispatcher.processing_iteration());
    assert!(dispatcher.sinks[0].to_worker.try_recv().unwrap().is_some());
    assert!(dispatcher.sinks[1].to_worker.try_recv().unwrap().is_some());
}

#[test]
fn reemit_sets_child_ttl_and_ancestors() {
    let parent = log_entry(3);
    let child = parent.reemit(Payload::LogEntry {
        log_data: "child".to_string(),
    });
    assert_eq!(child.ttl, parent.ttl - 1);
    assert!(child.ancestors.contains("LogEntry"));
}
