//! Integration Tests for the Reactive Runtime
//!
//! These tests verify that state, computeds, effects and the scheduler work
//! together correctly through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cascade_core::binding::{self, HostElement};
use cascade_core::diagnostics::{self, LogLevel};
use cascade_core::scheduler::{LocalTaskTick, ManualTick};
use cascade_core::{Cleanup, ReactiveError, Runtime, RuntimeConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Writing a value equal to the current one notifies nobody.
#[test]
fn unchanged_value_does_not_notify() {
    let runtime = Runtime::new();
    let state = runtime.state(10);
    let runs = Rc::new(Cell::new(0));

    let (s, r) = (state.clone(), runs.clone());
    runtime.effect(move |_| {
        s.get();
        r.set(r.get() + 1);
    });

    state.set(10);
    state.set(10);
    assert_eq!(runs.get(), 1);

    state.set(11);
    assert_eq!(runs.get(), 2);
}

/// After switching branches, an effect reacts only to the cell it now reads.
#[test]
fn dependencies_are_rediscovered_each_run() {
    let runtime = Runtime::new();
    let use_a = runtime.state(true);
    let a = runtime.state(0);
    let b = runtime.state(0);
    let runs = Rc::new(Cell::new(0));

    let (flag, ra, rb, r) = (use_a.clone(), a.clone(), b.clone(), runs.clone());
    let effect = runtime.effect(move |_| {
        if flag.get() {
            ra.get();
        } else {
            rb.get();
        }
        r.set(r.get() + 1);
    });

    b.set(1);
    assert_eq!(runs.get(), 1);

    use_a.set(false);
    assert_eq!(runs.get(), 2);
    assert_eq!(effect.dependency_count(), 2);

    // The old branch no longer triggers re-runs.
    a.set(5);
    assert_eq!(runs.get(), 2);

    b.set(2);
    assert_eq!(runs.get(), 3);
}

/// Many enqueues on one (target, key) apply once, and the last one wins.
#[test]
fn batching_keeps_last_write_per_key() {
    let tick = ManualTick::new();
    let runtime = Runtime::with_tick(RuntimeConfig::default(), tick.clone());
    let applied = Rc::new(RefCell::new(Vec::new()));

    for value in 0..10 {
        let applied = applied.clone();
        runtime.enqueue("x", "value", move || applied.borrow_mut().push(value));
    }

    assert_eq!(tick.requests(), 1);
    let report = runtime.flush().unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(*applied.borrow(), vec![9]);
}

/// A re-run never starts while the previous run's cleanup is outstanding.
#[test]
fn cleanup_runs_before_reuse() {
    let runtime = Runtime::new();
    let state = runtime.state(1);
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let (s, l) = (state.clone(), log.clone());
    runtime.effect(move |queue| {
        let n = s.get();
        l.borrow_mut().push(format!("run {n}"));
        let (apply_log, cleanup_log) = (l.clone(), l.clone());
        queue.enqueue("x", "value", move || {
            apply_log.borrow_mut().push(format!("apply {n}"));
        });
        Cleanup::new(move || cleanup_log.borrow_mut().push(format!("cleanup {n}")))
    });

    // Same tick: the pending cleanup is run ahead of the re-run.
    state.set(2);
    runtime.flush().unwrap();

    // Next tick: cleanup 2 already ran at the flush above.
    state.set(3);
    runtime.flush().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "run 1", "cleanup 1", "run 2", "apply 2", "cleanup 2", "run 3", "apply 3", "cleanup 3",
        ]
    );
}

/// A failing effect does not stop an independent sibling, now or later.
#[test]
fn failing_effect_is_isolated() {
    init_tracing();
    let runtime = Runtime::new();
    let state = runtime.state(0);
    let applied = Rc::new(Cell::new(0));

    let s = state.clone();
    runtime.effect(move |queue| {
        let value = s.get();
        queue.enqueue("broken", "value", || ());
        if value > 0 {
            panic!("effect failed on {value}");
        }
    });

    let (s, a) = (state.clone(), applied.clone());
    runtime.effect(move |queue| {
        let value = s.get();
        let a = a.clone();
        queue.enqueue("sibling", "value", move || a.set(value));
    });

    state.set(1);
    runtime.flush().unwrap();
    assert_eq!(applied.get(), 1);

    state.set(2);
    runtime.flush().unwrap();
    assert_eq!(applied.get(), 2);
}

/// Memoized computeds cache; non-memoized ones recompute on every read.
#[test]
fn memo_and_plain_computed_call_counts() {
    let runtime = Runtime::new();
    let input = runtime.state(3);
    let memo_calls = Rc::new(Cell::new(0));
    let plain_calls = Rc::new(Cell::new(0));

    let (i, c) = (input.clone(), memo_calls.clone());
    let memo = runtime.memo(move || {
        c.set(c.get() + 1);
        i.get() * 2
    });
    let (i, c) = (input.clone(), plain_calls.clone());
    let plain = runtime.computed(
        move || {
            c.set(c.get() + 1);
            i.get() * 2
        },
        false,
    );

    for _ in 0..3 {
        assert_eq!(memo.get(), 6);
        assert_eq!(plain.get(), 6);
    }
    assert_eq!(memo_calls.get(), 1);
    assert_eq!(plain_calls.get(), 3);

    input.set(4);
    assert_eq!(memo.get(), 8);
    assert_eq!(memo_calls.get(), 2);
}

/// End to end: a write flows through an effect into one flushed instruction,
/// and an unchanged write schedules nothing.
#[test]
fn end_to_end_flush() {
    let tick = ManualTick::new();
    let runtime = Runtime::with_tick(RuntimeConfig::default(), tick.clone());
    let state = runtime.state(1);
    let x = Rc::new(Cell::new(0));

    let (s, out) = (state.clone(), x.clone());
    runtime.effect(move |queue| {
        let value = s.get() * 2;
        let out = out.clone();
        queue.enqueue("x", "value", move || out.set(value));
    });

    state.set(2);
    runtime.flush().unwrap();
    assert_eq!(x.get(), 4);
    assert_eq!(runtime.flush_count(), 1);

    state.set(2);
    assert!(!runtime.has_pending_flush());
    runtime.flush().unwrap();
    assert_eq!(runtime.flush_count(), 1);
    assert_eq!(tick.requests(), 1);
}

/// A disposed effect no longer re-runs and leaves no edges behind.
#[test]
fn disposed_effect_stops_reacting() {
    let runtime = Runtime::new();
    let state = runtime.state(0);
    let runs = Rc::new(Cell::new(0));

    let (s, r) = (state.clone(), runs.clone());
    let effect = runtime.effect(move |_| {
        s.get();
        r.set(r.get() + 1);
    });
    effect.dispose();

    state.set(1);
    assert_eq!(runs.get(), 1);
    assert_eq!(state.dependent_count(), 0);
    assert!(matches!(effect.rerun(), Err(ReactiveError::Disposed(_))));
}

/// Two effects that feed each other settle instead of looping forever.
#[test]
fn mutual_cycle_is_bounded() {
    init_tracing();
    let config = RuntimeConfig::from_json(r#"{ "max_notify_depth": 8 }"#).unwrap();
    let runtime = Runtime::with_config(config);
    let ping = runtime.state(0);
    let pong = runtime.state(0);

    let (a, b) = (ping.clone(), pong.clone());
    runtime.effect(move |_| b.set(a.get() + 1));
    let (a, b) = (ping.clone(), pong.clone());
    runtime.effect(move |_| a.set(b.get() + 1));

    ping.set(100);
    assert!(ping.get_untracked() > 100);
    assert!(!runtime.is_tracking());
}

/// A long acyclic chain of copying effects carries a write all the way down.
#[test]
fn long_effect_chain_propagates() {
    let runtime = Runtime::new();
    let cells: Vec<_> = (0..120).map(|_| runtime.state(0)).collect();

    for pair in cells.windows(2) {
        let (from, to) = (pair[0].clone(), pair[1].clone());
        runtime.effect(move |_| to.set(from.get()));
    }

    cells[0].set(7);
    assert_eq!(cells[119].get_untracked(), 7);
}

/// A memo chain deeper than a hundred links still reaches its effect.
#[test]
fn deep_memo_chain_propagates() {
    let runtime = Runtime::new();
    let source = runtime.state(0);

    let s = source.clone();
    let mut tail = runtime.memo(move || s.get());
    for _ in 0..150 {
        let prev = tail.clone();
        tail = runtime.memo(move || prev.get() + 1);
    }

    let seen = Rc::new(Cell::new(0));
    let (t, out) = (tail.clone(), seen.clone());
    runtime.effect(move |_| out.set(t.get()));

    source.set(1);
    assert_eq!(seen.get(), 151);
}

/// A failing instruction is reported and the rest of the batch applies.
#[test]
fn flush_isolates_failing_instructions() {
    init_tracing();
    let runtime = Runtime::new();
    let applied = Rc::new(Cell::new(false));

    runtime.enqueue("a", "value", || Err::<(), _>("host rejected value"));
    runtime.enqueue::<_, ()>("b", "value", || panic!("host crashed"));
    let a = applied.clone();
    runtime.enqueue("c", "value", move || a.set(true));

    let report = runtime.flush().unwrap();
    assert!(applied.get());
    assert_eq!(report.applied, 1);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(
        report.failures[0].to_string(),
        "instruction value on a failed: host rejected value"
    );
}

/// Flushing from inside a flush is refused; the outer flush completes.
#[test]
fn nested_flush_is_refused() {
    let runtime = Runtime::new();
    let nested = Rc::new(RefCell::new(None));

    let (rt, n) = (runtime.clone(), nested.clone());
    runtime.enqueue("x", "value", move || {
        *n.borrow_mut() = Some(rt.flush());
    });

    let report = runtime.flush().unwrap();
    assert!(report.is_clean());
    assert!(matches!(
        nested.borrow_mut().take(),
        Some(Err(ReactiveError::FlushInProgress))
    ));
}

/// With the tokio tick, enqueues made in one synchronous stretch are applied
/// by a single flush on a later turn of the local set.
#[tokio::test]
async fn local_task_tick_flushes_once() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let runtime = Runtime::with_tick(RuntimeConfig::default(), LocalTaskTick);
            let state = runtime.state(1);
            let x = Rc::new(Cell::new(0));

            let (s, out) = (state.clone(), x.clone());
            runtime.effect(move |queue| {
                let value = s.get();
                let out = out.clone();
                queue.enqueue("x", "value", move || out.set(value));
            });
            state.set(2);
            state.set(3);
            assert_eq!(x.get(), 0);

            for _ in 0..16 {
                if runtime.flush_count() > 0 {
                    break;
                }
                tokio::task::yield_now().await;
            }

            assert_eq!(runtime.flush_count(), 1);
            assert_eq!(x.get(), 3);
            assert!(!runtime.has_pending_flush());
        })
        .await;
}

/// Attribute-seeded state drives bound element properties.
#[test]
fn bindings_drive_host_element() {
    let runtime = Runtime::new();
    let element = HostElement::new("progress");
    element.set_attribute("value", "not a number");

    let value = binding::attribute_state(&runtime, &element, "value", |raw| {
        binding::as_integer(raw, 0)
    });
    let v = value.clone();
    let label = runtime.memo(move || format!("{}%", v.get()));
    let v = value.clone();
    let complete = runtime.memo(move || v.get() >= 100);

    binding::set_text(&runtime, &element, label);
    binding::toggle_class(&runtime, &element, "complete", complete);
    runtime.flush().unwrap();
    assert_eq!(element.text().as_deref(), Some("0%"));
    assert!(!element.has_class("complete"));

    value.set(40);
    value.set(100);
    runtime.flush().unwrap();
    assert_eq!(element.text().as_deref(), Some("100%"));
    assert!(element.has_class("complete"));
}

/// The diagnostics sink hands its value back.
#[test]
fn diagnostics_log_passes_value_through() {
    init_tracing();
    let runtime = Runtime::new();
    let state = runtime.state(diagnostics::log(7, "initial", LogLevel::Info));
    assert_eq!(state.get(), 7);
}
