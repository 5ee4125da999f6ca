//! Consolidation-cycle properties: decay, transfer, layers, pin immunity.

mod helpers;

use helpers::{add_days_ago, text_engine};
use mnemo::{MemoryLayer, MnemoConfig, RecallOptions};

#[test]
fn consolidation_transfers_working_into_core() {
    let mut engine = text_engine();
    let id = add_days_ago(&mut engine, "learned something today", "factual", 0.5, 0.1);

    let before = engine.peek(&id).unwrap().unwrap();
    assert_eq!(before.core_strength, 0.0);

    let report = engine.consolidate(1.0).unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);

    let after = engine.peek(&id).unwrap().unwrap();
    assert!(after.core_strength > 0.0);
    assert!(after.working_strength < before.working_strength);
    assert_eq!(after.consolidation_count, 1);
}

#[test]
fn repeated_cycles_promote_important_memories_to_core() {
    let mut engine = text_engine();
    let id = add_days_ago(
        &mut engine,
        "the user has a severe peanut allergy",
        "factual",
        0.95,
        0.1,
    );

    // Keep the memory alive with retrievals between sleep cycles
    for _ in 0..20 {
        engine.recall("peanut allergy", &RecallOptions::default()).unwrap();
        engine.consolidate(1.0).unwrap();
    }

    let entry = engine.peek(&id).unwrap().unwrap();
    assert_eq!(entry.layer, MemoryLayer::Core);
    assert!(entry.core_strength > 0.0);
}

#[test]
fn stale_weak_memories_demote_to_archive() {
    let mut engine = text_engine();
    // Created and last accessed long ago: retrievability is near zero
    let id = add_days_ago(&mut engine, "a fleeting detail", "episodic", 0.1, 200.0);

    let report = engine.consolidate(1.0).unwrap();
    assert_eq!(report.demoted, 1);
    assert_eq!(engine.peek(&id).unwrap().unwrap().layer, MemoryLayer::Archive);
}

#[test]
fn consolidate_zero_is_a_noop_up_to_bookkeeping() {
    let mut engine = text_engine();
    let id = add_days_ago(&mut engine, "hold steady", "factual", 0.5, 1.0);

    let before = engine.peek(&id).unwrap().unwrap();
    engine.consolidate(0.0).unwrap();
    let after = engine.peek(&id).unwrap().unwrap();

    assert_eq!(before.working_strength, after.working_strength);
    assert_eq!(before.core_strength, after.core_strength);
    assert_eq!(before.layer, after.layer);
    assert_eq!(before.importance, after.importance);
    assert_eq!(after.consolidation_count, 1);
}

#[test]
fn pinned_entries_are_immune_to_consolidation_and_pruning() {
    let mut engine = text_engine();
    let id = add_days_ago(&mut engine, "never forget this", "emotional", 0.9, 50.0);
    engine.pin(&id).unwrap();

    let before = engine.peek(&id).unwrap().unwrap();
    engine.consolidate(30.0).unwrap();
    let after = engine.peek(&id).unwrap().unwrap();

    assert_eq!(before.working_strength, after.working_strength);
    assert_eq!(before.core_strength, after.core_strength);
    assert_eq!(before.layer, after.layer);

    // Survives even an infinite prune threshold
    let removed = engine.forget(None, Some(f64::INFINITY)).unwrap();
    assert_eq!(removed, 0);
    assert!(engine.peek(&id).unwrap().is_some());
}

#[test]
fn downscale_keeps_strengths_bounded_over_many_cycles() {
    let mut engine = text_engine();
    let id = add_days_ago(&mut engine, "frequently recalled fact", "factual", 0.8, 0.1);

    for _ in 0..100 {
        engine.recall("frequently recalled", &RecallOptions::default()).unwrap();
        engine.consolidate(1.0).unwrap();
    }

    let entry = engine.peek(&id).unwrap().unwrap();
    let total = entry.working_strength + entry.core_strength;
    assert!(total.is_finite());
    assert!(total < 50.0, "homeostasis failed: total strength {total}");
}

#[test]
fn no_entry_both_promotes_and_demotes_in_one_cycle() {
    let mut config = MnemoConfig::default();
    config.dynamics.replay_ratio = 0.0;
    let mut engine = helpers::text_engine_with(config);

    add_days_ago(&mut engine, "strong and fresh", "factual", 0.9, 0.1);
    add_days_ago(&mut engine, "weak and stale", "episodic", 0.1, 300.0);

    let report = engine.consolidate(1.0).unwrap();
    assert!(report.promoted + report.demoted <= report.processed);
    // Only the stale entry transitions, and only one step
    assert_eq!(report.demoted, 1);
}

#[test]
fn consolidation_report_counts_replays() {
    let mut config = MnemoConfig::default();
    config.dynamics.replay_ratio = 1.0;
    let mut engine = helpers::text_engine_with(config);

    for i in 0..5 {
        add_days_ago(&mut engine, &format!("event {i}"), "episodic", 0.3, 0.2);
    }

    let report = engine.consolidate(1.0).unwrap();
    assert_eq!(report.replayed, 5);
}

#[test]
fn archive_returns_to_working_only_through_retrieval() {
    let mut engine = text_engine();
    let id = add_days_ago(&mut engine, "dormant but findable fact", "factual", 0.5, 200.0);

    engine.consolidate(1.0).unwrap();
    assert_eq!(engine.peek(&id).unwrap().unwrap().layer, MemoryLayer::Archive);

    // Consolidation alone never revives it
    engine.consolidate(1.0).unwrap();
    assert_eq!(engine.peek(&id).unwrap().unwrap().layer, MemoryLayer::Archive);

    // Repeated retrieval raises the working trace past the promote threshold
    for _ in 0..20 {
        let results = engine
            .recall("dormant findable fact", &RecallOptions::default())
            .unwrap();
        assert!(results.iter().any(|r| r.id == id), "archive must stay searchable");
        if engine.peek(&id).unwrap().unwrap().layer == MemoryLayer::Working {
            break;
        }
    }
    assert_eq!(engine.peek(&id).unwrap().unwrap().layer, MemoryLayer::Working);
}

#[test]
fn per_entry_failures_do_not_abort_the_cycle() {
    // A healthy store reports zero failures; the report plumbing is what we
    // can observe from outside.
    let mut engine = text_engine();
    for i in 0..10 {
        add_days_ago(&mut engine, &format!("entry {i}"), "factual", 0.5, 1.0);
    }
    let report = engine.consolidate(1.0).unwrap();
    assert_eq!(report.processed, 10);
    assert_eq!(report.failed, 0);
}

#[test]
fn working_trace_always_fades_across_cycles() {
    let mut config = MnemoConfig::default();
    config.dynamics.replay_ratio = 0.0;
    let mut engine = helpers::text_engine_with(config);
    let id = add_days_ago(&mut engine, "left alone", "factual", 0.5, 0.0);

    let mut previous = engine.peek(&id).unwrap().unwrap().working_strength;
    for _ in 0..10 {
        engine.consolidate(3.0).unwrap();
        let current = engine.peek(&id).unwrap().unwrap().working_strength;
        assert!(current < previous, "working strength must fade without replay");
        previous = current;
    }
}
