//! Write/read round trips and access-log invariants.

mod helpers;

use helpers::{add_days_ago, text_engine};
use mnemo::{AddOptions, MemoryKind, MemoryLayer};

#[test]
fn add_then_get_round_trips_content() {
    let mut engine = text_engine();
    let id = engine
        .add(
            "SaltyHall uses Supabase for its backend",
            "factual",
            &AddOptions::default(),
        )
        .unwrap();

    let entry = engine.get(&id).unwrap().unwrap();
    assert_eq!(entry.content, "SaltyHall uses Supabase for its backend");
    assert_eq!(entry.kind, MemoryKind::Factual);
    assert_eq!(entry.layer, MemoryLayer::Working);
    // creation + this get
    assert!(entry.access_times.len() >= 2);
}

#[test]
fn access_times_are_monotone_and_start_at_creation() {
    let mut engine = text_engine();
    let id = engine
        .add("monotone history", "factual", &AddOptions::default())
        .unwrap();

    for _ in 0..5 {
        engine.get(&id).unwrap();
    }

    let entry = engine.peek(&id).unwrap().unwrap();
    assert_eq!(entry.access_times.len(), 6);
    assert!(entry.created_at <= entry.access_times[0]);
    for pair in entry.access_times.windows(2) {
        assert!(pair[0] <= pair[1], "access log must be non-decreasing");
    }
}

#[test]
fn new_memories_start_with_fresh_working_trace() {
    let mut engine = text_engine();
    let id = engine
        .add("fresh trace", "episodic", &AddOptions::default())
        .unwrap();

    let entry = engine.peek(&id).unwrap().unwrap();
    assert_eq!(entry.working_strength, 1.0);
    assert_eq!(entry.core_strength, 0.0);
    assert_eq!(entry.consolidation_count, 0);
    assert!(!entry.pinned);
    assert!(entry.contradicts.is_none());
    assert!(entry.contradicted_by.is_none());
}

#[test]
fn default_importance_comes_from_kind() {
    let mut engine = text_engine();
    let emotional = engine
        .add("they said something kind", "emotional", &AddOptions::default())
        .unwrap();
    let episodic = engine
        .add("saw a cat meme", "episodic", &AddOptions::default())
        .unwrap();

    let e1 = engine.peek(&emotional).unwrap().unwrap();
    let e2 = engine.peek(&episodic).unwrap().unwrap();
    assert!(e1.importance > e2.importance);
}

#[test]
fn entities_are_recorded_as_graph_links() {
    let mut engine = text_engine();
    let options = AddOptions {
        entities: vec![
            ("potato".to_string(), "prefers".to_string()),
            ("moltbook".to_string(), String::new()),
        ],
        ..Default::default()
    };
    let id = engine
        .add("potato prefers the moltbook workflow", "relational", &options)
        .unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.store.graph_entities, 2);

    // Entities make the memory reachable from related queries via expansion
    let other = AddOptions {
        entities: vec![("potato".to_string(), String::new())],
        ..Default::default()
    };
    engine
        .add("potato joined the standup", "episodic", &other)
        .unwrap();
    let results = engine
        .recall("standup", &mnemo::RecallOptions::default())
        .unwrap();
    assert!(results.iter().any(|r| r.id == id));
}

#[test]
fn backdated_memories_keep_their_creation_access() {
    let mut engine = text_engine();
    let id = add_days_ago(&mut engine, "an old event", "episodic", 0.3, 10.0);

    let entry = engine.peek(&id).unwrap().unwrap();
    assert_eq!(entry.access_times.len(), 1);
    assert_eq!(entry.access_times[0], entry.created_at);
    assert!(entry.age_days(helpers::now()) > 9.0);
}

#[test]
fn ids_are_unique() {
    let mut engine = text_engine();
    let mut ids = Vec::new();
    for i in 0..20 {
        ids.push(
            engine
                .add(&format!("memory number {i}"), "factual", &AddOptions::default())
                .unwrap(),
        );
    }
    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), 20);
}
