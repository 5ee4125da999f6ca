//! Contradiction chains: inverse links, acyclicity, retrieval suppression.

mod helpers;

use helpers::{add_days_ago, text_engine, DAY};
use mnemo::{AddOptions, RecallOptions};

#[test]
fn contradiction_sets_exact_inverse_links() {
    let mut engine = text_engine();
    let old = engine
        .add("the service runs on port 8080", "factual", &AddOptions::default())
        .unwrap();
    let new = engine
        .update_memory(&old, "the service moved to port 9090")
        .unwrap();

    let old_entry = engine.peek(&old).unwrap().unwrap();
    let new_entry = engine.peek(&new).unwrap().unwrap();
    assert_eq!(old_entry.contradicted_by.as_deref(), Some(new.as_str()));
    assert_eq!(new_entry.contradicts.as_deref(), Some(old.as_str()));
    assert!(old_entry.contradicts.is_none());
    assert!(new_entry.contradicted_by.is_none());
}

#[test]
fn correction_chains_stay_acyclic() {
    let mut engine = text_engine();
    let a = engine
        .add("version one of the fact", "factual", &AddOptions::default())
        .unwrap();
    let b = engine.update_memory(&a, "version two of the fact").unwrap();
    let c = engine.update_memory(&b, "version three of the fact").unwrap();

    // Walk the chain head-to-root; it must terminate
    let mut seen = vec![c.clone()];
    let mut cursor = c.clone();
    while let Some(prev) = engine.peek(&cursor).unwrap().unwrap().contradicts {
        assert!(!seen.contains(&prev), "cycle in correction chain");
        seen.push(prev.clone());
        cursor = prev;
    }
    assert_eq!(seen, vec![c, b, a]);
}

#[test]
fn contradicting_a_superseded_memory_is_rejected() {
    let mut engine = text_engine();
    let a = engine
        .add("original claim", "opinion", &AddOptions::default())
        .unwrap();
    let _b = engine.update_memory(&a, "revised claim").unwrap();

    // The chain head is b now; a second correction of a must fail loudly
    let err = engine.update_memory(&a, "competing revision");
    assert!(err.is_err());
    assert!(err.unwrap_err().to_string().contains("already contradicted"));
}

#[test]
fn contradicted_memory_is_suppressed_but_auditable() {
    let mut engine = text_engine();
    // t=1d: I live in SF; t=15d: moved to Seattle; query at t=20d
    let sf = add_days_ago(&mut engine, "I live in San Francisco", "factual", 0.5, 19.0);
    let seattle_options = AddOptions {
        contradicts: Some(sf.clone()),
        created_at: Some(helpers::now() - 5.0 * DAY),
        ..Default::default()
    };
    let seattle = engine
        .add("I live in Seattle", "factual", &seattle_options)
        .unwrap();

    let results = engine.recall("where do I live", &RecallOptions::default()).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, seattle);
    assert!(!results[0].contradicted);
    assert_eq!(results[1].id, sf);
    assert!(results[1].contradicted);
    assert!(results[1].confidence < results[0].confidence);
    assert!(results[1].activation < results[0].activation);
}

#[test]
fn stored_strengths_survive_contradiction() {
    let mut engine = text_engine();
    let old = engine
        .add("outdated deployment doc", "procedural", &AddOptions::default())
        .unwrap();
    let before = engine.peek(&old).unwrap().unwrap();

    engine.update_memory(&old, "current deployment doc").unwrap();

    // Suppression happens at scoring time; the stored traces are untouched
    let after = engine.peek(&old).unwrap().unwrap();
    assert_eq!(before.working_strength, after.working_strength);
    assert_eq!(before.core_strength, after.core_strength);
    assert_eq!(before.importance, after.importance);
}
