#![allow(dead_code)]

use mnemo::{AddOptions, Engine, MnemoConfig};

pub const DAY: f64 = 86_400.0;

/// Current wall-clock time as fractional epoch seconds.
pub fn now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs_f64()
}

/// Fresh in-memory engine with vector features disabled (text-only
/// retrieval, no network probes).
pub fn text_engine() -> Engine {
    let mut config = MnemoConfig::default();
    config.embedding.provider = "none".into();
    Engine::open_in_memory(config).unwrap()
}

/// Same, but with a caller-tweaked config (provider is still forced off).
pub fn text_engine_with(mut config: MnemoConfig) -> Engine {
    config.embedding.provider = "none".into();
    Engine::open_in_memory(config).unwrap()
}

/// Add a memory whose creation is backdated by `days_ago` days, simulating
/// a past event.
pub fn add_days_ago(
    engine: &mut Engine,
    content: &str,
    kind: &str,
    importance: f64,
    days_ago: f64,
) -> String {
    let options = AddOptions {
        importance: Some(importance),
        created_at: Some(now() - days_ago * DAY),
        ..Default::default()
    };
    engine.add(content, kind, &options).unwrap()
}
