//! Documents whose field types drift between instances.
//!
//! Each template carries one field whose name is shared with a sibling template
//! but whose value type is not, so a downstream index that infers a mapping
//! from the first document rejects the next one.

use crate::fields::random_text;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::{Value, json};

pub const MAPPING_TEMPLATE_COUNT: usize = 13;

/// Name of the type-drifting field in template `index`.
pub fn drift_field(index: usize) -> &'static str {
    match index {
        0..=2 => "text",
        3 | 4 => "details",
        5 | 6 => "count",
        7 | 8 => "active",
        9 | 10 => "enabled",
        _ => "created_at",
    }
}

/// Render template `index` (taken modulo the template count).
pub fn template<R: Rng + ?Sized>(index: usize, rng: &mut R, now: DateTime<Utc>) -> Value {
    let timestamp = now.timestamp_millis();
    let random_text = random_text(rng);

    match index % MAPPING_TEMPLATE_COUNT {
        0 => json!({"severity": 6, "text": random_text, "timestamp": timestamp}),
        1 => json!({
            "severity": 6,
            "text": {"numbers": 123456},
            "random_text": random_text,
            "timestamp": timestamp,
        }),
        2 => json!({"severity": 6, "text": 123456, "random_text": random_text, "timestamp": timestamp}),
        3 => json!({
            "severity": 3,
            "details": "Detailed message",
            "random_text": random_text,
            "timestamp": timestamp,
        }),
        4 => json!({
            "severity": 4,
            "details": {"info": "Detailed message"},
            "random_text": random_text,
            "timestamp": timestamp,
        }),
        5 => json!({"severity": 5, "count": "ten", "random_text": random_text, "timestamp": timestamp}),
        6 => json!({"severity": 5, "count": 10, "random_text": random_text, "timestamp": timestamp}),
        7 => json!({"severity": 2, "active": "yes", "random_text": random_text, "timestamp": timestamp}),
        8 => json!({"severity": 2, "active": true, "random_text": random_text, "timestamp": timestamp}),
        9 => json!({"severity": 1, "enabled": "true", "random_text": random_text, "timestamp": timestamp}),
        10 => json!({"severity": 1, "enabled": false, "random_text": random_text, "timestamp": timestamp}),
        11 => json!({
            "severity": 7,
            "created_at": "2024-06-24",
            "random_text": random_text,
            "timestamp": timestamp,
        }),
        _ => json!({
            "severity": 7,
            "created_at": now.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            "random_text": random_text,
            "timestamp": timestamp,
        }),
    }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Value {
    let index = rng.random_range(0..MAPPING_TEMPLATE_COUNT);
    template(index, rng, now)
}
