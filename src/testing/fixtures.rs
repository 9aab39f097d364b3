//! Pre-built entity sets for pipeline tests.

use crate::error::BoxError;
use crate::model::{Entity, Key, Property};
use chrono::{TimeZone, Utc};

/// A small heterogeneous stream: several kinds, ancestors, namespaces, every
/// value type, zero values and a property set that grows along the stream.
///
/// # Example
///
/// ```
/// use entline::testing::sample_entities;
///
/// let entities = sample_entities();
/// assert!(entities.len() >= 5);
/// ```
#[must_use]
pub fn sample_entities() -> Vec<Entity> {
    let born = Utc.with_ymd_and_hms(1815, 12, 10, 0, 0, 0).single();
    let seen = Utc.timestamp_millis_opt(1_136_214_245_012).single();
    let mut ada = Entity::new(Key::name("Person", "ada"))
        .with("Name", "Ada Lovelace")
        .with("Age", 36i64);
    if let Some(born) = born {
        ada = ada.with("Born", born);
    }
    let mut bob = Entity::new(Key::id("Person", 2).with_namespace("tenant-a"))
        .with("Name", "Bob")
        .with("Score", 12.5)
        .with("Active", true)
        .with_property(Property::unindexed("Avatar", vec![0u8, 1, 2, 254, 255]));
    if let Some(seen) = seen {
        bob = bob.with("LastSeen", seen);
    }
    vec![
        ada,
        bob,
        Entity::new(Key::name("Person", "ada").child_id("Note", 7))
            .with("Text", "first, note / with ` delimiters ^")
            .with("Pinned", false),
        Entity::new(Key::name("Person", "ada").child_name("Note", "2024"))
            .with("Text", "")
            .with("Stars", 0i64),
        Entity::new(Key::id("Person", 3))
            .with("Name", "Cleo")
            .with("Age", 0i64)
            .with("Nickname", "C"),
        Entity::new(Key::name("Städte", "Zürich").with_namespace("geo/eu"))
            .with("Population", 421_878i64)
            .with("Ratio", -0.25),
    ]
}

/// `n` entities of `kind` with ids `1..=n` and a couple of properties each.
#[must_use]
pub fn numbered_entities(kind: &str, n: u64) -> Vec<Entity> {
    (1..=n)
        .map(|i| {
            Entity::new(Key::id(kind, i))
                .with("Seq", i64::try_from(i).unwrap_or(i64::MAX))
                .with("Label", format!("{kind}-{i}"))
        })
        .collect()
}

/// Source yielding `entities` and then, at position `fail_at`, an error.
pub fn failing_source(
    entities: Vec<Entity>,
    fail_at: usize,
) -> impl Iterator<Item = Result<Entity, BoxError>> {
    entities
        .into_iter()
        .map(Ok)
        .take(fail_at)
        .chain(std::iter::once(Err("source cursor failed".into())))
}
