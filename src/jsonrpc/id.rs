//! Request identifier strategies.
//!
//! A generator only has to keep ids unique among the requests that are still
//! outstanding on the requester that owns it.

use chrono::Utc;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Builder;

use super::types::Id;

/// Produces identifiers for outgoing requests
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> Id;
}

/// Any `FnMut() -> Id` closure can act as a caller-supplied generator
impl<F> IdGenerator for F
where
    F: FnMut() -> Id + Send,
{
    fn next_id(&mut self) -> Id {
        self()
    }
}

/// Incrementing integers starting at 0
#[derive(Debug, Default, Clone)]
pub struct CounterIdGenerator {
    next: i64,
}

impl CounterIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for CounterIdGenerator {
    fn next_id(&mut self) -> Id {
        let id = self.next;
        self.next += 1;
        Id::from(id)
    }
}

/// Random version-4 UUID strings
#[derive(Debug, Default, Clone)]
pub struct UuidV4IdGenerator;

impl UuidV4IdGenerator {
    pub fn new() -> Self {
        Self
    }

    fn random_bytes() -> [u8; 16] {
        let mut bytes = [0u8; 16];
        if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
            log::warn!("OS randomness unavailable, falling back to seeded PRNG: {}", e);
            let seed = Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_else(|| Utc::now().timestamp_millis()) as u64;
            StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
        }
        bytes
    }
}

impl IdGenerator for UuidV4IdGenerator {
    fn next_id(&mut self) -> Id {
        let uuid = Builder::from_random_bytes(Self::random_bytes()).into_uuid();
        Id::String(uuid.hyphenated().to_string())
    }
}

/// Milliseconds since the Unix epoch
#[derive(Debug, Default, Clone)]
pub struct TimestampIdGenerator;

impl IdGenerator for TimestampIdGenerator {
    fn next_id(&mut self) -> Id {
        Id::from(Utc::now().timestamp_millis())
    }
}

/// `"<millis>-<0..999999>"`
#[derive(Debug, Default, Clone)]
pub struct TimestampWithRandomIdGenerator;

impl IdGenerator for TimestampWithRandomIdGenerator {
    fn next_id(&mut self) -> Id {
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Id::String(format!("{}-{}", Utc::now().timestamp_millis(), suffix))
    }
}

/// Built-in strategies, nameable from configuration files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdStrategy {
    Counter,
    #[default]
    UuidV4,
    Timestamp,
    TimestampWithRandom,
}

impl IdStrategy {
    pub fn build(self) -> Box<dyn IdGenerator> {
        match self {
            IdStrategy::Counter => Box::new(CounterIdGenerator::new()),
            IdStrategy::UuidV4 => Box::new(UuidV4IdGenerator::new()),
            IdStrategy::Timestamp => Box::new(TimestampIdGenerator),
            IdStrategy::TimestampWithRandom => Box::new(TimestampWithRandomIdGenerator),
        }
    }
}

/// Generator supplied either ready-made or as a zero-argument constructor
pub enum IdGeneratorOption {
    Instance(Box<dyn IdGenerator>),
    Constructor(Box<dyn FnOnce() -> Box<dyn IdGenerator> + Send>),
}

impl IdGeneratorOption {
    pub fn instance<G: IdGenerator + 'static>(generator: G) -> Self {
        IdGeneratorOption::Instance(Box::new(generator))
    }

    pub fn constructor<G, F>(constructor: F) -> Self
    where
        G: IdGenerator + 'static,
        F: FnOnce() -> G + Send + 'static,
    {
        IdGeneratorOption::Constructor(Box::new(move || Box::new(constructor())))
    }

    /// Resolve to the generator instance that will actually be used
    pub fn into_generator(self) -> Box<dyn IdGenerator> {
        match self {
            IdGeneratorOption::Instance(generator) => generator,
            IdGeneratorOption::Constructor(constructor) => constructor(),
        }
    }
}

impl Default for IdGeneratorOption {
    fn default() -> Self {
        IdStrategy::default().into()
    }
}

impl From<IdStrategy> for IdGeneratorOption {
    fn from(strategy: IdStrategy) -> Self {
        IdGeneratorOption::Instance(strategy.build())
    }
}

impl std::fmt::Debug for IdGeneratorOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdGeneratorOption::Instance(_) => f.write_str("IdGeneratorOption::Instance(..)"),
            IdGeneratorOption::Constructor(_) => f.write_str("IdGeneratorOption::Constructor(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_counter_starts_at_zero_and_increments() {
        let mut generator = CounterIdGenerator::new();
        let ids: Vec<Id> = (0..4).map(|_| generator.next_id()).collect();
        assert_eq!(
            ids,
            vec![Id::from(0), Id::from(1), Id::from(2), Id::from(3)]
        );
    }

    #[test]
    fn test_uuid_shape() {
        let mut generator = UuidV4IdGenerator::new();
        let mut seen = HashSet::new();

        for _ in 0..64 {
            let Id::String(text) = generator.next_id() else {
                panic!("uuid generator must produce strings");
            };
            assert_eq!(text.len(), 36);

            let groups: Vec<&str> = text.split('-').collect();
            let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
            assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
            assert!(text
                .chars()
                .all(|c| c == '-' || c.is_ascii_digit() || ('a'..='f').contains(&c)));
            assert_eq!(&groups[2][..1], "4");
            assert!(matches!(&groups[3][..1], "8" | "9" | "a" | "b"));

            assert!(seen.insert(text));
        }
    }

    #[test]
    fn test_timestamp_is_current_millis() {
        let before = Utc::now().timestamp_millis();
        let id = TimestampIdGenerator.next_id();
        let after = Utc::now().timestamp_millis();

        match id {
            Id::Number(ms) => {
                let ms = ms.as_i64().unwrap();
                assert!(before <= ms && ms <= after);
            }
            other => panic!("unexpected id {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_with_random_format() {
        let Id::String(text) = TimestampWithRandomIdGenerator.next_id() else {
            panic!("expected a string id");
        };
        let (millis, suffix) = text.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert!(suffix.parse::<u32>().unwrap() < 1_000_000);
    }

    #[test]
    fn test_closure_generator() {
        let mut n = 100;
        let mut generator = move || {
            n += 10;
            Id::from(n)
        };
        assert_eq!(IdGenerator::next_id(&mut generator), Id::from(110));
        assert_eq!(IdGenerator::next_id(&mut generator), Id::from(120));
    }

    #[test]
    fn test_option_constructor_is_normalized_once() {
        let option = IdGeneratorOption::constructor(CounterIdGenerator::new);
        let mut generator = option.into_generator();
        assert_eq!(generator.next_id(), Id::from(0));
        assert_eq!(generator.next_id(), Id::from(1));
    }

    #[test]
    fn test_strategy_names() {
        let strategy: IdStrategy = serde_json::from_str(r#""timestamp-with-random""#).unwrap();
        assert_eq!(strategy, IdStrategy::TimestampWithRandom);
        assert_eq!(
            serde_json::to_string(&IdStrategy::UuidV4).unwrap(),
            r#""uuid-v4""#
        );
        assert_eq!(IdStrategy::Counter.build().next_id(), Id::from(0));
    }
}
