//! Sample run configuration.

/// Environment variable overriding [`SampleConfig::readers`].
pub const READERS_ENV: &str = "ENGINE_SAMPLE_READERS";
/// Environment variable overriding [`SampleConfig::events_per_frame`].
pub const EVENTS_ENV: &str = "ENGINE_SAMPLE_EVENTS";
/// Environment variable overriding [`SampleConfig::entities`].
pub const ENTITIES_ENV: &str = "ENGINE_SAMPLE_ENTITIES";

/// Configuration for one run of the samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleConfig {
    /// Number of systems reading the event channel.
    pub readers: usize,
    /// Events pushed per simulated frame.
    pub events_per_frame: usize,
    /// Entities in the saved scene.
    pub entities: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self::new(3, 8, 4)
    }
}

impl SampleConfig {
    /// Create a config with explicit sizes.
    #[must_use]
    pub fn new(readers: usize, events_per_frame: usize, entities: usize) -> Self {
        Self {
            readers,
            events_per_frame,
            entities,
        }
    }

    /// Override the reader count.
    #[must_use]
    pub fn with_readers(mut self, readers: usize) -> Self {
        self.readers = readers;
        self
    }

    /// Override the number of events per frame.
    #[must_use]
    pub fn with_events_per_frame(mut self, events_per_frame: usize) -> Self {
        self.events_per_frame = events_per_frame;
        self
    }

    /// Override the entity count.
    #[must_use]
    pub fn with_entities(mut self, entities: usize) -> Self {
        self.entities = entities;
        self
    }

    /// Defaults, overridden by any `ENGINE_SAMPLE_*` variables that are set.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a value is not a valid count.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let count = |name: &str| -> anyhow::Result<Option<usize>> {
            lookup(name)
                .map(|raw| {
                    raw.trim()
                        .parse::<usize>()
                        .map_err(|err| anyhow::anyhow!("invalid {name}={raw:?}: {err}"))
                })
                .transpose()
        };

        let mut config = Self::default();
        if let Some(readers) = count(READERS_ENV)? {
            config = config.with_readers(readers);
        }
        if let Some(events) = count(EVENTS_ENV)? {
            config = config.with_events_per_frame(events);
        }
        if let Some(entities) = count(ENTITIES_ENV)? {
            config = config.with_entities(entities);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_override_defaults() {
        let config = SampleConfig::default().with_readers(1).with_entities(10);
        assert_eq!(config, SampleConfig::new(1, 8, 10));
    }

    #[test]
    fn test_lookup_overrides_only_set_vars() {
        let config = SampleConfig::from_lookup(|name| (name == EVENTS_ENV).then(|| " 32 ".into()))
            .unwrap();
        assert_eq!(config, SampleConfig::default().with_events_per_frame(32));
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let err = SampleConfig::from_lookup(|name| (name == READERS_ENV).then(|| "lots".into()))
            .unwrap_err();
        assert!(err.to_string().contains(READERS_ENV));
    }
}
