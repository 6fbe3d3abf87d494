//! Configuration Module - runtime tuning parameters.
//!
//! Every cap here is advisory to a free list or registry, not a hard
//! architectural limit: raising `state_store_ceiling` does not change any
//! invariant, it only changes how much memory an operator's long-lived
//! state (e.g. a sort or dedup window backed by the ordered key index) is
//! allowed to hold before the runtime starts logging pressure.

/// Runtime-wide configuration, read once at construction.
///
/// # Examples
///
/// ```rust
/// use ws_core::RuntimeConfig;
///
/// let config = RuntimeConfig::default();
/// assert!(config.validate().is_ok());
///
/// let config = RuntimeConfig {
///     queue_capacity: 64,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Ceiling on the number of labels that may be marked searchable
    /// (each consumes one dense index id).
    ///
    /// Default: 1024
    pub label_index_ceiling: u32,

    /// Advisory ceiling on the number of entries an operator's long-lived
    /// state store (sort/dedup/eviction windows backed by the ordered key
    /// index) may hold.
    ///
    /// Default: 350,000
    pub state_store_ceiling: u64,

    /// Default capacity, in slots, of a newly constructed MWMR event queue.
    ///
    /// Default: 16
    pub queue_capacity: usize,

    /// Maximum number of attempts `push_blocking` makes before giving up
    /// and reporting back-pressure to the caller.
    ///
    /// Default: 1000
    pub queue_push_attempts: u32,

    /// Per-thread cache block size for the mutex-homed free-list backend.
    ///
    /// Default: 16
    pub freelist_block_size: usize,

    /// Capacity of the small tuple bucket.
    ///
    /// Default: 16
    pub tuple_bucket_small: usize,

    /// Capacity of the medium tuple bucket.
    ///
    /// Default: 256
    pub tuple_bucket_medium: usize,

    /// Capacity of the large tuple bucket.
    ///
    /// Default: 2048
    pub tuple_bucket_large: usize,

    /// Hard ceiling on tuple member count, regardless of bucket.
    ///
    /// Default: 4096
    pub tuple_member_hard_ceiling: usize,

    /// Maximum number of container labels a single record may carry.
    ///
    /// Default: 20
    pub container_label_cap: usize,

    /// Enable collection of runtime statistics (pool occupancy, queue wait
    /// time histograms). Disabling compiles the counters to near-zero
    /// overhead increments without the histogram bucketing.
    ///
    /// Default: true
    pub stats_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            label_index_ceiling: 1024,
            state_store_ceiling: 350_000,
            queue_capacity: 16,
            queue_push_attempts: 1000,
            freelist_block_size: 16,
            tuple_bucket_small: 16,
            tuple_bucket_medium: 256,
            tuple_bucket_large: 2048,
            tuple_member_hard_ceiling: 4096,
            container_label_cap: 20,
            stats_enabled: true,
        }
    }
}

impl RuntimeConfig {
    /// Validate that the configuration is internally consistent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ws_core::RuntimeConfig;
    ///
    /// let config = RuntimeConfig {
    ///     tuple_bucket_small: 512,
    ///     tuple_bucket_medium: 256,
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label_index_ceiling == 0 {
            return Err(ConfigError::InvalidValue(
                "label_index_ceiling must be > 0".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "queue_capacity must be > 0".to_string(),
            ));
        }

        if self.queue_push_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "queue_push_attempts must be > 0".to_string(),
            ));
        }

        if self.tuple_bucket_small >= self.tuple_bucket_medium {
            return Err(ConfigError::InvalidValue(
                "tuple_bucket_small must be < tuple_bucket_medium".to_string(),
            ));
        }

        if self.tuple_bucket_medium >= self.tuple_bucket_large {
            return Err(ConfigError::InvalidValue(
                "tuple_bucket_medium must be < tuple_bucket_large".to_string(),
            ));
        }

        if self.tuple_bucket_large > self.tuple_member_hard_ceiling {
            return Err(ConfigError::InvalidValue(
                "tuple_bucket_large must be <= tuple_member_hard_ceiling".to_string(),
            ));
        }

        if self.container_label_cap == 0 {
            return Err(ConfigError::InvalidValue(
                "container_label_cap must be > 0".to_string(),
            ));
        }

        if self.freelist_block_size == 0 {
            return Err(ConfigError::InvalidValue(
                "freelist_block_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// Recognized variables: `WS_LABEL_INDEX_CEILING`, `WS_STATE_STORE_CEILING`,
    /// `WS_QUEUE_CAPACITY`, `WS_QUEUE_PUSH_ATTEMPTS`, `WS_FREELIST_BLOCK_SIZE`,
    /// `WS_TUPLE_BUCKET_SMALL`, `WS_TUPLE_BUCKET_MEDIUM`, `WS_TUPLE_BUCKET_LARGE`,
    /// `WS_STATS_ENABLED`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse::<u32>("WS_LABEL_INDEX_CEILING") {
            config.label_index_ceiling = v;
        }
        if let Some(v) = env_parse::<u64>("WS_STATE_STORE_CEILING") {
            config.state_store_ceiling = v;
        }
        if let Some(v) = env_parse::<usize>("WS_QUEUE_CAPACITY") {
            config.queue_capacity = v;
        }
        if let Some(v) = env_parse::<u32>("WS_QUEUE_PUSH_ATTEMPTS") {
            config.queue_push_attempts = v;
        }
        if let Some(v) = env_parse::<usize>("WS_FREELIST_BLOCK_SIZE") {
            config.freelist_block_size = v;
        }
        if let Some(v) = env_parse::<usize>("WS_TUPLE_BUCKET_SMALL") {
            config.tuple_bucket_small = v;
        }
        if let Some(v) = env_parse::<usize>("WS_TUPLE_BUCKET_MEDIUM") {
            config.tuple_bucket_medium = v;
        }
        if let Some(v) = env_parse::<usize>("WS_TUPLE_BUCKET_LARGE") {
            config.tuple_bucket_large = v;
        }
        if let Ok(val) = std::env::var("WS_STATS_ENABLED") {
            config.stats_enabled = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Error type for configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid runtime config value: {0}")]
    InvalidValue(String),
}
