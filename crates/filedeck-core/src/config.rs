//! Engine configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default size of the buffer used to stream file contents.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Configuration for the operation engine and its executor.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Size of the buffer used when streaming file contents.
    #[builder(default = "DEFAULT_BUFFER_SIZE")]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Number of operations that may wait in the executor queue.
    #[builder(default = "16")]
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Capacity of each operation's event channel.
    #[builder(default = "100")]
    #[serde(default = "default_event_channel_size")]
    pub event_channel_size: usize,

    /// Deflate file entries when compressing (stored otherwise).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub deflate: bool,

    /// Suffix appended to an archive's base name to form its extraction directory.
    #[builder(default = "default_extract_suffix()")]
    #[serde(default = "default_extract_suffix")]
    pub extract_suffix: String,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_queue_capacity() -> usize {
    16
}

fn default_event_channel_size() -> usize {
    100
}

fn default_extract_suffix() -> String {
    "_extracted".to_string()
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.buffer_size == Some(0) {
            return Err("Buffer size must be greater than zero".to_string());
        }
        if self.queue_capacity == Some(0) {
            return Err("Queue capacity must be greater than zero".to_string());
        }
        if self.event_channel_size == Some(0) {
            return Err("Event channel size must be greater than zero".to_string());
        }
        if let Some(ref suffix) = self.extract_suffix {
            if suffix.is_empty() || suffix.contains(['/', '\\']) {
                return Err("Extract suffix must be a non-empty plain name".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            queue_capacity: default_queue_capacity(),
            event_channel_size: default_event_channel_size(),
            deflate: true,
            extract_suffix: default_extract_suffix(),
        }
    }
}
