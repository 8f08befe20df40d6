use thiserror::Error;

/// A bad level table, unknown metric or unreadable settings file. Sparse
/// score data is never an error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("level table is empty; it needs at least a floor band")]
    EmptyLevelTable,

    #[error("level `{name}` ({min_xp} XP) must be above `{previous}` ({previous_xp} XP)")]
    UnorderedLevelTable {
        previous: String,
        previous_xp: i64,
        name: String,
        min_xp: i64,
    },

    #[error("level override `{name}` has min {min} above max {max}")]
    InvertedOverride { name: String, min: i64, max: i64 },

    #[error("unknown metric `{0}` (expected attendance, homework, tasks, penalty or total)")]
    UnknownMetric(String),

    #[error("failed to read settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;
