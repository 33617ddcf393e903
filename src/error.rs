//! Error types for configuration and rendering

/// Rejected before any render work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Image dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Samples per pixel must be at least 1")]
    InvalidSampling,

    #[error("Thread count must be between 1 and the image height ({height}), got {threads}")]
    InvalidThreads { threads: usize, height: usize },

    #[error("Scene grid is empty")]
    EmptyScene,

    #[error("Scene grid is ragged: line {line} has {len} characters, expected {expected}")]
    RaggedScene {
        line: usize,
        len: usize,
        expected: usize,
    },

    #[error("Sphere reflectivity must be in [0, 1], got {0}")]
    InvalidReflectivity(f64),

    #[error("Brightness must be positive, got {0}")]
    InvalidBrightness(f64),

    #[error("Camera direction is degenerate (zero or exactly vertical)")]
    DegenerateCamera,
}

/// A render either completes fully or fails as a whole; callers never see a
/// partially filled buffer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid render configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build worker pool: {0}")]
    Pool(String),

    #[error("Render worker failed: {0}")]
    Worker(String),

    #[error("Render was cancelled")]
    Cancelled,
}
