use thiserror::Error;

/// Errors raised while assembling or solving a mirror response.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MirrorError {
    #[error("index ({i}, {j}) outside raster of {width}x{height}")]
    OutOfBounds {
        i: usize,
        j: usize,
        width: usize,
        height: usize,
    },

    #[error("raster of {width}x{height} is below the 3x3 minimum")]
    TooSmall { width: usize, height: usize },

    #[error("buffer holds {found} values, a {width}x{height} raster needs {expected}")]
    BufferLength {
        width: usize,
        height: usize,
        expected: usize,
        found: usize,
    },

    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("electrode index {index} at ({i}, {j}) exceeds electrode count {count}")]
    ElectrodeOutOfRange {
        index: u8,
        count: usize,
        i: usize,
        j: usize,
    },

    #[error("voltage {value} for electrode {electrode} outside [0, 255]")]
    VoltageOutOfRange { electrode: usize, value: i32 },

    #[error("expected {expected} voltages, got {found}")]
    VoltageCount { expected: usize, found: usize },

    #[error("non-finite value {value} at ({i}, {j})")]
    NonFiniteInput { i: usize, j: usize, value: f64 },

    #[error("invalid solver parameters: {0}")]
    InvalidParams(String),

    #[error("relaxation diverged after {sweeps} sweeps")]
    Diverged { sweeps: usize },
}

pub type Result<T> = std::result::Result<T, MirrorError>;
