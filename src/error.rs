use thiserror::Error;

/// Top-level error type for emvox.
#[derive(Debug, Error)]
pub enum EmvoxError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Voxelize(#[from] VoxelizeError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to geometric construction and queries.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("{parameter} must be positive, got {value}")]
    NonPositive { parameter: &'static str, value: f64 },
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Errors raised while building a grid index.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("bounding box is empty or invalid")]
    EmptyBoundingBox,

    #[error("voxel pitch must be positive and finite, got {0}")]
    InvalidPitch(f64),

    #[error("cell {0:?} lies outside the tensor")]
    CellOutOfRange([usize; 3]),

    #[error("grid of {dims:?} voxels exceeds the {max}-cell limit")]
    TooLarge { dims: [usize; 3], max: usize },
}

/// Errors raised while voxelizing a single conductor.
#[derive(Debug, Error)]
pub enum VoxelizeError {
    #[error("conductor bounding box escapes the domain bounding box")]
    OutsideDomain,

    #[error("occupancy tensor shape {tensor:?} does not match grid storage {grid:?}")]
    ShapeMismatch { tensor: [usize; 3], grid: [usize; 3] },

    #[error("conductor tag 0 is reserved for empty cells")]
    ReservedTag,
}

/// Errors raised by the domain manager.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("conductor tag space exhausted (max {max})")]
    TagOverflow { max: u16 },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} is not voxelized")]
    NotVoxelized(String),

    #[error("no conductors in domain")]
    NoConductors,

    #[error("port contact faces lie outside the domain bounding box")]
    PortOutsideDomain,

    #[error("port {0} has no contact faces")]
    NoContactFaces(String),
}

/// Errors raised while writing or reading solver input files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0} already exists")]
    AlreadyExists(std::path::PathBuf),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid deck: {0}")]
    InvalidDeck(String),
}

/// Errors raised while loading solver settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("invalid setting {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Convenience type alias for results using [`EmvoxError`].
pub type Result<T> = std::result::Result<T, EmvoxError>;
