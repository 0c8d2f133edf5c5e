use thiserror::Error;

/// crate specific Result type
pub type Result<T> = std::result::Result<T, Error>;

/// crate specific Error enum
#[derive(Error, Debug)]
pub enum Error {
    /// Tree depth outside the supported range
    #[error("tree depth must be between 1 and 5, got {0}")]
    InvalidDepth(u8),

    /// More payload bytes per voxel than a 64-bit word can pack
    #[error("payload width must be at most 8 bytes per voxel, got {0}")]
    InvalidPayloadWidth(u32),

    /// A per-point payload wider than the tree's configured width
    #[error("payload has {len} bytes but the tree stores {nbits} per voxel")]
    PayloadTooWide {
        /// Bytes in the offending payload
        len: usize,
        /// Payload bytes per voxel the tree was created with
        nbits: u32,
    },

    /// Point and payload arrays of different length
    #[error("got {points} points but {payloads} payloads")]
    PayloadCountMismatch {
        /// Number of points
        points: usize,
        /// Number of payload rows
        payloads: usize,
    },

    /// Voxel coordinate outside the grid
    #[error("voxel ({0}, {1}, {2}) is outside the {3}^3 grid")]
    CoordOutOfGrid(u32, u32, u32, u32),

    /// Writing a tree with no occupied voxels
    #[error("no occupied voxels, refusing to write an empty tree")]
    EmptyTree,

    /// Header size field does not match the fixed layout
    #[error("invalid header size {0}, expected 80")]
    InvalidHeaderSize(u32),

    /// Unknown format version
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// Mode byte is neither sparse (0) nor dense (1)
    #[error("invalid mode byte {0}")]
    InvalidMode(u8),

    /// File ended before all level words announced by the tree were read
    #[error("file truncated while reading level {0}")]
    Truncated(u8),

    /// [std::io::Error]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// [serde_json::Error]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
