/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Describes an error encountered while creating or decoding a bitmap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bitmap counter has no room for another bitmap of the requested size.
    #[error(
        "attempted to pin a bitmap of {requested} bytes; pool count is {count} of {max_count}, \
         pool size is {size} of {max_size} bytes"
    )]
    TooManyBitmaps {
        /// Bytes the new bitmap needed
        requested: usize,
        /// Live bitmaps at the time of the request
        count: usize,
        /// Maximum number of live bitmaps
        max_count: usize,
        /// Live bytes at the time of the request
        size: usize,
        /// Maximum number of live bytes
        max_size: usize,
    },
    /// The pixel allocation could not be satisfied.
    #[error("out of memory allocating {bytes} bytes of pixel data")]
    OutOfMemory {
        /// Size of the failed allocation
        bytes: usize,
    },
    /// Width or height is zero or negative.
    #[error("invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: i64,
        /// Requested height
        height: i64,
    },
    /// Width or height does not fit the 16-bit signed range of the placeholder encoder.
    #[error("bitmap dimensions {width}x{height} exceed the 16-bit placeholder limit")]
    DimensionsTooLarge {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
    /// A region does not lie inside the image it refers to.
    #[error("region {width}x{height}+{x}+{y} lies outside the image")]
    InvalidRegion {
        /// Left edge
        x: u32,
        /// Top edge
        y: u32,
        /// Region width
        width: u32,
        /// Region height
        height: u32,
    },
    /// The decode length is larger than the encoded buffer.
    #[error("decode length {length} exceeds encoded buffer size {size}")]
    InvalidLength {
        /// Requested length
        length: usize,
        /// Actual buffer size
        size: usize,
    },
    /// A caller-supplied pixel buffer is too short.
    #[error("buffer too small: need {needed} pixels, got {actual}")]
    BufferTooSmall {
        /// Required number of elements
        needed: usize,
        /// Supplied number of elements
        actual: usize,
    },
    /// The image is malformed in some way. The string describes how.
    #[error("malformed image: {0}")]
    Malformed(&'static str),
    /// A feature is not supported by the decoder
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
    /// The decoder had a problem
    #[error("internal decoder error: {0}")]
    InternalError(&'static str),
    /// A configuration value was rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// There was an error reading or writing an image
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
