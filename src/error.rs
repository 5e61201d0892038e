#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("detection contains no landmarks")]
    MissingDetection,

    #[error("no joint angle is defined between {0} and {1}")]
    NotFound(String, String),

    #[error("detection supplied {0} landmarks, at most {1} are supported")]
    TooManyLandmarks(usize, usize),

    #[error("unknown landmark: {0}")]
    UnknownLandmark(String),

    #[error("unknown limb: {0}")]
    UnknownLimb(String),

    #[error("invalid color, expected b,g,r: {0}")]
    ParseColor(String),

    #[error("failed to parse detection line {line}: {reason}")]
    ParseLine { line: usize, reason: String },

    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("failed to convert usize value to landmark kind: {0}")]
    ConvertUSizeToLandmarkKind(usize),

    #[error("failed to copy image")]
    CopyImage(#[source] opencv::Error),

    #[error("failed to draw line")]
    DrawLine(#[source] opencv::Error),

    #[error("failed to draw circle")]
    DrawCircle(#[source] opencv::Error),

    #[error("failed to draw text")]
    PutText(#[source] opencv::Error),

    #[error("failed to read image: {1:?}")]
    ReadImage(#[source] opencv::Error, std::path::PathBuf),

    #[error("image is empty or unreadable: {0:?}")]
    EmptyImage(std::path::PathBuf),

    #[error("failed to get path as &str: {0:?}")]
    PathToStr(std::path::PathBuf),

    #[error("image encoder refused to write: {0:?}")]
    ImageNotWritten(std::path::PathBuf),

    #[error("failed to write image: {1:?}")]
    WriteImage(#[source] opencv::Error, std::path::PathBuf),

    #[error("failed to convert image dimension {1} to u32")]
    ConvertDimToU32(#[source] std::num::TryFromIntError, i32),

    #[cfg(feature = "gui")]
    #[error("failed to show image")]
    ImShow(#[source] opencv::Error),
}
