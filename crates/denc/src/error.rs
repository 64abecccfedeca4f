use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DencError {
    #[error("Insufficient bytes for {what}: need {need}, have {have}")]
    Truncated {
        what: &'static str,
        need: usize,
        have: usize,
    },

    #[error("Insufficient buffer space for {what}: need {need}, have {have}")]
    BufferFull {
        what: &'static str,
        need: usize,
        have: usize,
    },

    #[error("Unsupported {what} encoding: struct_v={version}, struct_compat={compat}, decoder supports up to v{supported}")]
    UnsupportedVersion {
        what: &'static str,
        version: u8,
        compat: u8,
        supported: u8,
    },

    #[error("Duplicate key in encoded {0}")]
    DuplicateKey(&'static str),

    #[error("Length {len} does not fit in a u32 prefix for {what}")]
    LengthOverflow { what: &'static str, len: usize },

    #[error("{0} trailing bytes after encoded value")]
    TrailingBytes(usize),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
