//! Flat error enumeration for every public operation (§7).
//!
//! The core returns a single error code per call and never panics or retries
//! transparently. Grouping matches §7: hardware, filesystem, object, general.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Hardware
    NoCard,
    Spi,
    Timeout,
    Crc,
    Voltage,
    InitFailed,
    /// Command rejected by the card; retains the R1 byte for diagnostics.
    Command(u8),
    Busy,
    WriteProtected,
    ReadError,
    WriteError,
    EraseError,

    // Filesystem
    NoFilesystem,
    InvalidFilesystem,
    NotFat,
    FatCorrupt,
    Full,
    RootFull,

    // Object
    NotFound,
    AlreadyExists,
    NotAFile,
    NotADirectory,
    DirectoryNotEmpty,
    InvalidName,
    PathTooLong,
    TooManyOpen,
    InvalidHandle,
    Eof,
    ReadOnly,
    SeekError,
    Locked,

    // General
    InvalidParameter,
    NotMounted,
    AlreadyMounted,
    NotSupported,
    General,
    Internal,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::NoCard => "no card detected",
            Error::Spi => "SPI communication error",
            Error::Timeout => "operation timed out",
            Error::Crc => "CRC check failed",
            Error::Voltage => "voltage range not supported",
            Error::InitFailed => "card initialization failed",
            Error::Command(_) => "command failed",
            Error::Busy => "card is busy",
            Error::WriteProtected => "card is write protected",
            Error::ReadError => "read error",
            Error::WriteError => "write error",
            Error::EraseError => "erase error",
            Error::NoFilesystem => "no filesystem found",
            Error::InvalidFilesystem => "invalid or corrupt filesystem",
            Error::NotFat => "not a FAT filesystem",
            Error::FatCorrupt => "FAT table corrupted",
            Error::Full => "filesystem full",
            Error::RootFull => "root directory full",
            Error::NotFound => "file or directory not found",
            Error::AlreadyExists => "file or directory already exists",
            Error::NotAFile => "not a file",
            Error::NotADirectory => "not a directory",
            Error::DirectoryNotEmpty => "directory not empty",
            Error::InvalidName => "invalid filename",
            Error::PathTooLong => "path exceeds maximum length",
            Error::TooManyOpen => "too many open files",
            Error::InvalidHandle => "invalid file handle",
            Error::Eof => "end of file reached",
            Error::ReadOnly => "file opened read-only",
            Error::SeekError => "seek error",
            Error::Locked => "file is locked",
            Error::InvalidParameter => "invalid parameter",
            Error::NotMounted => "filesystem not mounted",
            Error::AlreadyMounted => "already mounted",
            Error::NotSupported => "feature not supported",
            Error::General => "general error",
            Error::Internal => "internal error",
        };
        f.write_str(s)
    }
}

impl core::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
