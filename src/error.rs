use core::fmt;
use serde::{Deserialize, Serialize};

/// Raw status codes exchanged with clients and peer servers
pub mod code {
    pub const OK: i32 = 0;
    pub const NOT_FOUND: i32 = -1;
    pub const OUT_OF_MEMORY: i32 = -2;
    pub const INVALID_ARGUMENT: i32 = -13;
}

pub type VfsResult<T> = Result<T, VfsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VfsError {
    /// Malformed or over-length name or path
    InvalidArgument,
    /// Unknown driver, missing path component,
    /// or no root file system to resolve against
    NotFound,
    /// Node or buffer allocation failed
    OutOfMemory,
    /// A peer server answered with this non-success code
    Peer(i32),
}
impl VfsError {
    /// Converts a peer answer code. Codes the switch itself uses are mapped
    /// back to their kind, anything else is passed through verbatim.
    pub fn from_code(code: i32) -> VfsResult<()> {
        match code {
            code::OK => Ok(()),
            code::NOT_FOUND => Err(Self::NotFound),
            code::OUT_OF_MEMORY => Err(Self::OutOfMemory),
            code::INVALID_ARGUMENT => Err(Self::InvalidArgument),
            other => Err(Self::Peer(other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::InvalidArgument => code::INVALID_ARGUMENT,
            Self::NotFound => code::NOT_FOUND,
            Self::OutOfMemory => code::OUT_OF_MEMORY,
            Self::Peer(c) => c,
        }
    }
}
impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::NotFound => write!(f, "not found"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Peer(c) => write!(f, "peer failure ({})", c),
        }
    }
}
impl core::convert::From<hashbrown::TryReserveError> for VfsError {
    fn from(_: hashbrown::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
impl core::convert::From<alloc::collections::TryReserveError> for VfsError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
impl core::convert::Into<i32> for VfsError {
    fn into(self) -> i32 {
        self.code()
    }
}

/// Status code of a finished operation, as answered to the caller
pub fn status_code<T>(result: &VfsResult<T>) -> i32 {
    match result {
        Ok(_) => code::OK,
        Err(e) => e.code(),
    }
}

/// Combines the answers of two concurrently sent requests.
/// The first failure wins, the second is only reported
/// if the first request succeeded.
pub fn first_failure(first: VfsResult<()>, second: VfsResult<()>) -> VfsResult<()> {
    first.and(second)
}
