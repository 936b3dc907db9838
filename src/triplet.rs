use core::fmt;
use serde::{Deserialize, Serialize};

/// File system driver type, as registered with the switch.
/// Handle zero is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FsHandle(u32);
impl FsHandle {
    pub const fn from_u32(v: u32) -> Self {
        Self(v)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) const fn first() -> Self {
        Self(1)
    }

    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A mounted device (instance) of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DevHandle(u32);
impl DevHandle {
    pub const fn from_u32(v: u32) -> Self {
        Self(v)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Per-device node identifier. Only the owning driver interprets it.
/// Somewhat analogous to Unix inode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeIndex(u64);
impl NodeIndex {
    pub const fn from_u64(v: u64) -> Self {
        Self(v)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global identity of a node in the naming tree
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub fs_handle: FsHandle,
    pub dev_handle: DevHandle,
    pub index: NodeIndex,
}
impl Triplet {
    pub const fn new(fs_handle: FsHandle, dev_handle: DevHandle, index: NodeIndex) -> Self {
        Self {
            fs_handle,
            dev_handle,
            index,
        }
    }

    /// Shorthand, mostly for tests
    pub const fn from_raw(fs_handle: u32, dev_handle: u32, index: u64) -> Self {
        Self::new(
            FsHandle::from_u32(fs_handle),
            DevHandle::from_u32(dev_handle),
            NodeIndex::from_u64(index),
        )
    }

    /// The mounted file system instance this node belongs to
    pub const fn pair(&self) -> FsDevPair {
        FsDevPair {
            fs_handle: self.fs_handle,
            dev_handle: self.dev_handle,
        }
    }
}
impl fmt::Debug for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.fs_handle.0, self.dev_handle.0, self.index.0
        )
    }
}

/// Driver and device, without a node.
/// Used to start resolution at the root of a file system
/// that is not attached to the naming tree yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FsDevPair {
    pub fs_handle: FsHandle,
    pub dev_handle: DevHandle,
}
impl FsDevPair {
    pub const fn new(fs_handle: FsHandle, dev_handle: DevHandle) -> Self {
        Self {
            fs_handle,
            dev_handle,
        }
    }

    pub const fn node(self, index: NodeIndex) -> Triplet {
        Triplet::new(self.fs_handle, self.dev_handle, index)
    }
}

/// A node as reported by its driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupResult {
    pub triplet: Triplet,
    /// Size of the node contents in bytes
    pub size: u64,
}
