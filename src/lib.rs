//! # d7vfs: the virtual file system switch
//!
//! Joins file systems served by separate driver processes into one naming
//! tree. The switch keeps a registry of drivers, a cache of pinned nodes,
//! and a table of mounts. Path resolution asks the driver owning each node
//! for its children, and crosses into mounted file systems on the way.
//!
//! Drivers are reached through a `Transport`; the in-memory implementation
//! in `testing` answers requests without any processes.

// Safety
#![deny(overflowing_literals)]
#![deny(unused_must_use)]
// Disable some clippy lints
#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]
// No-std when not running tests
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate alloc;

#[macro_use]
extern crate bitflags;

pub mod config;
pub mod error;
pub mod lookup;
pub mod mount;
pub mod mount_table;
pub mod node;
pub mod path;
pub mod registry;
pub mod server;
pub mod testing;
pub mod transport;
pub mod triplet;
pub mod vfs;

pub use self::config::VfsConfig;
pub use self::error::{VfsError, VfsResult};
pub use self::lookup::LookupFlags;
pub use self::node::{NodeCache, NodeRef, VfsNode};
pub use self::server::{DataWrite, VfsAnswer, VfsCall};
pub use self::transport::{PeerAnswer, PeerRequest, PeerResult, Transport};
pub use self::triplet::{DevHandle, FsDevPair, FsHandle, LookupResult, NodeIndex, Triplet};
pub use self::vfs::Vfs;
