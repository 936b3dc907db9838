//! # Requests from the switch to file system servers
//!
//! Every peer server implements the same small protocol:
//! resolve its own root, resolve one path component below a node,
//! and accept mount/unmount notifications for its nodes.
//! Requests are asynchronous: `send` returns immediately,
//! and the answer is collected later with `wait`. This allows
//! sending multiple requests before blocking on any of them.

use alloc::string::String;
use serde::{Deserialize, Serialize};

use crate::error::{VfsError, VfsResult};
use crate::triplet::{DevHandle, FsHandle, NodeIndex, Triplet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRequest {
    /// Resolve the root node of a device
    Root { dev: DevHandle },
    /// Resolve the child `name` of a directory node
    Lookup {
        dev: DevHandle,
        index: NodeIndex,
        name: String,
    },
    /// A file system is being mounted on this node
    MountPoint { dev: DevHandle, index: NodeIndex },
    /// This root node is being attached below the mount point
    MountedRoot { root: Triplet },
    /// The file system mounted on this node is being detached
    UnmountPoint { dev: DevHandle, index: NodeIndex },
    /// This root node is being detached from its mount point
    UnmountedRoot { root: Triplet },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerAnswer {
    /// Notification accepted
    Done,
    /// Node resolved
    Node { index: NodeIndex, size: u64 },
}

/// Answer of a peer: success value, or the raw error code it returned
pub type PeerResult = Result<PeerAnswer, i32>;

/// Message-passing connection to the file system servers
pub trait Transport: Send + Sync {
    /// In-flight request
    type Pending;

    /// Sends a request without waiting for the answer
    fn send(&self, peer: FsHandle, request: PeerRequest) -> VfsResult<Self::Pending>;

    /// Blocks until the peer has answered
    fn wait(&self, pending: Self::Pending) -> PeerResult;

    /// Sends a request and waits for the answer
    fn call(&self, peer: FsHandle, request: PeerRequest) -> VfsResult<PeerAnswer> {
        let pending = self.send(peer, request)?;
        self.wait(pending).map_err(peer_error)
    }
}

/// Converts a raw peer error code to an error
pub(crate) fn peer_error(code: i32) -> VfsError {
    match VfsError::from_code(code) {
        Err(e) => e,
        // A success code in the error position is a protocol violation
        Ok(()) => {
            log::warn!("Peer answered an error with a success code");
            VfsError::InvalidArgument
        },
    }
}

/// Waits for an already sent notification
pub(crate) fn wait_done<T: Transport>(transport: &T, pending: VfsResult<T::Pending>) -> VfsResult<()> {
    match transport.wait(pending?) {
        Ok(_) => Ok(()),
        Err(code) => Err(peer_error(code)),
    }
}
