//! In-memory file system servers, for testing the switch without processes.
//!
//! Each device is a tree of directory nodes. The root of every device has
//! index 1. Requests are answered synchronously at send time, and every
//! request is recorded so tests can inspect the protocol traffic.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use spin::Mutex;

use crate::error::{code, VfsError, VfsResult};
use crate::path::PathBuf;
use crate::transport::{PeerAnswer, PeerRequest, PeerResult, Transport};
use crate::triplet::{DevHandle, FsDevPair, FsHandle, NodeIndex, Triplet};

pub const ROOT_INDEX: NodeIndex = NodeIndex::from_u64(1);

/// Notification kinds, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    MountPoint,
    MountedRoot,
    UnmountPoint,
    UnmountedRoot,
}
impl Notification {
    fn of(request: &PeerRequest) -> Option<Self> {
        match request {
            PeerRequest::MountPoint { .. } => Some(Self::MountPoint),
            PeerRequest::MountedRoot { .. } => Some(Self::MountedRoot),
            PeerRequest::UnmountPoint { .. } => Some(Self::UnmountPoint),
            PeerRequest::UnmountedRoot { .. } => Some(Self::UnmountedRoot),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryNode {
    size: u64,
    children: HashMap<String, NodeIndex>,
}

#[derive(Debug)]
struct MemoryDevice {
    nodes: HashMap<NodeIndex, MemoryNode>,
    next_index: u64,
}
impl MemoryDevice {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_INDEX, MemoryNode::default());
        Self {
            nodes,
            next_index: ROOT_INDEX.as_u64() + 1,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryServer {
    devices: HashMap<DevHandle, MemoryDevice>,
    failures: Vec<(Notification, i32)>,
    /// Nodes this server has been told are mount points
    mount_points: Vec<(DevHandle, NodeIndex)>,
    /// Roots this server has been told are attached below its nodes
    attached_roots: Vec<Triplet>,
}
impl MemoryServer {
    fn node(&self, dev: DevHandle, index: NodeIndex) -> Result<&MemoryNode, i32> {
        self.devices
            .get(&dev)
            .and_then(|d| d.nodes.get(&index))
            .ok_or(code::NOT_FOUND)
    }

    fn handle(&mut self, request: &PeerRequest) -> PeerResult {
        if let Some(kind) = Notification::of(request) {
            if let Some(i) = self.failures.iter().position(|(k, _)| *k == kind) {
                let (_, c) = self.failures.remove(i);
                return Err(c);
            }
        }

        match request {
            PeerRequest::Root { dev } => {
                let node = self.node(*dev, ROOT_INDEX)?;
                Ok(PeerAnswer::Node {
                    index: ROOT_INDEX,
                    size: node.size,
                })
            },
            PeerRequest::Lookup { dev, index, name } => {
                let child = *self
                    .node(*dev, *index)?
                    .children
                    .get(name)
                    .ok_or(code::NOT_FOUND)?;
                let node = self.node(*dev, child)?;
                Ok(PeerAnswer::Node {
                    index: child,
                    size: node.size,
                })
            },
            PeerRequest::MountPoint { dev, index } => {
                self.node(*dev, *index)?;
                self.mount_points.push((*dev, *index));
                Ok(PeerAnswer::Done)
            },
            PeerRequest::MountedRoot { root } => {
                self.attached_roots.push(*root);
                Ok(PeerAnswer::Done)
            },
            PeerRequest::UnmountPoint { dev, index } => {
                let i = self
                    .mount_points
                    .iter()
                    .position(|mp| *mp == (*dev, *index))
                    .ok_or(code::INVALID_ARGUMENT)?;
                self.mount_points.remove(i);
                Ok(PeerAnswer::Done)
            },
            PeerRequest::UnmountedRoot { root } => {
                let i = self
                    .attached_roots
                    .iter()
                    .position(|r| r == root)
                    .ok_or(code::INVALID_ARGUMENT)?;
                self.attached_roots.remove(i);
                Ok(PeerAnswer::Done)
            },
        }
    }
}

/// A set of in-memory file system servers, one per driver handle
#[derive(Debug, Default)]
pub struct MemoryPeers {
    servers: Mutex<HashMap<FsHandle, MemoryServer>>,
    requests: Mutex<Vec<(FsHandle, PeerRequest)>>,
}
impl MemoryPeers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty device, returning its root node
    pub fn add_device(&self, fs: FsDevPair) -> Triplet {
        self.servers
            .lock()
            .entry(fs.fs_handle)
            .or_default()
            .devices
            .insert(fs.dev_handle, MemoryDevice::new());
        fs.node(ROOT_INDEX)
    }

    /// Creates all missing directories along `path`, returning the last one
    pub fn create(&self, fs: FsDevPair, path: &str) -> VfsResult<Triplet> {
        self.create_inner(fs, path, None)
    }

    /// Like `create`, but the final node gets the given index
    pub fn create_at(&self, fs: FsDevPair, path: &str, index: NodeIndex) -> VfsResult<Triplet> {
        self.create_inner(fs, path, Some(index))
    }

    fn create_inner(
        &self, fs: FsDevPair, path: &str, last_index: Option<NodeIndex>,
    ) -> VfsResult<Triplet> {
        let path = PathBuf::canonicalize(path)?;
        let mut servers = self.servers.lock();
        let device = servers
            .get_mut(&fs.fs_handle)
            .and_then(|s| s.devices.get_mut(&fs.dev_handle))
            .ok_or(VfsError::NotFound)?;

        let count = path.components().count();
        let mut current = ROOT_INDEX;
        for (i, name) in path.components().enumerate() {
            let existing = device
                .nodes
                .get(&current)
                .and_then(|n| n.children.get(name).copied());
            current = match existing {
                Some(child) => child,
                None => {
                    let index = match last_index {
                        Some(index) if i + 1 == count => index,
                        _ => {
                            let index = NodeIndex::from_u64(device.next_index);
                            device.next_index += 1;
                            index
                        },
                    };
                    if device.nodes.contains_key(&index) {
                        return Err(VfsError::InvalidArgument);
                    }
                    device.nodes.insert(index, MemoryNode::default());
                    device
                        .nodes
                        .get_mut(&current)
                        .ok_or(VfsError::NotFound)?
                        .children
                        .insert(name.to_owned(), index);
                    index
                },
            };
        }
        Ok(fs.node(current))
    }

    /// Sets the reported size of a node
    pub fn set_size(&self, node: Triplet, size: u64) -> VfsResult<()> {
        let mut servers = self.servers.lock();
        let node = servers
            .get_mut(&node.fs_handle)
            .and_then(|s| s.devices.get_mut(&node.dev_handle))
            .and_then(|d| d.nodes.get_mut(&node.index))
            .ok_or(VfsError::NotFound)?;
        node.size = size;
        Ok(())
    }

    /// Makes the next notification of this kind to `fs` fail with `code`
    pub fn fail_next(&self, fs: FsHandle, kind: Notification, code: i32) {
        self.servers
            .lock()
            .entry(fs)
            .or_default()
            .failures
            .push((kind, code));
    }

    /// Nodes a server currently believes to be mount points
    pub fn mount_points(&self, fs: FsHandle) -> Vec<(DevHandle, NodeIndex)> {
        self.servers
            .lock()
            .get(&fs)
            .map(|s| s.mount_points.clone())
            .unwrap_or_default()
    }

    /// Roots a server currently believes to be attached below its nodes
    pub fn attached_roots(&self, fs: FsHandle) -> Vec<Triplet> {
        self.servers
            .lock()
            .get(&fs)
            .map(|s| s.attached_roots.clone())
            .unwrap_or_default()
    }

    /// All requests sent so far
    pub fn requests(&self) -> Vec<(FsHandle, PeerRequest)> {
        self.requests.lock().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}
impl Transport for MemoryPeers {
    type Pending = PeerResult;

    fn send(&self, peer: FsHandle, request: PeerRequest) -> VfsResult<Self::Pending> {
        self.requests.lock().push((peer, request.clone()));
        let mut servers = self.servers.lock();
        let server = servers.get_mut(&peer).ok_or(VfsError::NotFound)?;
        Ok(server.handle(&request))
    }

    fn wait(&self, pending: Self::Pending) -> PeerResult {
        pending
    }
}
