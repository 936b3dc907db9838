//! Path resolution across mounted file systems

use alloc::borrow::ToOwned;

use crate::error::{VfsError, VfsResult};
use crate::mount_table::MountTable;
use crate::node::NodeRef;
use crate::path::{Path, PathBuf};
use crate::transport::{PeerAnswer, PeerRequest, Transport};
use crate::triplet::{FsDevPair, LookupResult, NodeIndex};
use crate::vfs::Vfs;

bitflags! {
    pub struct LookupFlags: u32 {
        /// Stop at the last mount point of the final component,
        /// instead of entering the file system mounted there
        const MOUNT_POINT = 1 << 0;
    }
}

fn node_answer(fs: FsDevPair, answer: PeerAnswer) -> VfsResult<LookupResult> {
    match answer {
        PeerAnswer::Node { index, size } => Ok(LookupResult {
            triplet: fs.node(index),
            size,
        }),
        PeerAnswer::Done => {
            log::warn!("Peer {:?} answered a lookup without a node", fs);
            Err(VfsError::InvalidArgument)
        },
    }
}

/// Follows mounts stacked on `node`, returning the topmost root
fn cross_mounts(mounts: &MountTable, mut node: LookupResult) -> LookupResult {
    // Bounded: every mounted root is a distinct mount table entry
    for _ in 0..=mounts.len() {
        match mounts.lookup(&node.triplet) {
            Some(root) => node = root,
            None => break,
        }
    }
    node
}

/// Like `cross_mounts`, but returns the topmost mount point instead
fn last_mount_point(mounts: &MountTable, mut node: LookupResult) -> LookupResult {
    for _ in 0..=mounts.len() {
        match mounts.lookup(&node.triplet) {
            Some(root) if mounts.lookup(&root.triplet).is_some() => node = root,
            _ => break,
        }
    }
    node
}

impl<T: Transport> Vfs<T> {
    /// Asks a driver for the root node of one of its devices
    pub(crate) fn fs_root(&self, fs: FsDevPair) -> VfsResult<LookupResult> {
        log::trace!("Resolving root of {:?}", fs);
        let answer = self
            .transport
            .call(fs.fs_handle, PeerRequest::Root { dev: fs.dev_handle })?;
        node_answer(fs, answer)
    }

    /// Asks the owner of `parent` for its child `name`
    fn lookup_child(&self, parent: LookupResult, name: &str) -> VfsResult<LookupResult> {
        let t = parent.triplet;
        let request = PeerRequest::Lookup {
            dev: t.dev_handle,
            index: t.index,
            name: name.to_owned(),
        };
        let answer = self.transport.call(t.fs_handle, request)?;
        node_answer(t.pair(), answer)
    }

    /// Walks `path` starting from the root of the naming tree,
    /// or from the root of `altroot` if given.
    ///
    /// The caller must hold the namespace lock; `mounts` is the table behind it.
    pub(crate) fn resolve_in(
        &self, mounts: &MountTable, path: &Path, flags: LookupFlags, altroot: Option<FsDevPair>,
    ) -> VfsResult<LookupResult> {
        let mut current = match altroot {
            Some(fs) => self.fs_root(fs)?,
            None => self
                .root
                .get()
                .map(|node| node.lookup_result())
                .ok_or(VfsError::NotFound)?,
        };

        // The root of `altroot` itself is never crossed:
        // mounts stacked on it cover it only in the naming tree
        let mut crossing = altroot.is_none();
        for name in path.components() {
            if crossing {
                current = cross_mounts(mounts, current);
            }
            crossing = true;
            current = self.lookup_child(current, name)?;
        }

        if crossing {
            current = if flags.contains(LookupFlags::MOUNT_POINT) {
                last_mount_point(mounts, current)
            } else {
                cross_mounts(mounts, current)
            };
        }

        log::trace!("Resolved {:?} to {:?}", path.as_str(), current.triplet);
        Ok(current)
    }

    /// Resolves a path to a node without pinning it.
    ///
    /// The naming tree lock is held for writing, so that
    /// no mount can change the tree during the walk.
    pub fn resolve(&self, path: &str, altroot: Option<FsDevPair>) -> VfsResult<LookupResult> {
        self.config.check_path_len(path.len())?;
        let path = PathBuf::canonicalize(path)?;
        let mounts = self.namespace.write();
        self.resolve_in(&mounts, &path, LookupFlags::empty(), altroot)
    }

    /// Resolves a path and pins the node.
    /// The node must be released with `put`.
    pub fn lookup(&self, path: &str, flags: LookupFlags) -> VfsResult<NodeRef> {
        self.config.check_path_len(path.len())?;
        let path = PathBuf::canonicalize(path)?;
        let mounts = self.namespace.read();
        let result = self.resolve_in(&mounts, &path, flags, None)?;
        self.nodes.acquire(&result)
    }

    /// Releases a node pinned by `lookup`
    pub fn put(&self, node: NodeRef) {
        self.nodes.release(node)
    }

    /// Index of the root node on a device
    pub fn root_index(&self, fs: FsDevPair) -> VfsResult<NodeIndex> {
        Ok(self.fs_root(fs)?.triplet.index)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::VfsConfig;
    use crate::testing::MemoryPeers;
    use crate::triplet::{DevHandle, Triplet};

    fn setup() -> (Vfs<MemoryPeers>, FsDevPair) {
        let peers = MemoryPeers::new();
        let vfs = Vfs::new(VfsConfig::default(), peers).unwrap();
        let fs = vfs.register("demofs").unwrap();
        let pair = FsDevPair::new(fs, DevHandle::from_u32(3));
        vfs.transport().add_device(pair);
        vfs.transport().create(pair, "/a/b").unwrap();
        (vfs, pair)
    }

    #[test]
    fn test_no_root() {
        let (vfs, _) = setup();
        assert_eq!(vfs.resolve("/a", None), Err(VfsError::NotFound));
        assert_eq!(
            vfs.lookup("/", LookupFlags::empty()).err(),
            Some(VfsError::NotFound)
        );
    }

    #[test]
    fn test_altroot() {
        let (vfs, pair) = setup();
        let root = vfs.resolve("/", Some(pair)).unwrap();
        assert_eq!(root.triplet, pair.node(NodeIndex::from_u64(1)));
        let b = vfs.resolve("/a/b", Some(pair)).unwrap();
        assert_eq!(b.triplet.pair(), pair);
        assert_eq!(vfs.resolve("/a/c", Some(pair)), Err(VfsError::NotFound));
        assert_eq!(vfs.root_index(pair), Ok(NodeIndex::from_u64(1)));
    }

    #[test]
    fn test_malformed_paths() {
        let (vfs, pair) = setup();
        assert_eq!(vfs.resolve("", Some(pair)), Err(VfsError::InvalidArgument));
        assert_eq!(vfs.resolve("a/b", Some(pair)), Err(VfsError::InvalidArgument));
    }

    #[test]
    fn test_lookup_pins() {
        let (vfs, pair) = setup();
        vfs.mount(pair.dev_handle, "demofs", "/").unwrap();
        let root = Triplet::new(pair.fs_handle, pair.dev_handle, NodeIndex::from_u64(1));

        let node = vfs.lookup("/a/./b/", LookupFlags::empty()).unwrap();
        assert_eq!(vfs.nodes().refcount(&node.triplet()), 1);
        // The root is pinned by the switch itself
        assert_eq!(vfs.nodes().refcount(&root), 1);
        let t = node.triplet();
        vfs.put(node);
        assert_eq!(vfs.nodes().refcount(&t), 0);
        assert!(!vfs.nodes().contains(&t));
    }
}
