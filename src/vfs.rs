use alloc::vec::Vec;
use spin::{Mutex, Once, RwLock};

use crate::config::VfsConfig;
use crate::error::VfsResult;
use crate::mount_table::MountTable;
use crate::node::{NodeCache, NodeRef};
use crate::registry::FsRegistry;
use crate::transport::Transport;
use crate::triplet::{FsHandle, LookupResult, Triplet};

/// The switch: all process-wide naming state.
///
/// ## Locking
/// * `root_lock` serializes assignment of the root file system,
///   and the check whether one exists. It is always taken first.
/// * `namespace` guards the mount table. Mount point resolution and
///   mount table changes hold it for writing, lookups for reading.
/// * The node table lock inside `nodes` is innermost.
///
/// Peer requests may block while `root_lock` and `namespace` are held,
/// but never while the node table is locked.
pub struct Vfs<T: Transport> {
    pub(crate) config: VfsConfig,
    pub(crate) transport: T,
    pub(crate) registry: FsRegistry,
    pub(crate) nodes: NodeCache,
    pub(crate) root_lock: Mutex<()>,
    /// Root of the naming tree. Holds a pin on the node.
    pub(crate) root: Once<NodeRef>,
    pub(crate) namespace: RwLock<MountTable>,
}
impl<T: Transport> Vfs<T> {
    pub fn new(config: VfsConfig, transport: T) -> VfsResult<Self> {
        config.validate()?;
        log::debug!("VFS switch starting with {:?}", config);
        Ok(Self {
            registry: FsRegistry::new(config.fs_name_max),
            nodes: NodeCache::new(config.node_limit),
            config,
            transport,
            root_lock: Mutex::new(()),
            root: Once::new(),
            namespace: RwLock::new(MountTable::new()),
        })
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn registry(&self) -> &FsRegistry {
        &self.registry
    }

    pub fn nodes(&self) -> &NodeCache {
        &self.nodes
    }

    /// Registers a file system driver
    pub fn register(&self, fs_name: &str) -> VfsResult<FsHandle> {
        self.registry.register(fs_name)
    }

    /// Root of the naming tree, if the root file system is mounted
    pub fn root(&self) -> Option<Triplet> {
        self.root.get().map(|node| node.triplet())
    }

    /// Root of the file system mounted on `node`
    pub fn mounted_on(&self, node: &Triplet) -> Option<LookupResult> {
        self.namespace.read().lookup(node)
    }

    /// All (mount point, mounted root) pairs
    pub fn mount_points(&self) -> Vec<(Triplet, Triplet)> {
        self.namespace.read().mount_points()
    }
}
