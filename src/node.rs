use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};
use hashbrown::HashMap;
use spin::Mutex;

use crate::error::{VfsError, VfsResult};
use crate::triplet::{LookupResult, Triplet};

/// Shared handle to a cached node.
/// Cloning or dropping a handle does not change the reference count,
/// only `NodeCache::acquire` and `NodeCache::release` do.
pub type NodeRef = Arc<VfsNode>;

#[derive(Debug)]
struct NodeMeta {
    size: u64,
}

/// A node of some mounted file system, as seen by the switch
#[derive(Debug)]
pub struct VfsNode {
    triplet: Triplet,
    /// Pins held on this node.
    /// Only modified while the node table is locked.
    refcount: AtomicUsize,
    meta: Mutex<NodeMeta>,
}
impl VfsNode {
    fn new(result: &LookupResult) -> Self {
        Self {
            triplet: result.triplet,
            refcount: AtomicUsize::new(0),
            meta: Mutex::new(NodeMeta { size: result.size }),
        }
    }

    pub fn triplet(&self) -> Triplet {
        self.triplet
    }

    pub fn size(&self) -> u64 {
        self.meta.lock().size
    }

    pub fn refcount(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }

    pub fn lookup_result(&self) -> LookupResult {
        LookupResult {
            triplet: self.triplet,
            size: self.size(),
        }
    }

    fn set_size(&self, size: u64) {
        let mut meta = self.meta.lock();
        if meta.size != size {
            log::trace!("Node {:?} size {} -> {}", self.triplet, meta.size, size);
            meta.size = size;
        }
    }
}

/// Process-wide table of pinned nodes, keyed by triplet
#[derive(Debug)]
pub struct NodeCache {
    nodes: Mutex<HashMap<Triplet, NodeRef>>,
    limit: Option<usize>,
}
impl NodeCache {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Pins a node, creating the cache entry on first reference.
    /// All callers acquiring the same triplet get the same node.
    pub fn acquire(&self, result: &LookupResult) -> VfsResult<NodeRef> {
        let mut nodes = self.nodes.lock();

        if let Some(node) = nodes.get(&result.triplet) {
            node.refcount.fetch_add(1, Ordering::AcqRel);
            node.set_size(result.size);
            return Ok(node.clone());
        }

        if let Some(limit) = self.limit {
            if nodes.len() >= limit {
                log::warn!("Node cache full ({} nodes)", limit);
                return Err(VfsError::OutOfMemory);
            }
        }
        nodes.try_reserve(1)?;

        let node = Arc::new(VfsNode::new(result));
        node.refcount.store(1, Ordering::Release);
        nodes.insert(result.triplet, node.clone());
        log::trace!("Node {:?} cached", result.triplet);
        Ok(node)
    }

    /// Drops one pin, evicting the node when the last one is gone
    pub fn release(&self, node: NodeRef) {
        let mut nodes = self.nodes.lock();
        let previous = node.refcount.load(Ordering::Acquire);
        if previous == 0 {
            log::warn!("Node {:?} released without a reference", node.triplet);
            return;
        }
        node.refcount.store(previous - 1, Ordering::Release);
        if previous == 1 {
            nodes.remove(&node.triplet);
            log::trace!("Node {:?} evicted", node.triplet);
        }
    }

    /// Pin count of a cached node, zero if not cached
    pub fn refcount(&self, triplet: &Triplet) -> usize {
        self.nodes
            .lock()
            .get(triplet)
            .map(|node| node.refcount())
            .unwrap_or(0)
    }

    pub fn get(&self, triplet: &Triplet) -> Option<NodeRef> {
        self.nodes.lock().get(triplet).cloned()
    }

    pub fn contains(&self, triplet: &Triplet) -> bool {
        self.nodes.lock().contains_key(triplet)
    }

    /// Number of cached nodes
    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total pins over all cached nodes
    pub fn refcount_sum(&self) -> usize {
        self.nodes.lock().values().map(|node| node.refcount()).sum()
    }
}
