use alloc::vec::Vec;
use hashbrown::hash_map::{Entry, HashMap};

use crate::node::NodeRef;
use crate::triplet::{FsDevPair, LookupResult, Triplet};

/// An attached file system. Holds one pin on each of the nodes.
#[derive(Debug)]
pub struct MountEntry {
    pub mount_point: NodeRef,
    pub root: NodeRef,
}

/// Mount point -> mounted root.
/// Only reachable through the naming tree lock.
#[derive(Debug, Default)]
pub struct MountTable {
    entries: HashMap<Triplet, MountEntry>,
}
impl MountTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Root of the file system mounted on `node`, if any
    pub fn lookup(&self, node: &Triplet) -> Option<LookupResult> {
        self.entries
            .get(node)
            .map(|entry| entry.root.lookup_result())
    }

    /// Attaches `root` on `mount_point`.
    /// An occupied mount point is left as is and the entry handed back.
    pub fn insert(&mut self, mount_point: NodeRef, root: NodeRef) -> Result<(), MountEntry> {
        match self.entries.entry(mount_point.triplet()) {
            Entry::Occupied(_) => Err(MountEntry { mount_point, root }),
            Entry::Vacant(slot) => {
                log::debug!(
                    "Mounted {:?} on {:?}",
                    root.triplet(),
                    mount_point.triplet()
                );
                slot.insert(MountEntry { mount_point, root });
                Ok(())
            },
        }
    }

    pub fn remove(&mut self, node: &Triplet) -> Option<MountEntry> {
        let entry = self.entries.remove(node)?;
        log::debug!("Unmounted {:?} from {:?}", entry.root.triplet(), node);
        Some(entry)
    }

    /// Whether a mounted file system has other file systems mounted inside it
    pub fn is_busy(&self, fs: FsDevPair) -> bool {
        self.entries.keys().any(|mp| mp.pair() == fs)
    }

    /// All (mount point, mounted root) pairs, in no particular order
    pub fn mount_points(&self) -> Vec<(Triplet, Triplet)> {
        self.entries
            .iter()
            .map(|(mp, entry)| (*mp, entry.root.triplet()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::NodeCache;

    fn pin(cache: &NodeCache, fs: u32, dev: u32, index: u64) -> NodeRef {
        cache
            .acquire(&LookupResult {
                triplet: Triplet::from_raw(fs, dev, index),
                size: index * 10,
            })
            .unwrap()
    }

    #[test]
    fn test_insert_lookup_remove() {
        let cache = NodeCache::new(None);
        let mut table = MountTable::new();
        let mp = Triplet::from_raw(7, 3, 9);

        assert_eq!(table.lookup(&mp), None);
        table
            .insert(pin(&cache, 7, 3, 9), pin(&cache, 7, 5, 1))
            .unwrap();
        assert_eq!(
            table.lookup(&mp),
            Some(LookupResult {
                triplet: Triplet::from_raw(7, 5, 1),
                size: 10,
            })
        );
        assert_eq!(table.mount_points(), vec![(mp, Triplet::from_raw(7, 5, 1))]);

        let entry = table.remove(&mp).unwrap();
        assert_eq!(entry.mount_point.triplet(), mp);
        assert!(table.is_empty());
        assert!(table.remove(&mp).is_none());
    }

    #[test]
    fn test_occupied() {
        let cache = NodeCache::new(None);
        let mut table = MountTable::new();
        table
            .insert(pin(&cache, 7, 3, 9), pin(&cache, 7, 5, 1))
            .unwrap();
        let rejected = table
            .insert(pin(&cache, 7, 3, 9), pin(&cache, 7, 6, 1))
            .unwrap_err();
        assert_eq!(rejected.root.triplet(), Triplet::from_raw(7, 6, 1));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup(&Triplet::from_raw(7, 3, 9)).map(|r| r.triplet),
            Some(Triplet::from_raw(7, 5, 1))
        );
    }

    #[test]
    fn test_busy() {
        let cache = NodeCache::new(None);
        let mut table = MountTable::new();
        table
            .insert(pin(&cache, 7, 5, 4), pin(&cache, 8, 1, 1))
            .unwrap();
        assert!(table.is_busy(Triplet::from_raw(7, 5, 0).pair()));
        assert!(!table.is_busy(Triplet::from_raw(8, 1, 0).pair()));
    }
}
