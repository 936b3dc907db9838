//! # Mounting and unmounting
//!
//! Attaching a file system is a handshake between the switch and the server
//! owning the mount point. The switch resolves and pins both nodes, then
//! notifies the server twice: once about the mount point, and once about the
//! root being attached there. Only when both notifications succeed is the
//! mount table updated, and from then on lookups cross into the new file system.
//!
//! The very first mount must be on `/` and attaches the root file system,
//! which is not recorded in the mount table.
//!
//! ## Known limitation
//! If exactly one of the two notifications fails, the local state is rolled
//! back but the peer that accepted its notification is not told about it.

use crate::error::{first_failure, VfsError, VfsResult};
use crate::lookup::LookupFlags;
use crate::node::NodeRef;
use crate::path::PathBuf;
use crate::transport::{wait_done, PeerRequest, Transport};
use crate::triplet::{DevHandle, FsDevPair};
use crate::vfs::Vfs;

impl<T: Transport> Vfs<T> {
    /// Mounts device `dev` of driver `fs_name` on `path`
    pub fn mount(&self, dev: DevHandle, fs_name: &str, path: &str) -> VfsResult<()> {
        log::trace!("mount {:?} {:?} on {:?}", fs_name, dev, path);

        self.config.check_name_len(fs_name.len())?;
        self.config.check_path_len(path.len())?;

        let fs_handle = match self.registry.name_to_handle(fs_name, false) {
            Some(handle) => handle,
            None => {
                log::debug!("mount: unknown file system {:?}", fs_name);
                return Err(VfsError::NotFound);
            },
        };

        // The root of the mounted file system cannot go away,
        // but it is pinned anyway to count how many times it is mounted
        let mounted_root = self.fs_root(FsDevPair::new(fs_handle, dev))?;
        let mr_node = self.nodes.acquire(&mounted_root)?;

        let mp_node = {
            let _root_guard = self.root_lock.lock();

            if self.root.get().is_none() {
                if path == "/" {
                    // The pin on the root node is kept by the root cell
                    self.root.call_once(|| mr_node);
                    log::debug!("Root file system mounted: {:?}", mounted_root.triplet);
                    return Ok(());
                } else {
                    // Nothing to resolve the path against
                    self.nodes.release(mr_node);
                    return Err(VfsError::NotFound);
                }
            }

            let mounts = self.namespace.write();
            let resolved = PathBuf::canonicalize(path)
                .and_then(|mp| self.resolve_in(&mounts, &mp, LookupFlags::empty(), None));
            let mp = match resolved {
                Ok(mp) => mp,
                Err(e) => {
                    drop(mounts);
                    drop(_root_guard);
                    self.nodes.release(mr_node);
                    return Err(e);
                },
            };

            // Dropped only on the corresponding unmount,
            // so that the mount point cannot be deleted
            match self.nodes.acquire(&mp) {
                Ok(node) => node,
                Err(e) => {
                    drop(mounts);
                    drop(_root_guard);
                    self.nodes.release(mr_node);
                    return Err(e);
                },
            }
        };

        if let Err(e) = self.notify(&mp_node, &mr_node, false) {
            log::warn!(
                "Mounting {:?} on {:?} refused by {:?}: {}",
                mr_node.triplet(),
                mp_node.triplet(),
                self.registry.name_of(mp_node.triplet().fs_handle),
                e
            );
            self.nodes.release(mr_node);
            self.nodes.release(mp_node);
            return Err(e);
        }

        let mut mounts = self.namespace.write();
        if let Err(entry) = mounts.insert(mp_node, mr_node) {
            drop(mounts);
            log::warn!(
                "Mount point {:?} was taken by a concurrent mount",
                entry.mount_point.triplet()
            );
            self.nodes.release(entry.root);
            self.nodes.release(entry.mount_point);
            return Err(VfsError::InvalidArgument);
        }
        Ok(())
    }

    /// Detaches the file system mounted on `path`
    pub fn unmount(&self, path: &str) -> VfsResult<()> {
        log::trace!("unmount {:?}", path);

        self.config.check_path_len(path.len())?;
        let path = PathBuf::canonicalize(path)?;
        if path.is_root() {
            log::debug!("unmount: refusing to detach the root file system");
            return Err(VfsError::InvalidArgument);
        }

        let entry = {
            let _root_guard = self.root_lock.lock();
            if self.root.get().is_none() {
                return Err(VfsError::NotFound);
            }

            let mut mounts = self.namespace.write();
            let mp = self.resolve_in(&mounts, &path, LookupFlags::MOUNT_POINT, None)?;
            let root = match mounts.lookup(&mp.triplet) {
                Some(root) => root,
                None => {
                    log::debug!("unmount: {:?} is not a mount point", path.as_str());
                    return Err(VfsError::InvalidArgument);
                },
            };
            if mounts.is_busy(root.triplet.pair()) {
                log::debug!("unmount: {:?} has nested mounts", path.as_str());
                return Err(VfsError::InvalidArgument);
            }
            mounts.remove(&mp.triplet).ok_or(VfsError::InvalidArgument)?
        };

        if let Err(e) = self.notify(&entry.mount_point, &entry.root, true) {
            log::warn!(
                "Unmounting {:?} from {:?} refused by {:?}: {}",
                entry.root.triplet(),
                entry.mount_point.triplet(),
                self.registry.name_of(entry.mount_point.triplet().fs_handle),
                e
            );
            let mut mounts = self.namespace.write();
            if let Err(entry) = mounts.insert(entry.mount_point, entry.root) {
                drop(mounts);
                log::warn!(
                    "Mount point {:?} was reused during unmount",
                    entry.mount_point.triplet()
                );
                self.nodes.release(entry.root);
                self.nodes.release(entry.mount_point);
            }
            return Err(e);
        }

        self.nodes.release(entry.root);
        self.nodes.release(entry.mount_point);
        Ok(())
    }

    /// Sends both halves of a (un)mount notification to the server
    /// owning the mount point, and waits for both answers
    fn notify(&self, mount_point: &NodeRef, root: &NodeRef, unmount: bool) -> VfsResult<()> {
        let mp = mount_point.triplet();
        let root = root.triplet();
        let (first, second) = if unmount {
            (
                PeerRequest::UnmountPoint {
                    dev: mp.dev_handle,
                    index: mp.index,
                },
                PeerRequest::UnmountedRoot { root },
            )
        } else {
            (
                PeerRequest::MountPoint {
                    dev: mp.dev_handle,
                    index: mp.index,
                },
                PeerRequest::MountedRoot { root },
            )
        };

        let req1 = self.transport.send(mp.fs_handle, first);
        let req2 = self.transport.send(mp.fs_handle, second);
        let rc1 = wait_done(&self.transport, req1);
        let rc2 = wait_done(&self.transport, req2);
        first_failure(rc1, rc2)
    }
}
