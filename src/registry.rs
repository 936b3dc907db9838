//! Registered file system drivers

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use spin::Mutex;

use crate::error::{VfsError, VfsResult};
use crate::triplet::FsHandle;

#[derive(Debug)]
struct FsInfo {
    handle: FsHandle,
    name: String,
}

#[derive(Debug)]
struct Drivers {
    list: Vec<FsInfo>,
    next_handle: FsHandle,
}
impl Drivers {
    fn find(&self, name: &str) -> Option<FsHandle> {
        self.list
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.handle)
    }

    fn insert(&mut self, name: &str) -> VfsResult<FsHandle> {
        self.list.try_reserve(1)?;
        let handle = self.next_handle;
        self.next_handle = self.next_handle.next();
        self.list.push(FsInfo {
            handle,
            name: name.to_owned(),
        });
        log::debug!("Registered file system {:?} as {:?}", name, handle);
        Ok(handle)
    }
}

#[derive(Debug)]
pub struct FsRegistry {
    drivers: Mutex<Drivers>,
    name_max: usize,
}
impl FsRegistry {
    pub fn new(name_max: usize) -> Self {
        Self {
            drivers: Mutex::new(Drivers {
                list: Vec::new(),
                next_handle: FsHandle::first(),
            }),
            name_max,
        }
    }

    /// Driver names are short lowercase identifiers
    fn name_sane(&self, name: &str) -> bool {
        !name.is_empty()
            && name.len() <= self.name_max
            && name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
    }

    /// Registers a new driver. Names must be unique.
    pub fn register(&self, name: &str) -> VfsResult<FsHandle> {
        if !self.name_sane(name) {
            log::warn!("Refusing to register file system with name {:?}", name);
            return Err(VfsError::InvalidArgument);
        }

        let mut drivers = self.drivers.lock();
        if drivers.find(name).is_some() {
            log::warn!("File system {:?} is already registered", name);
            return Err(VfsError::InvalidArgument);
        }
        drivers.insert(name)
    }

    /// Translates a driver name to its handle.
    /// Unknown names are registered on the spot if `register_if_absent` is set.
    pub fn name_to_handle(&self, name: &str, register_if_absent: bool) -> Option<FsHandle> {
        let mut drivers = self.drivers.lock();
        if let Some(handle) = drivers.find(name) {
            return Some(handle);
        }
        if register_if_absent && self.name_sane(name) {
            drivers.insert(name).ok()
        } else {
            None
        }
    }

    pub fn name_of(&self, handle: FsHandle) -> Option<String> {
        self.drivers
            .lock()
            .list
            .iter()
            .find(|info| info.handle == handle)
            .map(|info| info.name.clone())
    }
}
