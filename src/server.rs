//! # Client entry points
//!
//! Clients pass names and paths as variable-length data writes:
//! the switch first learns the announced size of each write,
//! checks it, and only then allocates a buffer and accepts the data.
//!
//! Calls themselves arrive as `VfsCall` messages and are answered
//! with a `VfsAnswer` carrying the status code.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::error::{code, status_code, VfsError, VfsResult};
use crate::transport::Transport;
use crate::triplet::{DevHandle, FsHandle, LookupResult};
use crate::vfs::Vfs;

/// Two-phase receive of client data
pub trait DataWrite {
    type Handle;

    /// Waits for the client to start a data write.
    /// Returns None if the client sent something else.
    fn begin_receive(&mut self) -> Option<(Self::Handle, usize)>;

    /// Accepts the write, copying the data into `buf`
    fn finalize(&mut self, handle: Self::Handle, buf: &mut [u8]) -> VfsResult<()>;

    /// Refuses the write
    fn reject(&mut self, handle: Self::Handle, error: VfsError);
}

fn receive_bytes<C: DataWrite>(caller: &mut C, max_len: usize) -> VfsResult<Vec<u8>> {
    let (handle, size) = caller.begin_receive().ok_or(VfsError::InvalidArgument)?;

    if size < 1 || size > max_len {
        caller.reject(handle, VfsError::InvalidArgument);
        return Err(VfsError::InvalidArgument);
    }

    let mut buf = Vec::new();
    if buf.try_reserve_exact(size).is_err() {
        caller.reject(handle, VfsError::OutOfMemory);
        return Err(VfsError::OutOfMemory);
    }
    buf.resize(size, 0);
    caller.finalize(handle, &mut buf)?;
    Ok(buf)
}

fn receive_string<C: DataWrite>(caller: &mut C, max_len: usize) -> VfsResult<String> {
    let bytes = receive_bytes(caller, max_len)?;
    String::from_utf8(bytes).map_err(|_| VfsError::InvalidArgument)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VfsCall {
    /// Register a driver. Data: driver name.
    Register,
    /// Mount a device. Data: driver name, then mount point path.
    Mount { dev: DevHandle },
    /// Unmount. Data: mount point path.
    Unmount,
    /// Resolve a path without pinning the node. Data: path.
    Resolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerValue {
    Fs(FsHandle),
    Node(LookupResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfsAnswer {
    pub status: i32,
    pub value: Option<AnswerValue>,
}
impl VfsAnswer {
    fn from_result(result: VfsResult<Option<AnswerValue>>) -> Self {
        Self {
            status: status_code(&result),
            value: result.unwrap_or(None),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == code::OK
    }
}

impl<T: Transport> Vfs<T> {
    pub fn handle_register<C: DataWrite>(&self, caller: &mut C) -> VfsResult<FsHandle> {
        let name = receive_string(caller, self.config.fs_name_max)?;
        self.registry.register(&name)
    }

    pub fn handle_mount<C: DataWrite>(&self, dev: DevHandle, caller: &mut C) -> VfsResult<()> {
        let fs_name = receive_string(caller, self.config.fs_name_max)?;
        let path = receive_string(caller, self.config.path_max)?;
        self.mount(dev, &fs_name, &path)
    }

    pub fn handle_unmount<C: DataWrite>(&self, caller: &mut C) -> VfsResult<()> {
        let path = receive_string(caller, self.config.path_max)?;
        self.unmount(&path)
    }

    pub fn handle_resolve<C: DataWrite>(&self, caller: &mut C) -> VfsResult<LookupResult> {
        let path = receive_string(caller, self.config.path_max)?;
        self.resolve(&path, None)
    }

    /// Handles one encoded `VfsCall`, returning the encoded `VfsAnswer`
    pub fn handle_call<C: DataWrite>(&self, message: &[u8], caller: &mut C) -> VfsResult<Vec<u8>> {
        let result = match pinecone::from_bytes::<VfsCall>(message) {
            Ok(call) => {
                log::trace!("VFS call {:?}", call);
                match call {
                    VfsCall::Register => self
                        .handle_register(caller)
                        .map(|fs| Some(AnswerValue::Fs(fs))),
                    VfsCall::Mount { dev } => self.handle_mount(dev, caller).map(|()| None),
                    VfsCall::Unmount => self.handle_unmount(caller).map(|()| None),
                    VfsCall::Resolve => self
                        .handle_resolve(caller)
                        .map(|node| Some(AnswerValue::Node(node))),
                }
            },
            Err(_) => {
                log::warn!("Malformed VFS call ({} bytes)", message.len());
                Err(VfsError::InvalidArgument)
            },
        };
        pinecone::to_vec(&VfsAnswer::from_result(result)).map_err(|_| VfsError::OutOfMemory)
    }
}
