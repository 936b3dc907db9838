use serde::{Deserialize, Serialize};

use crate::error::{VfsError, VfsResult};

/// Longest accepted file system driver name, in bytes
pub const FS_NAME_MAXLEN: usize = 20;

/// Longest accepted path, in bytes
pub const MAX_PATH_LEN: usize = 64 * 1024;

static_assertions::const_assert!(FS_NAME_MAXLEN > 0);
static_assertions::const_assert!(FS_NAME_MAXLEN <= MAX_PATH_LEN);

/// Switch configuration.
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Maximum driver name length
    pub fs_name_max: usize,
    /// Maximum path length
    pub path_max: usize,
    /// Maximum number of cached nodes, unlimited if None.
    /// Acquiring a new node past this fails with out-of-memory.
    pub node_limit: Option<usize>,
}
impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            fs_name_max: FS_NAME_MAXLEN,
            path_max: MAX_PATH_LEN,
            node_limit: None,
        }
    }
}
impl VfsConfig {
    /// Parses a JSON configuration file
    pub fn from_json(data: &[u8]) -> VfsResult<Self> {
        let config: Self = serde_json::from_slice(data).map_err(|e| {
            log::warn!("Invalid VFS configuration: {}", e);
            VfsError::InvalidArgument
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VfsResult<()> {
        if self.fs_name_max == 0 || self.path_max == 0 || self.fs_name_max > self.path_max {
            log::warn!("Invalid VFS limits: {:?}", self);
            return Err(VfsError::InvalidArgument);
        }
        if self.node_limit == Some(0) {
            log::warn!("Invalid VFS node limit: zero");
            return Err(VfsError::InvalidArgument);
        }
        Ok(())
    }

    pub(crate) fn check_name_len(&self, len: usize) -> VfsResult<()> {
        if len < 1 || len > self.fs_name_max {
            Err(VfsError::InvalidArgument)
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_path_len(&self, len: usize) -> VfsResult<()> {
        if len < 1 || len > self.path_max {
            Err(VfsError::InvalidArgument)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_json() {
        let config = VfsConfig::from_json(br#"{"node_limit": 64}"#).unwrap();
        assert_eq!(config.fs_name_max, FS_NAME_MAXLEN);
        assert_eq!(config.path_max, MAX_PATH_LEN);
        assert_eq!(config.node_limit, Some(64));

        let config = VfsConfig::from_json(br#"{"fs_name_max": 8, "path_max": 256}"#).unwrap();
        assert_eq!(config.fs_name_max, 8);
        assert_eq!(config.path_max, 256);
        assert_eq!(config.node_limit, None);
    }

    #[test]
    fn test_invalid() {
        assert_eq!(
            VfsConfig::from_json(b"not json"),
            Err(VfsError::InvalidArgument)
        );
        assert_eq!(
            VfsConfig::from_json(br#"{"path_max": 0}"#),
            Err(VfsError::InvalidArgument)
        );
        assert_eq!(
            VfsConfig::from_json(br#"{"fs_name_max": 100, "path_max": 10}"#),
            Err(VfsError::InvalidArgument)
        );
        assert_eq!(
            VfsConfig::from_json(br#"{"node_limit": 0}"#),
            Err(VfsError::InvalidArgument)
        );
    }

    #[test]
    fn test_length_bounds() {
        let config = VfsConfig::default();
        assert!(config.check_name_len(0).is_err());
        assert!(config.check_name_len(1).is_ok());
        assert!(config.check_name_len(FS_NAME_MAXLEN).is_ok());
        assert!(config.check_name_len(FS_NAME_MAXLEN + 1).is_err());
        assert!(config.check_path_len(0).is_err());
        assert!(config.check_path_len(MAX_PATH_LEN).is_ok());
        assert!(config.check_path_len(MAX_PATH_LEN + 1).is_err());
    }
}
