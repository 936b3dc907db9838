use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{VfsError, VfsResult};

/// Borrowed absolute path in canonical form:
/// starts with `/`, no empty, `.` or `..` components,
/// and no trailing slash except for the root itself.
#[derive(Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct Path(str);
impl Path {
    fn new_unchecked(s: &str) -> &Self {
        // Safety: Path is a transparent wrapper around str
        unsafe { &*(s as *const str as *const Self) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        &self.0 == "/"
    }

    /// Iterate over the components of the path
    pub fn components(&self) -> Components {
        Components {
            path: &self.0,
            index: 1,
        }
    }
}

/// Owned canonical path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBuf(String);
impl PathBuf {
    /// Canonicalizes a textual path.
    ///
    /// Repeated slashes collapse, `.` components are dropped and `..` removes
    /// the previous component, stopping at the root. Relative, empty and
    /// NUL-containing paths are rejected.
    pub fn canonicalize(raw: &str) -> VfsResult<Self> {
        if !raw.starts_with('/') || raw.contains('\0') {
            return Err(VfsError::InvalidArgument);
        }

        let mut parts: Vec<&str> = Vec::new();
        for c in raw.split('/') {
            match c {
                "" | "." => {},
                ".." => {
                    parts.pop();
                },
                name => parts.push(name),
            }
        }

        let mut result = String::new();
        result
            .try_reserve_exact(raw.len())
            .map_err(|_| VfsError::OutOfMemory)?;
        if parts.is_empty() {
            result.push('/');
        }
        for part in parts {
            result.push('/');
            result.push_str(part);
        }
        Ok(Self(result))
    }
}
impl ::core::ops::Deref for PathBuf {
    type Target = Path;

    fn deref(&self) -> &Path {
        Path::new_unchecked(self.0.as_str())
    }
}

pub struct Components<'a> {
    path: &'a str,
    index: usize,
}
impl<'a> Iterator for Components<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.path.len() {
            return None;
        }

        let end_index = match self.path[self.index..].find('/') {
            Some(i) => self.index + i,
            None => self.path.len(),
        };

        let result = &self.path[self.index..end_index];
        self.index = end_index + 1;
        Some(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn canon(s: &str) -> String {
        PathBuf::canonicalize(s).unwrap().as_str().to_owned()
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canon("/"), "/");
        assert_eq!(canon("//"), "/");
        assert_eq!(canon("/mnt"), "/mnt");
        assert_eq!(canon("/mnt/"), "/mnt");
        assert_eq!(canon("/mnt//data/./x"), "/mnt/data/x");
        assert_eq!(canon("/mnt/data/../x"), "/mnt/x");
        assert_eq!(canon("/../.."), "/");
    }

    #[test]
    fn test_malformed() {
        assert_eq!(PathBuf::canonicalize(""), Err(VfsError::InvalidArgument));
        assert_eq!(PathBuf::canonicalize("mnt"), Err(VfsError::InvalidArgument));
        assert_eq!(PathBuf::canonicalize("/a\0b"), Err(VfsError::InvalidArgument));
    }

    #[test]
    fn test_components() {
        let p = PathBuf::canonicalize("/a/bc/d").unwrap();
        let c: Vec<&str> = p.components().collect();
        assert_eq!(c, vec!["a", "bc", "d"]);

        let root = PathBuf::canonicalize("/").unwrap();
        assert_eq!(root.components().count(), 0);
    }
}
