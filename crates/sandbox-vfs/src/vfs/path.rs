//! Mount-scoped virtual paths.
//!
//! A [`VirtualPath`] is an immutable, normalized sequence of segments bound to
//! one [`Mount`]. All structural operations here are pure: they never touch the
//! real filesystem. Translation to a real path lives on [`Mount`].
//!
//! ## Normalization
//!
//! Components are processed left to right:
//!
//! - empty components (from `//`) and `.` are dropped
//! - `..` pops the previous retained segment unless that segment is itself `..`
//! - on an absolute path, a `..` with nothing to pop is dropped, so ascending
//!   above `/` is absorbed (`/../../x` is `/x`)
//! - on a relative path, an unpoppable `..` is kept (`../x` stays `../x`)

use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::mount::Mount;

const PARENT: &str = "..";
const CURRENT: &str = ".";

/// Normalize a raw component sequence.
///
/// This is the single normalization rule for virtual paths; see the module
/// docs for the exact semantics. A component containing `/` is split first,
/// so `["a/../b"]` normalizes the same as `["a", "..", "b"]`.
pub fn normalize<I, S>(absolute: bool, components: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let components: Vec<S> = components.into_iter().collect();
    let mut out: Vec<OsString> = Vec::new();
    for component in components.iter().flat_map(|c| split(c.as_ref()).1) {
        if component.is_empty() || component == CURRENT {
            continue;
        }
        if component == PARENT {
            if out.last().is_some_and(|last| last != PARENT) {
                out.pop();
            } else if !absolute {
                out.push(OsString::from(PARENT));
            }
            // Rooted: ascending past `/` is absorbed.
            continue;
        }
        out.push(component.to_os_string());
    }
    out
}

/// Split a raw path string on `/`. Returns `(absolute, components)`.
fn split(raw: &OsStr) -> (bool, impl Iterator<Item = &OsStr>) {
    let bytes = raw.as_bytes();
    let absolute = bytes.first() == Some(&b'/');
    let parts = bytes.split(|b| *b == b'/').map(OsStr::from_bytes);
    (absolute, parts)
}

/// An immutable path in a mount's confined namespace.
///
/// Two paths are equal iff they belong to the same mount and have the same
/// absoluteness and normalized segments. The real root never takes part in
/// comparison, ordering, hashing or display.
#[derive(Clone)]
pub struct VirtualPath {
    mount: Arc<Mount>,
    absolute: bool,
    segments: Vec<OsString>,
}

impl VirtualPath {
    /// Parse `path` under `mount`. A leading `/` makes it absolute.
    pub fn new(mount: Arc<Mount>, path: impl AsRef<OsStr>) -> Self {
        let (absolute, parts) = split(path.as_ref());
        let segments = normalize(absolute, parts);
        Self {
            mount,
            absolute,
            segments,
        }
    }

    /// Build a path from raw components, normalizing them.
    ///
    /// Components may contain `/`; absoluteness comes from `absolute` alone.
    pub fn from_segments<I, S>(mount: Arc<Mount>, absolute: bool, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            mount,
            absolute,
            segments: normalize(absolute, components),
        }
    }

    /// The virtual root `/` of `mount`.
    pub fn root(mount: Arc<Mount>) -> Self {
        Self {
            mount,
            absolute: true,
            segments: Vec::new(),
        }
    }

    /// Already-normalized segments; skips renormalization.
    fn with_segments(&self, absolute: bool, segments: Vec<OsString>) -> Self {
        Self {
            mount: Arc::clone(&self.mount),
            absolute,
            segments,
        }
    }

    /// The owning mount.
    pub fn mount(&self) -> &Arc<Mount> {
        &self.mount
    }

    /// Whether the path is rooted at `/`.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// True for `/`.
    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    /// Normalized segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &OsStr> {
        self.segments.iter().map(OsString::as_os_str)
    }

    /// Number of segments (the root itself is not counted).
    pub fn name_count(&self) -> usize {
        self.segments.len()
    }

    /// True if this path belongs to `mount`.
    pub fn belongs_to(&self, mount: &Mount) -> bool {
        self.mount.id() == mount.id()
    }

    fn same_mount(&self, other: &VirtualPath) -> bool {
        self.mount.id() == other.mount.id()
    }

    /// `/` if absolute, else `None`.
    pub fn get_root(&self) -> Option<VirtualPath> {
        self.absolute.then(|| self.with_segments(true, Vec::new()))
    }

    /// Last segment as a single-segment relative path; `None` at the root.
    pub fn file_name(&self) -> Option<VirtualPath> {
        self.segments
            .last()
            .map(|last| self.with_segments(false, vec![last.clone()]))
    }

    /// All but the last segment.
    ///
    /// `/a` has parent `/`; a single-segment relative path and `/` have none.
    pub fn parent(&self) -> Option<VirtualPath> {
        match self.segments.len() {
            0 => None,
            1 if !self.absolute => None,
            n => Some(self.with_segments(self.absolute, self.segments[..n - 1].to_vec())),
        }
    }

    /// Segment `index` as a single-segment relative path.
    pub fn name(&self, index: usize) -> Option<VirtualPath> {
        self.segments
            .get(index)
            .map(|seg| self.with_segments(false, vec![seg.clone()]))
    }

    /// Relative path made of segments `begin..end`.
    pub fn subpath(&self, begin: usize, end: usize) -> Option<VirtualPath> {
        if begin >= end || end > self.segments.len() {
            return None;
        }
        Some(self.with_segments(false, self.segments[begin..end].to_vec()))
    }

    /// Segment-wise prefix test. Always false across mounts.
    pub fn starts_with(&self, other: &VirtualPath) -> bool {
        self.same_mount(other)
            && self.absolute == other.absolute
            && self.segments.starts_with(&other.segments)
    }

    /// Segment-wise suffix test. Always false across mounts.
    ///
    /// An absolute `other` only matches the whole path.
    pub fn ends_with(&self, other: &VirtualPath) -> bool {
        if !self.same_mount(other) {
            return false;
        }
        if other.absolute {
            return self.absolute && self.segments == other.segments;
        }
        if other.segments.is_empty() {
            return !self.absolute && self.segments.is_empty();
        }
        self.segments.ends_with(&other.segments)
    }

    /// Resolve `other` against this path.
    ///
    /// An absolute `other` replaces the base. `other`'s segments are always
    /// re-bound to this path's mount.
    pub fn resolve(&self, other: &VirtualPath) -> VirtualPath {
        if other.absolute {
            return self.with_segments(true, other.segments.clone());
        }
        let joined = normalize(self.absolute, self.segments.iter().chain(&other.segments));
        self.with_segments(self.absolute, joined)
    }

    /// Resolve a raw string against this path.
    pub fn join(&self, other: impl AsRef<OsStr>) -> VirtualPath {
        let (absolute, parts) = split(other.as_ref());
        if absolute {
            return self.with_segments(true, normalize(true, parts));
        }
        let joined = normalize(
            self.absolute,
            self.segments.iter().map(OsString::as_os_str).chain(parts),
        );
        self.with_segments(self.absolute, joined)
    }

    /// The relative path that leads from this path to `other`.
    ///
    /// Both must share a mount and absoluteness; otherwise `InvalidArgument`.
    pub fn relativize(&self, other: &VirtualPath) -> VfsResult<VirtualPath> {
        if !self.same_mount(other) {
            return Err(VfsError::invalid_argument(format!(
                "cannot relativize {} against a path on another mount",
                other
            )));
        }
        if self.absolute != other.absolute {
            return Err(VfsError::invalid_argument(format!(
                "cannot relativize {} against {}: absoluteness differs",
                other, self
            )));
        }

        let common = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(a, b)| a == b)
            .count();

        let ups = std::iter::repeat_n(OsStr::new(PARENT), self.segments.len() - common);
        let rest = other.segments[common..].iter().map(OsString::as_os_str);
        Ok(self.with_segments(false, normalize(false, ups.chain(rest))))
    }

    /// Identity if absolute, otherwise resolved against `/`.
    pub fn to_absolute(&self) -> VirtualPath {
        if self.absolute {
            return self.clone();
        }
        self.with_segments(true, normalize(true, &self.segments))
    }

    /// One single-segment relative path per segment.
    pub fn iter(&self) -> impl Iterator<Item = VirtualPath> + '_ {
        self.segments
            .iter()
            .map(|seg| self.with_segments(false, vec![seg.clone()]))
    }

    /// Segments joined with the platform separator, no leading `/`.
    ///
    /// This is what gets appended to a mount's real root.
    pub(crate) fn relative_real(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute && self.segments.is_empty() {
            return f.write_str("/");
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 || self.absolute {
                f.write_str("/")?;
            }
            f.write_str(&seg.to_string_lossy())?;
        }
        Ok(())
    }
}

impl fmt::Debug for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualPath")
            .field("mount", &self.mount.id())
            .field("path", &self.to_string())
            .finish()
    }
}

impl PartialEq for VirtualPath {
    fn eq(&self, other: &Self) -> bool {
        self.same_mount(other) && self.absolute == other.absolute && self.segments == other.segments
    }
}

impl Eq for VirtualPath {}

impl Hash for VirtualPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mount.id().hash(state);
        self.absolute.hash(state);
        self.segments.hash(state);
    }
}

impl PartialOrd for VirtualPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mount
            .id()
            .cmp(&other.mount.id())
            .then(self.absolute.cmp(&other.absolute))
            .then_with(|| self.segments.cmp(&other.segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (Arc<Mount>, TempDir) {
        let dir = TempDir::new().unwrap();
        let mount = Mount::new(dir.path(), false).unwrap();
        (mount, dir)
    }

    fn names(raw: &str) -> Vec<String> {
        let (absolute, parts) = split(OsStr::new(raw));
        normalize(absolute, parts)
            .into_iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_normalize_absorbs_above_root() {
        assert_eq!(names("/../../a/b"), names("/a/b"));
        assert_eq!(names("/../.."), Vec::<String>::new());
        assert_eq!(names("/a/../../b"), vec!["b"]);
    }

    #[test]
    fn test_normalize_keeps_relative_parents() {
        assert_eq!(names("../x"), vec!["..", "x"]);
        assert_eq!(names("../../x/.."), vec!["..", ".."]);
        assert_eq!(names("a/../.."), vec![".."]);
    }

    #[test]
    fn test_normalize_drops_dots_and_empties() {
        assert_eq!(names("//a/./b///c/."), vec!["a", "b", "c"]);
        assert_eq!(names(""), Vec::<String>::new());
    }

    #[test]
    fn test_from_segments_splits_components() {
        let (m, _dir) = setup();
        let p = m.path_from_segments(true, ["a/b"]);
        assert_eq!(p, m.path("/a/b"));
        assert_eq!(p.name_count(), 2);

        let p = m.path_from_segments(true, ["/etc"]);
        assert_eq!(p.to_string(), "/etc");
        assert_eq!(m.path(p.to_string()), p);

        let p = m.path_from_segments(true, ["a/../../b.txt"]);
        assert_eq!(p, m.path("/b.txt"));
        assert_eq!(m.translate(&p).unwrap(), m.real_root().join("b.txt"));

        let p = m.path_from_segments(false, ["x", "../../y"]);
        assert_eq!(p.to_string(), "../y");
    }

    #[test]
    fn test_display() {
        let (m, _dir) = setup();
        assert_eq!(m.path("/").to_string(), "/");
        assert_eq!(m.path("/a//b/").to_string(), "/a/b");
        assert_eq!(m.path("a/b").to_string(), "a/b");
        assert_eq!(m.path("").to_string(), "");
        assert_eq!(m.path("/../../etc/passwd").to_string(), "/etc/passwd");
    }

    #[test]
    fn test_root_and_file_name() {
        let (m, _dir) = setup();
        let p = m.path("/a/b.txt");
        assert_eq!(p.get_root().unwrap(), m.root_path());
        assert_eq!(p.file_name().unwrap().to_string(), "b.txt");
        assert!(m.path("a").get_root().is_none());
        assert!(m.root_path().file_name().is_none());
    }

    #[test]
    fn test_parent() {
        let (m, _dir) = setup();
        assert_eq!(m.path("/a/b").parent().unwrap(), m.path("/a"));
        assert_eq!(m.path("/a").parent().unwrap(), m.root_path());
        assert!(m.root_path().parent().is_none());
        assert!(m.path("a").parent().is_none());
        assert_eq!(m.path("a/b").parent().unwrap(), m.path("a"));
    }

    #[test]
    fn test_name_and_subpath() {
        let (m, _dir) = setup();
        let p = m.path("/a/b/c");
        assert_eq!(p.name_count(), 3);
        assert_eq!(p.name(1).unwrap(), m.path("b"));
        assert!(p.name(3).is_none());
        assert_eq!(p.subpath(1, 3).unwrap(), m.path("b/c"));
        assert!(p.subpath(2, 2).is_none());
        assert!(p.subpath(0, 4).is_none());
    }

    #[test]
    fn test_starts_and_ends_with() {
        let (m, _dir) = setup();
        let p = m.path("/a/b/c");
        assert!(p.starts_with(&m.path("/a/b")));
        assert!(p.starts_with(&m.root_path()));
        assert!(!p.starts_with(&m.path("a/b")));
        assert!(!p.starts_with(&m.path("/a/bc")));

        assert!(p.ends_with(&m.path("b/c")));
        assert!(p.ends_with(&m.path("/a/b/c")));
        assert!(!p.ends_with(&m.path("/b/c")));
        assert!(!p.ends_with(&m.path("")));
    }

    #[test]
    fn test_cross_mount_comparisons_are_false() {
        let (m1, _d1) = setup();
        let (m2, _d2) = setup();
        let a = m1.path("/a/b");
        let b = m2.path("/a/b");
        assert_ne!(a, b);
        assert!(!a.starts_with(&b));
        assert!(!a.ends_with(&m2.path("b")));
    }

    #[test]
    fn test_resolve() {
        let (m, _dir) = setup();
        let base = m.path("/a/b");
        assert_eq!(base.resolve(&m.path("c")), m.path("/a/b/c"));
        assert_eq!(base.resolve(&m.path("../c")), m.path("/a/c"));
        assert_eq!(base.resolve(&m.path("../../../c")), m.path("/c"));
        assert_eq!(base.resolve(&m.path("/x")), m.path("/x"));
        assert_eq!(base.join("c/./d"), m.path("/a/b/c/d"));
        assert_eq!(base.join("/y"), m.path("/y"));
    }

    #[test]
    fn test_resolve_rebinds_foreign_segments() {
        let (m1, _d1) = setup();
        let (m2, _d2) = setup();
        let resolved = m1.path("/a").resolve(&m2.path("b"));
        assert!(resolved.belongs_to(&m1));
        assert_eq!(resolved, m1.path("/a/b"));
    }

    #[test]
    fn test_relativize() {
        let (m, _dir) = setup();
        let a = m.path("/a/b");
        assert_eq!(a.relativize(&m.path("/a/b/c/d")).unwrap(), m.path("c/d"));
        assert_eq!(a.relativize(&m.path("/a/x")).unwrap(), m.path("../x"));
        assert_eq!(a.relativize(&m.path("/a/b")).unwrap(), m.path(""));
        assert_eq!(m.path("a").relativize(&m.path("b")).unwrap(), m.path("../b"));
    }

    #[test]
    fn test_relativize_errors() {
        let (m1, _d1) = setup();
        let (m2, _d2) = setup();
        let err = m1.path("/a").relativize(&m2.path("/a/b")).unwrap_err();
        assert!(matches!(err, VfsError::InvalidArgument(_)));

        let err = m1.path("/a").relativize(&m1.path("a/b")).unwrap_err();
        assert!(matches!(err, VfsError::InvalidArgument(_)));
    }

    #[test]
    fn test_resolve_relativize_inverse() {
        let (m, _dir) = setup();
        let base = m.path("/x/y");
        let q = m.path("p/q");
        assert_eq!(base.relativize(&base.resolve(&q)).unwrap(), q);

        let target = m.path("/x/z/w");
        assert_eq!(base.resolve(&base.relativize(&target).unwrap()), target);
    }

    #[test]
    fn test_to_absolute() {
        let (m, _dir) = setup();
        let abs = m.path("a/b").to_absolute();
        assert_eq!(abs, m.path("/a/b"));
        assert_eq!(abs.to_absolute(), abs);
        assert_eq!(m.path("../../a").to_absolute(), m.path("/a"));
    }

    #[test]
    fn test_iter_is_restartable() {
        let (m, _dir) = setup();
        let p = m.path("/a/b/c");
        let first: Vec<String> = p.iter().map(|s| s.to_string()).collect();
        let second: Vec<String> = p.iter().map(|s| s.to_string()).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
        assert!(p.iter().all(|s| !s.is_absolute() && s.name_count() == 1));
    }

    #[test]
    fn test_ordering_and_hash() {
        use std::collections::HashSet;

        let (m, _dir) = setup();
        let mut paths = vec![m.path("/b"), m.path("/a/c"), m.path("/a")];
        paths.sort();
        let shown: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(shown, vec!["/a", "/a/c", "/b"]);

        let set: HashSet<_> = [m.path("/a/./b"), m.path("/a/b")].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
