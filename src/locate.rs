//! Locating the directory of the running executable.
//!
//! Each host family has its own way of asking for the process image path.
//! The strategy is picked at build time by [`platform_resolver`]; when it
//! fails, the configured binary directory is used instead.

use crate::layout::InstallLayout;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// A way of asking the operating system for the running binary's path.
pub trait SelfPathResolver {
    /// Absolute path of the running binary, symlinks resolved where the
    /// platform supports it. `None` when the mechanism is unavailable.
    fn resolve_self_path(&self) -> Option<PathBuf>;
}

/// `/proc`-style self links, tried in order of likelihood.
#[derive(Debug, Clone)]
pub struct ProcSelfLink {
    candidates: Vec<PathBuf>,
}

impl ProcSelfLink {
    /// Resolver over an explicit candidate list.
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }
}

impl Default for ProcSelfLink {
    /// Linux and Cygwin, then Solaris, then FreeBSD.
    fn default() -> Self {
        Self::new(vec![
            PathBuf::from("/proc/self/exe"),
            PathBuf::from("/proc/self/path/a.out"),
            PathBuf::from("/proc/curproc/file"),
        ])
    }
}

impl SelfPathResolver for ProcSelfLink {
    fn resolve_self_path(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find_map(|candidate| resolve_symlinks(candidate))
    }
}

/// The process image query of the host OS (module file name on Windows,
/// pid path on macOS, `KERN_PROC_PATHNAME` on the BSDs).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessImagePath;

impl SelfPathResolver for ProcessImagePath {
    fn resolve_self_path(&self) -> Option<PathBuf> {
        let path = std::env::current_exe().ok()?;
        Some(resolve_symlinks(&path).unwrap_or(path))
    }
}

/// Resolver for the platform this binary was built for.
pub fn platform_resolver() -> Box<dyn SelfPathResolver> {
    #[cfg(any(
        windows,
        target_os = "macos",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    {
        Box::new(ProcessImagePath)
    }
    #[cfg(not(any(
        windows,
        target_os = "macos",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    )))]
    {
        Box::new(ProcSelfLink::default())
    }
}

/// Canonical directory of the running executable.
///
/// The result is absolute, uses `/` as separator and has no trailing file
/// component. This never fails: if `resolver` comes up empty the configured
/// binary directory is resolved instead, and used verbatim if even that
/// does not work.
pub fn locate_executable(resolver: &dyn SelfPathResolver, layout: &InstallLayout) -> String {
    match resolver.resolve_self_path() {
        Some(exe) => strip_file_name(&forward_slashes(&exe)),
        None => {
            warn!("Could not determine executable path, using configured BINDIR.");
            debug!("BINDIR = {}", layout.bindir);
            match resolve_symlinks(Path::new(&layout.bindir)) {
                Some(dir) => forward_slashes(&dir),
                None => layout.bindir.replace('\\', "/"),
            }
        }
    }
}

/// Drop everything after the last `/`.
pub fn strip_file_name(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

fn forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(unix)]
fn resolve_symlinks(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok()
}

// Canonical paths on Windows carry a verbatim prefix the rest of the path
// handling does not expect.
#[cfg(not(unix))]
fn resolve_symlinks(path: &Path) -> Option<PathBuf> {
    fs::metadata(path).ok().map(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<PathBuf>);

    impl SelfPathResolver for Fixed {
        fn resolve_self_path(&self) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    fn layout_with_bindir(bindir: &str) -> InstallLayout {
        InstallLayout {
            bindir: bindir.to_string(),
            ..InstallLayout::default()
        }
    }

    #[test]
    fn test_resolved_binary_loses_file_name() {
        let resolver = Fixed(Some(PathBuf::from("/opt/ocd/bin/openocd")));
        let dir = locate_executable(&resolver, &layout_with_bindir("/usr/local/bin"));
        assert_eq!(dir, "/opt/ocd/bin");
    }

    #[test]
    fn test_backslashes_are_normalized() {
        let resolver = Fixed(Some(PathBuf::from(r"C:\Tools\OpenOCD\bin\openocd.exe")));
        let dir = locate_executable(&resolver, &layout_with_bindir("/bin"));
        assert_eq!(dir, "C:/Tools/OpenOCD/bin");
    }

    #[test]
    fn test_binary_at_root_keeps_root() {
        let resolver = Fixed(Some(PathBuf::from("/openocd")));
        assert_eq!(locate_executable(&resolver, &layout_with_bindir("/bin")), "/");
    }

    #[test]
    fn test_fallback_uses_configured_bindir_verbatim_when_missing() {
        let resolver = Fixed(None);
        let dir = locate_executable(&resolver, &layout_with_bindir("/no/such/prefix/bin"));
        assert_eq!(dir, "/no/such/prefix/bin");
    }

    #[cfg(unix)]
    #[test]
    fn test_fallback_resolves_configured_bindir_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real-bin");
        fs::create_dir(&real).unwrap();
        let link = tmp.path().join("bin");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let dir = locate_executable(&Fixed(None), &layout_with_bindir(&link.to_string_lossy()));

        let expected = fs::canonicalize(&real).unwrap();
        assert_eq!(dir, expected.to_string_lossy());
    }

    #[cfg(unix)]
    #[test]
    fn test_proc_self_link_skips_missing_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("openocd");
        fs::write(&target, b"").unwrap();
        let link = tmp.path().join("self-exe");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let resolver = ProcSelfLink::new(vec![tmp.path().join("missing"), link]);

        assert_eq!(
            resolver.resolve_self_path(),
            Some(fs::canonicalize(&target).unwrap())
        );
    }

    #[test]
    fn test_proc_self_link_with_no_candidates_yields_nothing() {
        assert_eq!(ProcSelfLink::new(Vec::new()).resolve_self_path(), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_platform_resolver_finds_test_binary() {
        let layout = layout_with_bindir("/does/not/matter");
        let dir = locate_executable(platform_resolver().as_ref(), &layout);
        let exe = fs::canonicalize(std::env::current_exe().unwrap()).unwrap();
        assert_eq!(dir, exe.parent().unwrap().to_string_lossy());
    }

    #[test]
    fn test_strip_file_name_without_separator() {
        assert_eq!(strip_file_name("openocd"), ".");
    }
}
