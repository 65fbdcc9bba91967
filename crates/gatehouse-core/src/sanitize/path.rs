//! Filesystem path vetting.
//!
//! Canonicalization here is purely lexical: `.` and `..` components are
//! resolved without touching the filesystem, so the checker stays pure and a
//! symlink on disk cannot smuggle a rejected component back in after the
//! check. Root confinement and the protected-path list are applied to the
//! resolved form.

use std::path::{Component, Path, PathBuf};

use super::Verdict;

/// Directories whose contents the gateway never exposes, regardless of tier.
///
/// System configuration, kernel/process interfaces, raw devices, and
/// credential stores.
const PROTECTED_PATHS: &[&str] = &[
    "/etc",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/var/lib",
    "/root/.ssh",
    "/root/.gnupg",
    "/root/.aws",
];

/// Result of a path check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCheck {
    pub verdict: Verdict,
    /// The canonical absolute form, present only when the verdict is safe.
    pub resolved: Option<PathBuf>,
}

impl PathCheck {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::rejected(reason),
            resolved: None,
        }
    }

    fn safe(resolved: PathBuf) -> Self {
        Self {
            verdict: Verdict::Safe,
            resolved: Some(resolved),
        }
    }

    /// Returns `true` when the path passed every check.
    pub fn is_safe(&self) -> bool {
        self.verdict.is_safe()
    }
}

/// Resolve `.` and `..` lexically against an absolute path.
///
/// `..` at the root stays at the root, mirroring POSIX resolution of `/..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push("/"),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
                if out.as_os_str().is_empty() {
                    out.push("/");
                }
            }
            Component::Normal(part) => out.push(part),
            Component::Prefix(_) => {}
        }
    }
    if out.as_os_str().is_empty() {
        out.push("/");
    }
    out
}

/// Vet a filesystem path.
///
/// The path must be absolute, or relative with an `allowed_root` to anchor
/// it. After lexical canonicalization the result must stay inside
/// `allowed_root` (when given) and outside the protected-path list.
/// Idempotent: feeding a returned `resolved` path back in yields the same
/// resolution.
pub fn check_path(path: &str, allowed_root: Option<&Path>) -> PathCheck {
    if path.is_empty() {
        return PathCheck::rejected("empty path");
    }
    if path.contains('\0') {
        return PathCheck::rejected("path contains a null byte");
    }

    let raw = Path::new(path);
    let anchored = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        match allowed_root {
            Some(root) => root.join(raw),
            None => return PathCheck::rejected("relative path without an allowed root"),
        }
    };
    let resolved = normalize(&anchored);

    if let Some(root) = allowed_root {
        let root = normalize(root);
        if !resolved.starts_with(&root) {
            return PathCheck::rejected(format!(
                "path escapes allowed root {}",
                root.display()
            ));
        }
    }

    for protected in PROTECTED_PATHS {
        let protected = Path::new(protected);
        if resolved == protected || resolved.starts_with(protected) {
            return PathCheck::rejected(format!(
                "path is under protected location {}",
                protected.display()
            ));
        }
    }

    PathCheck::safe(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_absolute_path() {
        let check = check_path("/var/log/syslog", None);
        assert!(check.is_safe());
        assert_eq!(check.resolved.unwrap(), PathBuf::from("/var/log/syslog"));
    }

    #[test]
    fn test_normalizes_dot_components() {
        let check = check_path("/var/./log/../log/syslog", None);
        assert!(check.is_safe());
        assert_eq!(check.resolved.unwrap(), PathBuf::from("/var/log/syslog"));
    }

    #[test]
    fn test_traversal_outside_root_rejected() {
        let root = Path::new("/allowed/root");
        let check = check_path("/allowed/root/../../etc/passwd", Some(root));
        assert!(!check.is_safe());
        assert!(check.verdict.reason().unwrap().contains("escapes"));
    }

    #[test]
    fn test_relative_anchored_to_root() {
        let root = Path::new("/srv/data");
        let check = check_path("reports/latest.json", Some(root));
        assert!(check.is_safe());
        assert_eq!(
            check.resolved.unwrap(),
            PathBuf::from("/srv/data/reports/latest.json")
        );
    }

    #[test]
    fn test_relative_without_root_rejected() {
        assert!(!check_path("reports/latest.json", None).is_safe());
    }

    #[test]
    fn test_protected_paths_rejected() {
        for p in [
            "/etc/shadow",
            "/etc",
            "/root/../etc/shadow",
            "/proc/1/environ",
            "/dev/sda",
            "/root/.ssh/id_rsa",
            "/var/lib/pve-cluster/config.db",
        ] {
            assert!(!check_path(p, None).is_safe(), "expected reject: {p}");
        }
    }

    #[test]
    fn test_traversal_into_protected_rejected() {
        // Lexical resolution happens before the protected check, so dressing
        // the path up with `..` does not help.
        let check = check_path("/var/log/../../etc/shadow", None);
        assert!(!check.is_safe());
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let first = check_path("/srv/./data/../data/x.txt", None);
        assert!(first.is_safe());
        let resolved = first.resolved.clone().unwrap();
        let second = check_path(resolved.to_str().unwrap(), None);
        assert_eq!(second.resolved.unwrap(), resolved);
    }

    #[test]
    fn test_root_dotdot_stays_at_root() {
        let check = check_path("/../..", None);
        assert!(check.is_safe());
        assert_eq!(check.resolved.unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn test_empty_and_null_rejected() {
        assert!(!check_path("", None).is_safe());
        assert!(!check_path("/tmp/a\0b", None).is_safe());
    }
}
