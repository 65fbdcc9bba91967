//! Secret-file detection.
//!
//! Pattern-matches filename and extension conventions for key material,
//! credential stores, and environment files. A match blocks read access even
//! when the surrounding path is otherwise permitted.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Filename patterns that mark a file as secret material.
static SECRET_FILENAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // SSH private keys (public halves are fine).
        r"^id_(rsa|dsa|ecdsa|ed25519)$",
        // Key material by extension.
        r"(?i)\.(pem|key|p12|pfx|jks|keystore|asc|gpg|kdbx)$",
        // Environment files: .env, .env.production, production.env ...
        r"(?i)^\.env(\..+)?$",
        r"(?i)\.env$",
        // Credential stores and auth caches.
        r"(?i)^(credentials|credentials\.json|service[-_]account\.json)$",
        r"(?i)^\.(netrc|pgpass|my\.cnf|htpasswd)$",
        r"(?i)^(secrets?|token)\.(json|ya?ml|toml|txt)$",
        // System password databases.
        r"^(shadow|gshadow|shadow-|gshadow-)$",
        // Shell history can hold pasted secrets.
        r"(?i)^\.(bash|zsh|sh)_history$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("secret pattern must compile"))
    .collect()
});

/// Directory components that mark everything beneath them as secret.
const SECRET_DIR_COMPONENTS: &[&str] = &[".ssh", ".gnupg", ".aws", ".kube", ".docker"];

/// Returns `true` when the path names a file that matches known secret
/// filename or extension conventions, or sits under a credential directory.
pub fn is_secret_file(path: &str) -> bool {
    let p = Path::new(path);

    for component in p.components() {
        if let Some(name) = component.as_os_str().to_str() {
            if SECRET_DIR_COMPONENTS.contains(&name) {
                return true;
            }
        }
    }

    let Some(file_name) = p.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    SECRET_FILENAME_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_private_keys() {
        assert!(is_secret_file("/home/ops/.ssh/id_rsa"));
        assert!(is_secret_file("/backup/id_ed25519"));
        // Public halves outside a secret dir are fine.
        assert!(!is_secret_file("/backup/id_rsa.pub.txt"));
    }

    #[test]
    fn test_key_extensions() {
        assert!(is_secret_file("/etc/ssl/private/server.pem"));
        assert!(is_secret_file("/opt/app/signing.KEY"));
        assert!(is_secret_file("/data/vault.kdbx"));
    }

    #[test]
    fn test_env_files() {
        assert!(is_secret_file("/srv/app/.env"));
        assert!(is_secret_file("/srv/app/.env.production"));
        assert!(is_secret_file("/srv/app/production.env"));
        assert!(!is_secret_file("/srv/app/environment.md"));
    }

    #[test]
    fn test_credential_stores() {
        assert!(is_secret_file("/home/ops/.aws/credentials"));
        assert!(is_secret_file("/home/ops/.netrc"));
        assert!(is_secret_file("/opt/app/secrets.yaml"));
        assert!(is_secret_file("/opt/app/token.json"));
    }

    #[test]
    fn test_shadow_but_not_passwd() {
        assert!(is_secret_file("/etc/shadow"));
        assert!(is_secret_file("/etc/gshadow"));
        assert!(!is_secret_file("/etc/passwd"));
    }

    #[test]
    fn test_secret_directories_cover_everything_below() {
        assert!(is_secret_file("/home/ops/.ssh/known_hosts"));
        assert!(is_secret_file("/home/ops/.gnupg/pubring.kbx"));
        assert!(is_secret_file("/root/.kube/config"));
    }

    #[test]
    fn test_ordinary_files_pass() {
        assert!(!is_secret_file("/var/log/syslog"));
        assert!(!is_secret_file("/srv/app/config.toml"));
        assert!(!is_secret_file("/home/ops/notes.txt"));
    }

    #[test]
    fn test_shell_history() {
        assert!(is_secret_file("/home/ops/.bash_history"));
    }
}
