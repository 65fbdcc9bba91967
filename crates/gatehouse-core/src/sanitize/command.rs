//! Shell command vetting.
//!
//! Three layers, checked in order:
//!
//! 1. A deny-list of irrecoverable operations (recursive delete of root,
//!    disk-format utilities, raw device writes, unscoped shutdown). Applies
//!    unconditionally — an active override does not bypass it.
//! 2. Shell-chaining metacharacters (`;`, `&&`, `||`, backticks, `$(`) are
//!    rejected unless the full command matches an explicit allow-listed
//!    pattern.
//! 3. The base command must sit on the primary allow-list, or — when an
//!    override is active — on the secondary override allow-list.

use std::sync::LazyLock;

use regex::Regex;

use super::Verdict;

/// Base commands that may run without any elevation.
///
/// Read-only inspection plus the narrow set of service queries the agent
/// needs for routine health checks.
const ALLOWED_COMMANDS: &[&str] = &[
    "ls", "cat", "head", "tail", "grep", "wc", "stat", "file", "df", "du", "free", "uptime",
    "uname", "hostname", "whoami", "id", "date", "ps", "ip", "ss", "ping", "systemctl",
    "journalctl", "qm", "pct", "docker", "sensors", "smartctl",
];

/// Additional base commands unlocked by an active override.
///
/// Still excludes anything irrecoverable; the deny-list below applies to
/// these too.
const OVERRIDE_ALLOWED_COMMANDS: &[&str] = &[
    "reboot", "kill", "pkill", "mount", "umount", "rm", "mv", "cp", "chmod", "chown", "apt-get",
    "apt", "ip6tables", "iptables",
];

/// Patterns for operations that must never run, override or not.
static DENIED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Recursive delete at or near the filesystem root.
        r"(?i)\brm\s+(-[a-z]*r[a-z]*f[a-z]*|-[a-z]*f[a-z]*r[a-z]*)\s+/(\s|$|\*)",
        r"(?i)\brm\s+(-[a-z]*r[a-z]*f[a-z]*|-[a-z]*f[a-z]*r[a-z]*)\s+--no-preserve-root",
        // Disk-format and partition-table utilities.
        r"(?i)\bmkfs(\.[a-z0-9]+)?\b",
        r"(?i)\bwipefs\b",
        r"(?i)\b(fdisk|parted|sgdisk)\b",
        // Raw writes to block devices.
        r"(?i)\bdd\b.*\bof=/dev/",
        r">\s*/dev/(sd|nvme|vd|hd)",
        // Unscoped host shutdown.
        r"(?i)^\s*(shutdown|poweroff|halt)\b",
        r"(?i)^\s*init\s+0\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("denied pattern must compile"))
    .collect()
});

/// Full-command patterns permitted to contain chaining metacharacters.
///
/// Each pattern anchors the whole command; a pipeline is only allowed when
/// both sides are fixed by the pattern.
static ALLOWED_CHAIN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^systemctl status [A-Za-z0-9@._-]+ \| (head|tail) -n \d{1,3}$",
        r"^journalctl -u [A-Za-z0-9@._-]+ --no-pager \| tail -n \d{1,3}$",
        r"^ps aux \| grep [A-Za-z0-9._-]+$",
        r"^df -h \| grep [A-Za-z0-9/._-]+$",
        r"^ls (-[a-zA-Z]+ )?[A-Za-z0-9/._-]+ \| wc -l$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("chain pattern must compile"))
    .collect()
});

/// Substrings that chain, background, pipe, or substitute commands.
///
/// A single `&` also covers `&&`, and `|` covers both pipes and `||`.
const CHAIN_METACHARACTERS: &[&str] = &[";", "&", "|", "`", "$(", "\n", "\r"];

/// Vet a shell command against the deny-list, metacharacter rules, and the
/// applicable allow-list.
///
/// `override_active` widens the base-command allow-list; it never bypasses
/// the deny-list or the metacharacter rules.
pub fn check_command(cmd: &str, override_active: bool) -> Verdict {
    let trimmed = cmd.trim();
    if trimmed.is_empty() {
        return Verdict::rejected("empty command");
    }
    if trimmed.contains('\0') {
        return Verdict::rejected("command contains a null byte");
    }

    for pattern in DENIED_PATTERNS.iter() {
        if pattern.is_match(trimmed) {
            return Verdict::rejected(format!(
                "command matches denied pattern '{}'",
                pattern.as_str()
            ));
        }
    }

    if let Some(meta) = CHAIN_METACHARACTERS.iter().find(|m| trimmed.contains(**m)) {
        if !ALLOWED_CHAIN_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
            return Verdict::rejected(format!(
                "shell metacharacter '{}' outside an allow-listed pattern",
                meta.escape_debug()
            ));
        }
        // An allow-listed pipeline fixes both the base command and the
        // consumer, so no further base-command check is needed.
        return Verdict::Safe;
    }

    let base = match trimmed.split_whitespace().next() {
        Some(b) => b,
        None => return Verdict::rejected("empty command"),
    };
    // "sudo systemctl ..." is judged by the real command, not the wrapper.
    let base = if base == "sudo" {
        match trimmed.split_whitespace().nth(1) {
            Some(b) => b,
            None => return Verdict::rejected("sudo with no command"),
        }
    } else {
        base
    };

    if ALLOWED_COMMANDS.contains(&base) {
        return Verdict::Safe;
    }
    if override_active && OVERRIDE_ALLOWED_COMMANDS.contains(&base) {
        return Verdict::Safe;
    }

    Verdict::rejected(format!("base command '{base}' is not allow-listed"))
}
