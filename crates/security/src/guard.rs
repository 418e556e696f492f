//! File guard: repository-confined reads and writes.
//!
//! Every path the model proposes goes through [`FileGuard::validate`] before
//! touching disk. Writes are atomic (temp file in the target directory, then
//! rename), skip identical content, and report a unified diff against the
//! previous text.
//!
//! Confinement is a textual prefix check on the normalized path. Symlinks are
//! not resolved, and a sibling directory whose name extends the root
//! (`/repo` vs `/repo2`) passes the prefix test.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use ragsmith_config::GuardConfig;
use serde::Serialize;
use sha2::{Digest, Sha256};
use similar::TextDiff;
use tracing::{debug, info, warn};
use crate::audit::{AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};

/// Error returned when a guarded file operation is refused or fails.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Path '{path}' resolves outside the repository root '{root}'")]
    PathEscape { path: String, root: String },

    #[error("Path '{path}' contains hidden segment '{segment}'")]
    SuspiciousPath { path: String, segment: String },

    #[error("Path '{path}' matches sensitive pattern '{pattern}'")]
    SensitiveFile { path: String, pattern: String },

    #[error("File operation failed on '{path}': {source}")]
    FileOperation {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid repository root '{path}': {reason}")]
    InvalidRoot { path: String, reason: String },
}

impl GuardError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::FileOperation {
            path: path.display().to_string(),
            source,
        }
    }

    /// True when the path was refused before any I/O happened.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::PathEscape { .. } | Self::SuspiciousPath { .. } | Self::SensitiveFile { .. }
        )
    }
}

impl From<GuardError> for ragsmith_core::Error {
    fn from(err: GuardError) -> Self {
        ragsmith_core::Error::Guard(err.to_string())
    }
}

/// Result of a successful [`FileGuard::write`].
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    /// Resolved absolute target
    pub path: PathBuf,

    /// Hex SHA-256 of the content now on disk
    pub checksum: String,

    /// False when the file already held exactly this content
    pub changed: bool,

    /// The file did not exist before
    pub created: bool,

    /// Unified diff against the previous text, when there was previous text
    pub diff: Option<String>,

    /// The previous content was not valid UTF-8 and was replaced without a diff
    pub binary_overwrite: bool,
}

/// Confines file access to one repository root.
#[derive(Debug, Clone)]
pub struct FileGuard {
    root: PathBuf,
    root_str: String,
    sensitive_patterns: Vec<String>,
    audit: Option<Arc<AuditLogger>>,
}

impl FileGuard {
    /// Create a guard for an existing directory.
    ///
    /// The root is made absolute and lexically normalized; symlinks are kept.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, GuardError> {
        let raw = root.as_ref();
        let absolute = std::path::absolute(raw).map_err(|e| GuardError::InvalidRoot {
            path: raw.display().to_string(),
            reason: e.to_string(),
        })?;
        let root = normalize(&absolute);

        if !root.is_dir() {
            let reason = if root.exists() {
                "not a directory"
            } else {
                "does not exist"
            };
            return Err(GuardError::InvalidRoot {
                path: root.display().to_string(),
                reason: reason.into(),
            });
        }

        Ok(Self {
            root_str: root.to_string_lossy().into_owned(),
            root,
            sensitive_patterns: ragsmith_config::default_sensitive_patterns(),
            audit: None,
        })
    }

    /// Create a guard using the deny-list and audit settings from config.
    pub fn from_config(root: impl AsRef<Path>, config: &GuardConfig) -> Result<Self, GuardError> {
        let guard = Self::new(root)?.with_sensitive_patterns(config.sensitive_patterns.clone());
        Ok(if config.audit {
            guard.with_audit(Arc::new(AuditLogger::with_sinks(vec![
                Box::new(TracingSink) as Box<dyn AuditSink>,
            ])))
        } else {
            guard
        })
    }

    /// Replace the deny-list. Patterns are matched lowercase.
    pub fn with_sensitive_patterns(mut self, patterns: Vec<String>) -> Self {
        self.sensitive_patterns = patterns.into_iter().map(|p| p.to_lowercase()).collect();
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn audit(&self) -> Option<&Arc<AuditLogger>> {
        self.audit.as_ref()
    }

    /// Absolute, lexically normalized form of `path`. Relative paths are
    /// joined to the root. No filesystem access.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root.join(path))
        }
    }

    /// Resolve `path` and check it stays under the root without passing
    /// through a hidden segment anywhere along the resolved path.
    ///
    /// A root that itself lives under a dot-directory therefore refuses
    /// every path.
    pub fn validate(&self, path: impl AsRef<Path>) -> Result<PathBuf, GuardError> {
        let raw = path.as_ref();
        let resolved = self.resolve(raw);
        let resolved_str = resolved.to_string_lossy();

        if !resolved_str.starts_with(self.root_str.as_str()) {
            return Err(GuardError::PathEscape {
                path: raw.display().to_string(),
                root: self.root_str.clone(),
            });
        }

        // Every segment counts, including those of the root itself
        if let Some(segment) = resolved_str
            .split(['/', '\\'])
            .find(|s| s.starts_with('.') && *s != ".")
        {
            return Err(GuardError::SuspiciousPath {
                path: raw.display().to_string(),
                segment: segment.to_string(),
            });
        }

        Ok(resolved)
    }

    /// Whether `path` passes [`validate`](Self::validate).
    pub fn is_within_repo(&self, path: impl AsRef<Path>) -> bool {
        self.validate(path).is_ok()
    }

    /// Best-effort conversion of an absolute path to one relative to the root.
    ///
    /// Paths outside the root get `..` segments. Relative input, or input
    /// sharing no common prefix with the root, is returned unchanged.
    pub fn to_relative(&self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref();
        if !path.is_absolute() {
            return path.to_string_lossy().into_owned();
        }
        let normalized = normalize(path);

        let target: Vec<Component<'_>> = normalized.components().collect();
        let base: Vec<Component<'_>> = self.root.components().collect();
        let common = target
            .iter()
            .zip(base.iter())
            .take_while(|(a, b)| a == b)
            .count();

        if common == 0 {
            return path.to_string_lossy().into_owned();
        }

        let mut relative = PathBuf::new();
        for _ in common..base.len() {
            relative.push("..");
        }
        for component in &target[common..] {
            relative.push(component.as_os_str());
        }

        if relative.as_os_str().is_empty() {
            ".".into()
        } else {
            relative.to_string_lossy().into_owned()
        }
    }

    /// Read a file inside the repository. `Ok(None)` if it does not exist.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Option<String>, GuardError> {
        let resolved = self.validate(path)?;
        match std::fs::read_to_string(&resolved) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GuardError::io(&resolved, e)),
        }
    }

    /// Write `content` to `path`, creating parent directories as needed.
    ///
    /// Identical content is a no-op. Otherwise the new content replaces the
    /// file atomically; readers see the old file or the new one, never a mix.
    pub fn write(&self, path: impl AsRef<Path>, content: &str) -> Result<WriteOutcome, GuardError> {
        let raw = path.as_ref();
        let resolved = match self.validate(raw) {
            Ok(p) => p,
            Err(e) => {
                self.record(
                    AuditEvent::PathDenied {
                        reason: e.to_string(),
                    },
                    &raw.display().to_string(),
                    AuditOutcome::Denied,
                );
                warn!(path = %raw.display(), error = %e, "Write refused");
                return Err(e);
            }
        };
        let target = resolved.display().to_string();

        if let Some(pattern) = self.sensitive_match(&resolved) {
            self.record(
                AuditEvent::SensitiveFileDenied {
                    pattern: pattern.to_string(),
                },
                &target,
                AuditOutcome::Denied,
            );
            warn!(path = %target, pattern, "Write to sensitive file refused");
            return Err(GuardError::SensitiveFile {
                path: raw.display().to_string(),
                pattern: pattern.to_string(),
            });
        }

        let checksum = hex::encode(Sha256::digest(content.as_bytes()));

        let result = self.write_resolved(&resolved, content, checksum);
        match &result {
            Ok(outcome) => {
                let outcome_kind = if outcome.changed {
                    AuditOutcome::Success
                } else {
                    AuditOutcome::Unchanged
                };
                self.record(
                    AuditEvent::FileWrite {
                        checksum: outcome.checksum.clone(),
                    },
                    &target,
                    outcome_kind,
                );
            }
            Err(e) => {
                self.record(AuditEvent::WriteFailed, &target, AuditOutcome::Failure);
                warn!(path = %target, error = %e, "Write failed");
            }
        }
        result
    }

    fn write_resolved(
        &self,
        resolved: &Path,
        content: &str,
        checksum: String,
    ) -> Result<WriteOutcome, GuardError> {
        let mut outcome = WriteOutcome {
            path: resolved.to_path_buf(),
            checksum,
            changed: true,
            created: false,
            diff: None,
            binary_overwrite: false,
        };

        let previous_permissions = match std::fs::read(resolved) {
            Ok(existing) => {
                if existing == content.as_bytes() {
                    debug!(path = %resolved.display(), "Content unchanged, skipping write");
                    outcome.changed = false;
                    return Ok(outcome);
                }
                match std::str::from_utf8(&existing) {
                    Ok(old) => outcome.diff = Some(self.unified_diff(resolved, old, content)),
                    Err(_) => {
                        warn!(
                            path = %resolved.display(),
                            "Existing file is not valid UTF-8, overwriting without diff"
                        );
                        outcome.binary_overwrite = true;
                    }
                }
                std::fs::metadata(resolved).ok().map(|m| m.permissions())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                outcome.created = true;
                None
            }
            Err(e) => return Err(GuardError::io(resolved, e)),
        };

        let parent = resolved.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(|e| GuardError::io(parent, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| GuardError::io(parent, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| GuardError::io(tmp.path(), e))?;

        let permissions = match previous_permissions {
            Some(perms) => std::fs::set_permissions(tmp.path(), perms),
            None => default_permissions(tmp.path()),
        };
        permissions.map_err(|e| GuardError::io(resolved, e))?;

        tmp.persist(resolved)
            .map_err(|e| GuardError::io(resolved, e.error))?;

        info!(
            path = %resolved.display(),
            created = outcome.created,
            bytes = content.len(),
            "File written"
        );
        Ok(outcome)
    }

    fn unified_diff(&self, resolved: &Path, old: &str, new: &str) -> String {
        let relative = self.to_relative(resolved);
        TextDiff::from_lines(old, new)
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{relative}"), &format!("b/{relative}"))
            .to_string()
    }

    fn sensitive_match(&self, resolved: &Path) -> Option<&str> {
        let lowered = resolved.to_string_lossy().replace('\\', "/").to_lowercase();
        self.sensitive_patterns
            .iter()
            .find(|p| lowered.contains(p.as_str()))
            .map(String::as_str)
    }

    fn record(&self, event: AuditEvent, target: &str, outcome: AuditOutcome) {
        if let Some(audit) = &self.audit {
            audit.log(event, target, outcome, None);
        }
    }
}

/// Lexical normalization: drops `.`, folds `..` into the parent, never
/// climbs above the filesystem root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

#[cfg(unix)]
fn default_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Temp directories default to a `.tmp` prefix, which is itself hidden.
    fn repo_dir() -> tempfile::TempDir {
        tempfile::Builder::new().prefix("ragsmith").tempdir().unwrap()
    }

    fn guard() -> (tempfile::TempDir, FileGuard) {
        let dir = repo_dir();
        let guard = FileGuard::new(dir.path()).unwrap();
        (dir, guard)
    }

    #[test]
    fn invalid_root_rejected() {
        let dir = repo_dir();
        let missing = dir.path().join("nope");
        assert!(matches!(
            FileGuard::new(&missing),
            Err(GuardError::InvalidRoot { .. })
        ));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            FileGuard::new(&file),
            Err(GuardError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn resolve_is_lexical() {
        let (_dir, guard) = guard();
        assert_eq!(guard.resolve("src/./a.py"), guard.root().join("src/a.py"));
        assert_eq!(guard.resolve("src/../a.py"), guard.root().join("a.py"));
        assert_eq!(guard.resolve("/x/y/../z"), PathBuf::from("/x/z"));
    }

    #[test]
    fn validate_accepts_paths_inside_root() {
        let (_dir, guard) = guard();
        let resolved = guard.validate("src/module/a.py").unwrap();
        assert_eq!(resolved, guard.root().join("src/module/a.py"));
        assert!(guard.is_within_repo("./a.py"));
        assert!(guard.is_within_repo(guard.root().join("b.py")));
    }

    #[test]
    fn validate_rejects_escape() {
        let (_dir, guard) = guard();
        assert!(matches!(
            guard.validate("../../etc/passwd"),
            Err(GuardError::PathEscape { .. })
        ));
        assert!(matches!(
            guard.validate("/etc/passwd"),
            Err(GuardError::PathEscape { .. })
        ));
        assert!(!guard.is_within_repo("src/../../outside.py"));
    }

    #[test]
    fn validate_rejects_hidden_segments() {
        let (_dir, guard) = guard();
        for path in [".git/config", "src/.hidden/a.py", ".env", "a/.b"] {
            assert!(
                matches!(guard.validate(path), Err(GuardError::SuspiciousPath { .. })),
                "{path} should be suspicious"
            );
        }
    }

    #[test]
    fn root_under_dot_directory_refuses_everything() {
        let dir = repo_dir();
        let root = dir.path().join(".cache").join("repo");
        std::fs::create_dir_all(&root).unwrap();
        let guard = FileGuard::new(&root).unwrap();

        assert!(matches!(
            guard.validate("a.py"),
            Err(GuardError::SuspiciousPath { ref segment, .. }) if segment == ".cache"
        ));
        let err = guard.write("a.py", "x").unwrap_err();
        assert!(err.is_denial());
        assert!(!root.join("a.py").exists());
    }

    #[test]
    fn prefix_check_is_textual() {
        let dir = repo_dir();
        std::fs::create_dir_all(dir.path().join("repo")).unwrap();
        let guard = FileGuard::new(dir.path().join("repo")).unwrap();
        // A sibling sharing the root as a string prefix is accepted
        assert!(guard.is_within_repo(guard.root().with_file_name("repo2").join("x.py")));
    }

    #[test]
    fn write_creates_file_and_parents() {
        let (_dir, guard) = guard();
        let outcome = guard.write("pkg/sub/new.py", "print('hi')\n").unwrap();

        assert!(outcome.changed);
        assert!(outcome.created);
        assert!(outcome.diff.is_none());
        assert_eq!(
            std::fs::read_to_string(guard.root().join("pkg/sub/new.py")).unwrap(),
            "print('hi')\n"
        );
        assert_eq!(
            outcome.checksum,
            hex::encode(Sha256::digest("print('hi')\n".as_bytes()))
        );
    }

    #[test]
    fn write_existing_file_produces_diff() {
        let (_dir, guard) = guard();
        std::fs::write(guard.root().join("a.py"), "x = 1\ny = 2\n").unwrap();

        let outcome = guard.write("a.py", "x = 1\ny = 3\n").unwrap();
        assert!(outcome.changed);
        assert!(!outcome.created);
        let diff = outcome.diff.unwrap();
        assert!(diff.contains("--- a/a.py"));
        assert!(diff.contains("-y = 2"));
        assert!(diff.contains("+y = 3"));
    }

    #[test]
    fn identical_write_is_noop() {
        let (_dir, guard) = guard();
        let target = guard.root().join("a.py");
        guard.write("a.py", "same").unwrap();
        let before = std::fs::metadata(&target).unwrap().modified().unwrap();

        let outcome = guard.write("a.py", "same").unwrap();
        assert!(!outcome.changed);
        assert!(outcome.diff.is_none());
        let after = std::fs::metadata(&target).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn binary_file_is_overwritten_without_diff() {
        let (_dir, guard) = guard();
        std::fs::write(guard.root().join("blob.dat"), [0xff, 0xfe, 0x00]).unwrap();

        let outcome = guard.write("blob.dat", "text now").unwrap();
        assert!(outcome.binary_overwrite);
        assert!(outcome.diff.is_none());
        assert_eq!(
            std::fs::read_to_string(guard.root().join("blob.dat")).unwrap(),
            "text now"
        );
    }

    #[test]
    fn write_refuses_sensitive_paths() {
        let (_dir, guard) = guard();
        for path in ["deploy/prod.env", "config/secrets.yaml", "keys/server.pem", "id_rsa"] {
            let err = guard.write(path, "nope").unwrap_err();
            assert!(
                matches!(err, GuardError::SensitiveFile { .. }),
                "{path} should be sensitive, got {err}"
            );
            assert!(!guard.root().join(path).exists());
        }
    }

    #[test]
    fn write_refuses_escape_without_touching_disk() {
        let dir = repo_dir();
        std::fs::create_dir_all(dir.path().join("repo")).unwrap();
        let guard = FileGuard::new(dir.path().join("repo")).unwrap();

        let err = guard.write("../outside.py", "x").unwrap_err();
        assert!(err.is_denial());
        assert!(!dir.path().join("outside.py").exists());
    }

    #[test]
    fn write_onto_directory_is_file_operation_error() {
        let (_dir, guard) = guard();
        std::fs::create_dir_all(guard.root().join("pkg")).unwrap();
        let err = guard.write("pkg", "x").unwrap_err();
        assert!(matches!(err, GuardError::FileOperation { .. }));
        assert!(!err.is_denial());
    }

    #[test]
    fn read_missing_is_none() {
        let (_dir, guard) = guard();
        assert!(guard.read("missing.py").unwrap().is_none());
        std::fs::write(guard.root().join("here.py"), "x").unwrap();
        assert_eq!(guard.read("here.py").unwrap().as_deref(), Some("x"));
        assert!(guard.read("../elsewhere.py").is_err());
    }

    #[test]
    fn to_relative_variants() {
        let (_dir, guard) = guard();
        assert_eq!(guard.to_relative(guard.root().join("src/a.py")), format!("src{}a.py", std::path::MAIN_SEPARATOR));
        assert_eq!(guard.to_relative(guard.root()), ".");
        assert_eq!(guard.to_relative("already/relative.py"), "already/relative.py");
        let sibling = guard.root().with_file_name("other");
        assert_eq!(
            guard.to_relative(sibling.join("b.py")),
            format!("..{0}other{0}b.py", std::path::MAIN_SEPARATOR)
        );
    }

    #[test]
    fn audit_records_writes_and_denials() {
        let (_dir, guard) = guard();
        let audit = Arc::new(AuditLogger::new());
        let guard = guard.with_audit(audit.clone());

        guard.write("ok.py", "x").unwrap();
        guard.write("ok.py", "x").unwrap();
        let _ = guard.write("../bad.py", "x");
        let _ = guard.write("prod.env.py", "x");

        assert_eq!(audit.entries_by_outcome(&AuditOutcome::Success).len(), 1);
        assert_eq!(audit.entries_by_outcome(&AuditOutcome::Unchanged).len(), 1);
        assert_eq!(audit.entries_by_outcome(&AuditOutcome::Denied).len(), 2);
    }

    #[test]
    fn from_config_uses_patterns() {
        let dir = repo_dir();
        let config = GuardConfig {
            sensitive_patterns: vec!["VENDOR".into()],
            audit: true,
        };
        let guard = FileGuard::from_config(dir.path(), &config).unwrap();
        assert!(guard.audit().is_some());
        assert!(matches!(
            guard.write("vendor/lib.py", "x"),
            Err(GuardError::SensitiveFile { .. })
        ));
        assert!(guard.write("prod.env.py", "x").is_ok());
    }
}
