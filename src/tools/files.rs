// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Workspace file access for tools.
//!
//! Every path is resolved against a canonical workspace root and must stay
//! inside it. Escapes are reported as [`ToolError::SecurityViolation`];
//! everything else that goes wrong with a single file is an ordinary error
//! that batch readers log and skip.

use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

#[cfg(feature = "telemetry")]
use tracing::debug;
use tracing::warn;

use crate::error::ToolError;

/// Largest file that will be read.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Most files a directory read returns.
pub const MAX_DIRECTORY_FILES: usize = 500;

/// Patterns always excluded from directory reads.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/dist/**",
    "**/build/**",
    "**/target/**",
    "**/coverage/**",
    "*.min.js",
    "*.lock",
    "**/package-lock.json",
];

/// Directory names never descended into.
const PRUNED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "target", "coverage"];

/// A file read from the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Path relative to the workspace root, `/`-separated.
    pub path: String,
    pub content: String,
    pub language: &'static str,
}

/// Human-readable language name for a path.
pub fn detect_language(path: &str) -> &'static str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    if name.eq_ignore_ascii_case("dockerfile") {
        return "Dockerfile";
    }

    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return "Unknown",
    };

    match ext.as_str() {
        "ts" => "TypeScript",
        "tsx" => "TypeScript (React)",
        "js" => "JavaScript",
        "jsx" => "JavaScript (React)",
        "py" => "Python",
        "java" => "Java",
        "kt" => "Kotlin",
        "go" => "Go",
        "rs" => "Rust",
        "cpp" => "C++",
        "c" => "C",
        "h" => "C/C++ Header",
        "hpp" => "C++ Header",
        "cs" => "C#",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "scala" => "Scala",
        "vue" => "Vue",
        "svelte" => "Svelte",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "less" => "LESS",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "xml" => "XML",
        "md" => "Markdown",
        "sql" => "SQL",
        "sh" => "Shell",
        "bash" => "Bash",
        "ps1" => "PowerShell",
        "dockerfile" => "Dockerfile",
        _ => "Unknown",
    }
}

/// Reads files under a fixed workspace root.
#[derive(Debug, Clone)]
pub struct FileReader {
    root: PathBuf,
}

impl FileReader {
    /// Create a reader rooted at `root`, which must exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| ToolError::Io(format!("Invalid workspace root {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` inside the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        confine(&self.root, path)
    }

    fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read one text file.
    pub async fn read_file(&self, path: &str) -> Result<FileContent, ToolError> {
        let resolved = self.resolve(path)?;
        self.read_resolved(&resolved, path).await
    }

    async fn read_resolved(&self, resolved: &Path, shown: &str) -> Result<FileContent, ToolError> {
        let metadata = tokio::fs::metadata(resolved).await?;
        if metadata.is_dir() {
            return Err(ToolError::execution(format!("Path is a directory: {shown}")));
        }
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ToolError::execution(format!(
                "File too large: {shown} ({} bytes, limit {MAX_FILE_SIZE})",
                metadata.len()
            )));
        }

        let bytes = tokio::fs::read(resolved).await?;
        if bytes.contains(&0) {
            return Err(ToolError::execution(format!("Binary file skipped: {shown}")));
        }

        let path = self.relative(resolved);
        Ok(FileContent {
            language: detect_language(&path),
            content: String::from_utf8_lossy(&bytes).into_owned(),
            path,
        })
    }

    /// Read several files, skipping those that cannot be read.
    /// A path outside the workspace aborts the whole batch.
    pub async fn read_files(&self, paths: &[String]) -> Result<Vec<FileContent>, ToolError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match self.read_file(path).await {
                Ok(file) => files.push(file),
                Err(e @ ToolError::SecurityViolation(_)) => return Err(e),
                Err(e) => warn!(path = %path, error = %e, "Skipping unreadable file"),
            }
        }
        Ok(files)
    }

    /// Read every matching text file under `dir`, sorted by path.
    ///
    /// `include` defaults to everything. `exclude` is added to
    /// [`DEFAULT_EXCLUDES`]. Patterns match the path relative to `dir`.
    pub async fn read_directory(
        &self,
        dir: &str,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> Result<Vec<FileContent>, ToolError> {
        let base = self.resolve(dir)?;
        if !base.is_dir() {
            return Err(ToolError::execution(format!("Not a directory: {dir}")));
        }

        let include_set = match include.filter(|p| !p.is_empty()) {
            Some(patterns) => Some(build_globset(patterns.iter().map(String::as_str))?),
            None => None,
        };
        let exclude_set = build_globset(
            DEFAULT_EXCLUDES
                .iter()
                .copied()
                .chain(exclude.unwrap_or_default().iter().map(String::as_str)),
        )?;

        let mut candidates: Vec<PathBuf> = WalkDir::new(&base)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !PRUNED_DIRS.iter().any(|d| e.file_name() == *d)
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let rel = e.path().strip_prefix(&base).unwrap_or(e.path());
                !exclude_set.is_match(rel)
                    && include_set.as_ref().map_or(true, |set| set.is_match(rel))
            })
            .map(|e| e.into_path())
            .collect();

        candidates.sort();
        candidates.truncate(MAX_DIRECTORY_FILES);

        let mut files = Vec::with_capacity(candidates.len());
        for path in &candidates {
            let shown = self.relative(path);
            match self.read_resolved(path, &shown).await {
                Ok(file) => files.push(file),
                Err(_e) => {
                    #[cfg(feature = "telemetry")]
                    debug!(path = %shown, error = %_e, "Skipping file");
                }
            }
        }

        Ok(files)
    }
}

fn build_globset<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<GlobSet, ToolError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .or_else(|_| Glob::new(pattern))
            .map_err(|e| ToolError::validation(format!("Invalid glob pattern \"{pattern}\": {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ToolError::validation(format!("Invalid glob patterns: {e}")))
}

/// Lexically resolve `.` and `..` without touching the filesystem.
/// Resolve `path` against the canonical `root`, refusing anything that ends
/// up outside it once symlinks and `..` are resolved.
pub fn confine(root: &Path, path: &str) -> Result<PathBuf, ToolError> {
    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let outside =
        || ToolError::SecurityViolation(format!("Path \"{path}\" is outside the allowed workspace"));

    match joined.canonicalize() {
        Ok(real) if real.starts_with(root) => Ok(real),
        Ok(_) => Err(outside()),
        Err(_) if !normalize(&joined).starts_with(root) => Err(outside()),
        Err(_) => Err(ToolError::FileNotFound(path.to_string())),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
