//! Deterministic zip packaging
//!
//! Identical directory trees always produce byte-identical archives:
//! entries are sorted by relative path, timestamps are pinned to the zip
//! epoch (1980-01-01) and permissions are fixed. Archives are written to a
//! temporary file beside the destination and renamed into place, so a failed
//! write never leaves a partial archive behind.

use serde_json::Value;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::domain::content::canonical_json;
use crate::error::{DeployError, NotFoundError};

/// Name of the inner code archive inside the outer archive
pub const CODE_ARCHIVE_NAME: &str = "code.zip";

/// Name of the settings manifest inside the outer archive
pub const SETTINGS_MANIFEST_NAME: &str = "settings.json";

enum EntrySource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

struct ArchiveEntry {
    name: String,
    source: EntrySource,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Relative path with `/` separators regardless of platform
///
/// Non-UTF-8 names are rejected: lossy conversion could map two files to
/// the same entry.
fn archive_name(relative: &Path, full: &Path) -> Result<String, DeployError> {
    relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                DeployError::filesystem(
                    full,
                    io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|parts| parts.join("/"))
}

fn collect_entries(source_dir: &Path) -> Result<Vec<ArchiveEntry>, DeployError> {
    if !source_dir.is_dir() {
        return Err(NotFoundError::SourceDirectory {
            path: source_dir.display().to_string(),
        }
        .into());
    }

    let mut entries = Vec::new();
    // Symlinked assets are archived as the files they point to; loops are errors.
    for entry in WalkDir::new(source_dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source_dir.to_path_buf());
            DeployError::filesystem(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .unwrap_or(entry.path());
        entries.push(ArchiveEntry {
            name: archive_name(relative, entry.path())?,
            source: EntrySource::File(entry.path().to_path_buf()),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn write_archive(mut entries: Vec<ArchiveEntry>, dest_path: &Path) -> Result<PathBuf, DeployError> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let parent = match dest_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| DeployError::filesystem(&parent, e))?;

    // Dropping the temp file on any error below removes it.
    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| DeployError::filesystem(&parent, e))?;
    {
        let mut writer = ZipWriter::new(tmp.as_file_mut());
        for entry in &entries {
            writer
                .start_file(entry.name.as_str(), entry_options())
                .map_err(|e| DeployError::filesystem(dest_path, e.into()))?;
            match &entry.source {
                EntrySource::File(path) => {
                    let mut file = File::open(path).map_err(|e| DeployError::filesystem(path, e))?;
                    std::io::copy(&mut file, &mut writer)
                        .map_err(|e| DeployError::filesystem(path, e))?;
                }
                EntrySource::Bytes(bytes) => {
                    writer
                        .write_all(bytes)
                        .map_err(|e| DeployError::filesystem(dest_path, e))?;
                }
            }
            debug!(entry = %entry.name, "Added archive entry");
        }
        writer
            .finish()
            .map_err(|e| DeployError::filesystem(dest_path, e.into()))?;
    }

    tmp.persist(dest_path)
        .map_err(|e| DeployError::filesystem(dest_path, e.error))?;

    Ok(dest_path.to_path_buf())
}

/// Archive every regular file under `source_dir` into `dest_path`
pub fn create_archive(source_dir: &Path, dest_path: &Path) -> Result<PathBuf, DeployError> {
    let entries = collect_entries(source_dir)?;
    info!(
        source = %source_dir.display(),
        files = entries.len(),
        "Creating archive {}",
        dest_path.display()
    );
    write_archive(entries, dest_path)
}

/// Two-stage packager writing into a working directory
pub struct Packager {
    work_dir: PathBuf,
}

impl Packager {
    /// Create a packager writing archives into `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Package build output and settings as one atomic upload unit
    ///
    /// Stage 1 archives `build_dir` alone. Stage 2 wraps that archive
    /// together with the canonical settings manifest into `archive_name`,
    /// whose path is returned.
    pub fn package_site(
        &self,
        build_dir: &Path,
        settings: &Value,
        archive_name: &str,
    ) -> Result<PathBuf, DeployError> {
        let code_archive = create_archive(build_dir, &self.work_dir.join(CODE_ARCHIVE_NAME))?;

        let entries = vec![
            ArchiveEntry {
                name: CODE_ARCHIVE_NAME.to_string(),
                source: EntrySource::File(code_archive),
            },
            ArchiveEntry {
                name: SETTINGS_MANIFEST_NAME.to_string(),
                source: EntrySource::Bytes(canonical_json(settings).into_bytes()),
            },
        ];
        let archive = write_archive(entries, &self.work_dir.join(archive_name))?;
        info!(archive = %archive.display(), "Packaged code and settings");
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_tree(root: &Path) {
        std::fs::create_dir_all(root.join("assets/js")).unwrap();
        std::fs::create_dir_all(root.join("server")).unwrap();
        std::fs::write(root.join("index.html"), "<html></html>").unwrap();
        std::fs::write(root.join("assets/js/app.js"), "console.log(1)").unwrap();
        std::fs::write(root.join("assets/logo.svg"), "<svg/>").unwrap();
        std::fs::write(root.join("server/index.js"), "export default {}").unwrap();
    }

    fn entry_names(archive: &Path) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_same_tree_gives_identical_bytes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("dist");
        write_tree(&src);

        let first = create_archive(&src, &tmp.path().join("a.zip")).unwrap();
        let second = create_archive(&src, &tmp.path().join("b.zip")).unwrap();

        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn test_independent_copies_give_identical_bytes() {
        let tmp = TempDir::new().unwrap();
        let one = tmp.path().join("one");
        let two = tmp.path().join("two");
        write_tree(&one);
        std::thread::sleep(std::time::Duration::from_millis(1100));
        write_tree(&two);

        let a = create_archive(&one, &tmp.path().join("one.zip")).unwrap();
        let b = create_archive(&two, &tmp.path().join("two.zip")).unwrap();

        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }

    #[test]
    fn test_entries_sorted_with_forward_slashes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("dist");
        write_tree(&src);

        let archive = create_archive(&src, &tmp.path().join("out.zip")).unwrap();
        assert_eq!(
            entry_names(&archive),
            vec![
                "assets/js/app.js",
                "assets/logo.svg",
                "index.html",
                "server/index.js"
            ]
        );
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.zip");
        let err = create_archive(&tmp.path().join("missing"), &dest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!dest.exists());
    }

    #[test]
    fn test_package_site_bundles_code_and_settings() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("dist");
        write_tree(&src);
        let work = tmp.path().join("work");

        let settings = json!({"b": 2, "a": 1});
        let archive = Packager::new(&work)
            .package_site(&src, &settings, "blog-abc.zip")
            .unwrap();

        assert!(work.join(CODE_ARCHIVE_NAME).exists());
        assert_eq!(
            entry_names(&archive),
            vec![CODE_ARCHIVE_NAME, SETTINGS_MANIFEST_NAME]
        );

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut manifest = String::new();
        zip.by_name(SETTINGS_MANIFEST_NAME)
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        assert_eq!(manifest, r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_package_site_is_reproducible() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("dist");
        write_tree(&src);
        let settings = json!({"env": {"MODE": "production"}});

        let first = Packager::new(tmp.path().join("w1"))
            .package_site(&src, &settings, "site.zip")
            .unwrap();
        let second = Packager::new(tmp.path().join("w2"))
            .package_site(&src, &settings, "site.zip")
            .unwrap();

        assert_eq!(
            std::fs::read(first).unwrap(),
            std::fs::read(second).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_archived() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("dist");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("index.html"), "<html></html>").unwrap();
        std::fs::write(tmp.path().join("real.js"), "console.log(2)").unwrap();
        std::os::unix::fs::symlink("../real.js", src.join("app.js")).unwrap();

        let archive = create_archive(&src, &tmp.path().join("out.zip")).unwrap();
        assert_eq!(entry_names(&archive), vec!["app.js", "index.html"]);

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name("app.js").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "console.log(2)");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = Path::new(OsStr::from_bytes(b"bad\xff.txt"));
        let err = archive_name(name, name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert_eq!(
            archive_name(Path::new("assets/js/app.js"), Path::new("x")).unwrap(),
            "assets/js/app.js"
        );
    }
}
