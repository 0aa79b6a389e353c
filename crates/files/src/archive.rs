//! Archive trees: zip and tar files inspected as pseudo-directories

use crate::error::FileSnapshotError;
use fp_core::{Blake3Hash, ContentHasher, RelativePath, RootSnapshot, SnapshotEntry};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    fn detect(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveFormat::TarGz
        } else if name.ends_with(".tar") {
            ArchiveFormat::Tar
        } else {
            // .zip, .jar and friends
            ArchiveFormat::Zip
        }
    }
}

/// Member content is hashed while it is read; only the hashes are kept
enum Member {
    Directory,
    File {
        content_hash: Blake3Hash,
        normalized_text_hash: Blake3Hash,
    },
}

/// Snapshot an archive root
///
/// Members are listed in pre-order with children sorted by name; parent
/// directories that the archive only implies are added. The archive itself
/// contributes no entry, so a missing or empty archive yields no entries.
pub(crate) fn snapshot_archive(path: &Path) -> Result<RootSnapshot, FileSnapshotError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("Archive {} does not exist", path.display());
            return Ok(RootSnapshot {
                root: path.to_path_buf(),
                archive: true,
                entries: Vec::new(),
            });
        }
        Err(err) => return Err(FileSnapshotError::from_io(path, err)),
    };

    let mut members = BTreeMap::new();
    match ArchiveFormat::detect(path) {
        ArchiveFormat::Zip => read_zip(path, file, &mut members)?,
        ArchiveFormat::Tar => read_tar(path, file, &mut members)?,
        ArchiveFormat::TarGz => read_tar(path, flate2::read::GzDecoder::new(file), &mut members)?,
    }

    // Fill in directories the archive lists only implicitly
    let implied: Vec<RelativePath> = members
        .keys()
        .flat_map(|member: &RelativePath| {
            let mut parents = Vec::new();
            let mut current = member.parent();
            while let Some(parent) = current {
                if parent.is_root() {
                    break;
                }
                current = parent.parent();
                parents.push(parent);
            }
            parents
        })
        .collect();
    for parent in implied {
        members.entry(parent).or_insert(Member::Directory);
    }

    let entries: Vec<SnapshotEntry> = members
        .into_iter()
        .map(|(relative, member)| {
            let absolute = path.join(relative.to_slash_string());
            match member {
                Member::Directory => SnapshotEntry::directory(absolute, relative),
                Member::File {
                    content_hash,
                    normalized_text_hash,
                } => SnapshotEntry::archived_file(absolute, relative, content_hash, normalized_text_hash),
            }
        })
        .collect();

    debug!("Archive {} has {} entries", path.display(), entries.len());
    Ok(RootSnapshot {
        root: path.to_path_buf(),
        archive: true,
        entries,
    })
}

fn read_zip(
    path: &Path,
    file: File,
    members: &mut BTreeMap<RelativePath, Member>,
) -> Result<(), FileSnapshotError> {
    let mut archive = zip::ZipArchive::new(file).map_err(|err| archive_error(path, err))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|err| archive_error(path, err))?;
        let relative = RelativePath::from_slash_separated(entry.name());
        if relative.is_root() {
            continue;
        }
        if entry.is_dir() {
            members.insert(relative, Member::Directory);
        } else {
            members.insert(relative, hash_member(path, &mut entry)?);
        }
    }
    Ok(())
}

fn read_tar<R: Read>(
    path: &Path,
    reader: R,
    members: &mut BTreeMap<RelativePath, Member>,
) -> Result<(), FileSnapshotError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|err| archive_error(path, err))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| archive_error(path, err))?;
        let name = entry
            .path()
            .map_err(|err| archive_error(path, err))?
            .to_string_lossy()
            .replace('\\', "/");
        let relative = RelativePath::from_slash_separated(&name);
        if relative.is_root() {
            continue;
        }
        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            members.insert(relative, Member::Directory);
        } else if entry_type.is_file() {
            members.insert(relative, hash_member(path, &mut entry)?);
        } else {
            debug!("Skipping non-file archive member {name}");
        }
    }
    Ok(())
}

fn hash_member(path: &Path, member: impl Read) -> Result<Member, FileSnapshotError> {
    let (content_hash, normalized_text_hash) =
        ContentHasher::hash_reader(member).map_err(|err| archive_error(path, err))?;
    Ok(Member::File {
        content_hash,
        normalized_text_hash,
    })
}

fn archive_error(path: &Path, err: impl std::fmt::Display) -> FileSnapshotError {
    FileSnapshotError::Archive {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_core::hash::{hash_bytes, hash_bytes_normalized_line_endings};
    use fp_core::EntryKind;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    fn write_tar(path: &Path, files: &[(&str, &[u8])]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.finish().unwrap();
    }

    fn names(root: &RootSnapshot) -> Vec<String> {
        root.entries
            .iter()
            .map(|e| e.relative_path.to_slash_string())
            .collect()
    }

    #[test]
    fn test_zip_members_with_implied_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.jar");
        write_zip(&path, &[("z.txt", b"z"), ("pkg/inner/A.class", b"A")]);

        let root = snapshot_archive(&path).unwrap();
        assert!(root.archive);
        assert_eq!(names(&root), vec!["pkg", "pkg/inner", "pkg/inner/A.class", "z.txt"]);
        assert_eq!(root.entries[0].kind, EntryKind::Directory);
        assert_eq!(root.entries[2].kind, EntryKind::RegularFile);
        assert_eq!(root.entries[2].content_hash, hash_bytes(b"A"));
        assert_eq!(root.entries[2].absolute_path, path.join("pkg/inner/A.class"));
        assert!(root.entries[2].metadata.is_none());
    }

    #[test]
    fn test_members_carry_normalized_text_hash() {
        let dir = TempDir::new().unwrap();
        let crlf = dir.path().join("crlf.zip");
        let lf = dir.path().join("lf.zip");
        write_zip(&crlf, &[("a.txt", b"one\r\ntwo\r\n")]);
        write_zip(&lf, &[("a.txt", b"one\ntwo\n")]);

        let crlf = snapshot_archive(&crlf).unwrap();
        let lf = snapshot_archive(&lf).unwrap();
        assert_ne!(crlf.entries[0].content_hash, lf.entries[0].content_hash);
        assert_eq!(crlf.entries[0].normalized_text_hash, lf.entries[0].normalized_text_hash);
    }

    #[test]
    fn test_large_member_hashed_in_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.tar");
        let content = b"line\r\n".repeat(10_000);
        write_tar(&path, &[("big.txt", content.as_slice())]);

        let root = snapshot_archive(&path).unwrap();
        assert_eq!(root.entries[0].content_hash, hash_bytes(&content));
        assert_eq!(
            root.entries[0].normalized_text_hash,
            Some(hash_bytes_normalized_line_endings(&content))
        );
        assert_eq!(
            root.entries[0].normalized_text_hash,
            Some(hash_bytes(&b"line\n".repeat(10_000)))
        );
    }

    #[test]
    fn test_tar_and_tar_gz() {
        let dir = TempDir::new().unwrap();
        let tar_path = dir.path().join("bundle.tar");
        write_tar(&tar_path, &[("b/c.txt", b"c"), ("a.txt", b"a")]);
        let root = snapshot_archive(&tar_path).unwrap();
        assert_eq!(names(&root), vec!["a.txt", "b", "b/c.txt"]);

        let gz_path = dir.path().join("bundle.tgz");
        let encoder = flate2::write::GzEncoder::new(
            File::create(&gz_path).unwrap(),
            flate2::Compression::default(),
        );
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(1);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "x.txt", &b"x"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let root = snapshot_archive(&gz_path).unwrap();
        assert_eq!(names(&root), vec!["x.txt"]);
        assert_eq!(root.entries[0].content_hash, hash_bytes(b"x"));
    }

    #[test]
    fn test_missing_and_empty_archives_have_no_entries() {
        let dir = TempDir::new().unwrap();
        let missing = snapshot_archive(&dir.path().join("absent.zip")).unwrap();
        assert!(missing.archive);
        assert!(missing.entries.is_empty());

        let empty_path = dir.path().join("empty.zip");
        write_zip(&empty_path, &[]);
        let empty = snapshot_archive(&empty_path).unwrap();
        assert!(empty.entries.is_empty());
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = snapshot_archive(&path).unwrap_err();
        assert!(matches!(err, FileSnapshotError::Archive { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }
}
