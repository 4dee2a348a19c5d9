//! archive / non-archive routing decision

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// extensions routed to extraction, compared case-sensitively
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".rar", ".tar", ".gz", ".bz2", ".7z"];

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const RAR_MAGIC: [u8; 4] = *b"Rar!";

/// Decide whether `path` should go to the extraction engine.
///
/// Either signal is enough: an allowlisted extension, or a ZIP/RAR signature in
/// the first four bytes. Nothing past those four bytes is read, so a corrupt
/// archive is only detected once extraction starts.
pub fn is_archive(path: &Path) -> bool {
    has_archive_extension(path) || has_archive_magic(path)
}

/// whether the final `.ext` of the file name is on the allowlist
pub fn has_archive_extension(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    match name.rfind('.') {
        Some(idx) => ARCHIVE_EXTENSIONS.contains(&&name[idx..]),
        None => false,
    }
}

/// whether the file starts with a ZIP local header or a RAR marker; unreadable
/// or short files count as "no"
pub fn has_archive_magic(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return false;
    }
    magic == ZIP_MAGIC || magic == RAR_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_allowlist() {
        for name in ["a.zip", "a.rar", "a.tar", "a.tar.gz", "a.bz2", "a.7z", ".zip"] {
            assert!(has_archive_extension(Path::new(name)), "{name}");
        }
        for name in ["a.ZIP", "a.txt", "zip", "a.tgz", "a.xz", "archive"] {
            assert!(!has_archive_extension(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn test_extension_wins_when_file_is_missing() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("ghost.7z");
        assert!(is_archive(&missing));
    }

    #[test]
    fn test_magic_bytes_win_regardless_of_extension() {
        let temp_dir = TempDir::new().unwrap();

        let zip_like = temp_dir.path().join("disguised.dat");
        fs::write(&zip_like, [0x50, 0x4B, 0x03, 0x04, 0x00, 0x00]).unwrap();
        assert!(is_archive(&zip_like));

        let rar_like = temp_dir.path().join("disguised.bin");
        fs::write(&rar_like, b"Rar!\x1a\x07\x00").unwrap();
        assert!(is_archive(&rar_like));
    }

    #[test]
    fn test_plain_files_are_not_archives() {
        let temp_dir = TempDir::new().unwrap();

        let pdf = temp_dir.path().join("report.pdf");
        fs::write(&pdf, b"%PDF-1.7\n").unwrap();
        assert!(!is_archive(&pdf));

        // empty-archive signature is not on the list
        let empty_zip = temp_dir.path().join("empty.dat");
        fs::write(&empty_zip, [0x50, 0x4B, 0x05, 0x06]).unwrap();
        assert!(!is_archive(&empty_zip));

        let short = temp_dir.path().join("short");
        fs::write(&short, b"PK").unwrap();
        assert!(!is_archive(&short));
    }
}
