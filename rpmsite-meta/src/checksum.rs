//! File checksums
//!
//! BLAKE3 digests used to tell whether a destination file already holds the
//! same bytes as its source.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher as Blake3Hasher;

/// Compute BLAKE3 hash of a file
pub fn b3sum<P: AsRef<Path>>(path: P) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Blake3Hasher::new();

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// True when both files exist with identical size and BLAKE3 digest
pub fn same_contents<P: AsRef<Path>, Q: AsRef<Path>>(a: P, b: Q) -> std::io::Result<bool> {
    let (a, b) = (a.as_ref(), b.as_ref());
    if !a.is_file() || !b.is_file() {
        return Ok(false);
    }
    if std::fs::metadata(a)?.len() != std::fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(b3sum(a)? == b3sum(b)?)
}

/// Copy `src` to `dest` unless `dest` already has the same contents.
/// Returns whether a copy happened.
pub fn copy_if_changed<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> std::io::Result<bool> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    if same_contents(src, dest)? {
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dest)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_b3sum() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let hash = b3sum(file.path()).unwrap();
        // Known BLAKE3 hash of "hello world"
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_copy_if_changed() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.rpm");
        let dest = dir.path().join("out/nested/a.rpm");
        std::fs::write(&src, b"payload").unwrap();

        assert!(copy_if_changed(&src, &dest).unwrap());
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
        assert!(!copy_if_changed(&src, &dest).unwrap());

        std::fs::write(&src, b"payload v2").unwrap();
        assert!(copy_if_changed(&src, &dest).unwrap());
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload v2");
        assert_eq!(std::fs::read(&src).unwrap(), b"payload v2");
    }
}
