//! Archive digests: computed by the publisher, checked by the stager.

use crate::errors::{Result, StoreError};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Verify the sha256 of a downloaded file against the digest in its metadata.
pub fn verify_sha256(expected: &str, path: &Path) -> Result<()> {
    let got = sha256_file(path)?;
    let want = expected.trim().to_lowercase();

    if got != want {
        return Err(StoreError::Network(format!(
            "checksum mismatch for {} (got {}, want {})",
            path.display(),
            got,
            want
        )));
    }
    Ok(())
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut f = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn digest_of_known_content() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("a.bin");
        fs::write(&p, b"abc").unwrap();
        let want = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(sha256_file(&p).unwrap(), want);
        verify_sha256(&want.to_uppercase(), &p).unwrap();
        assert!(verify_sha256("00", &p).is_err());
    }
}
