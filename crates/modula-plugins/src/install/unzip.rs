use crate::errors::{Result, StoreError};
use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Entry names in archive order. Fails if any entry would escape its destination.
pub fn entry_names<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        if file.enclosed_name().is_none() {
            return Err(StoreError::ArchiveRejected(format!(
                "entry `{}` escapes the extraction directory",
                file.name()
            )));
        }
        names.push(file.name().to_string());
    }
    Ok(names)
}

/// Extract every entry under `dest`, preserving folders.
pub fn unzip_into<R: Read + Seek>(archive: &mut ZipArchive<R>, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(rel) = file.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let outpath = dest.join(rel);
        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&outpath)?;
            std::io::copy(&mut file, &mut out)?;
        }
    }
    Ok(())
}

/// Extract the entries accepted by `keep` directly into `dest`, dropping their folders.
pub fn extract_flat<R, F>(archive: &mut ZipArchive<R>, dest: &Path, keep: F) -> Result<Vec<PathBuf>>
where
    R: Read + Seek,
    F: Fn(&Path) -> bool,
{
    fs::create_dir_all(dest)?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let Some(file_name) = file
            .enclosed_name()
            .filter(|p| keep(p))
            .and_then(|p| p.file_name().map(|n| n.to_os_string()))
        else {
            continue;
        };
        let outpath = dest.join(file_name);
        let mut out = fs::File::create(&outpath)?;
        std::io::copy(&mut file, &mut out)?;
        written.push(outpath);
    }
    Ok(written)
}
