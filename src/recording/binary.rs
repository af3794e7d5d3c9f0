//! Packed on-disk record format and its decode step.
//!
//! A binary session file is a bare run of records, 4 native-endian `i32`
//! channel counts each, 16 bytes per sample. Timestamps and flags are
//! deliberately dropped; the format exists to keep per-sample writes cheap on
//! the capture box. Downstream processing first expands a file to CSV
//! (`C1..C4` header) with `convert_to_csv`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::sampling::error::RigError;

/// Bytes per packed record.
pub const RECORD_BYTES: usize = 16;

pub fn pack_channels(channels: &[i32; 4]) -> [u8; RECORD_BYTES] {
    let mut out = [0u8; RECORD_BYTES];
    for (slot, value) in out.chunks_exact_mut(4).zip(channels) {
        slot.copy_from_slice(&value.to_ne_bytes());
    }
    out
}

pub fn unpack_record(bytes: &[u8]) -> Option<[i32; 4]> {
    if bytes.len() != RECORD_BYTES {
        return None;
    }
    let mut channels = [0i32; 4];
    for (value, chunk) in channels.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = i32::from_ne_bytes(chunk.try_into().ok()?);
    }
    Some(channels)
}

/// Expand a packed session file into a sibling `.csv`. Returns the CSV path.
pub fn convert_to_csv(bin_path: &Path) -> Result<PathBuf, RigError> {
    let bytes = fs::read(bin_path)?;
    if bytes.len() % RECORD_BYTES != 0 {
        return Err(RigError::CorruptRecording {
            path: bin_path.to_path_buf(),
        });
    }

    let csv_path = bin_path.with_extension("csv");
    let mut writer = csv::Writer::from_path(&csv_path)?;
    writer.write_record(["C1", "C2", "C3", "C4"])?;
    for chunk in bytes.chunks_exact(RECORD_BYTES) {
        let channels = unpack_record(chunk).ok_or_else(|| RigError::CorruptRecording {
            path: bin_path.to_path_buf(),
        })?;
        writer.write_record(channels.map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(csv_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn packs_sixteen_native_endian_bytes() {
        let packed = pack_channels(&[1, -2, 300, -40000]);
        assert_eq!(packed.len(), RECORD_BYTES);
        assert_eq!(unpack_record(&packed), Some([1, -2, 300, -40000]));
    }

    #[test]
    fn converts_file_to_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let bin_path = dir.path().join("20260830-Trial1.bin");
        let mut file = File::create(&bin_path).unwrap();
        file.write_all(&pack_channels(&[10, 20, 30, 40])).unwrap();
        file.write_all(&pack_channels(&[-1, 0, 1, 32767])).unwrap();
        drop(file);

        let csv_path = convert_to_csv(&bin_path).unwrap();
        assert_eq!(csv_path, dir.path().join("20260830-Trial1.csv"));
        let contents = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["C1,C2,C3,C4", "10,20,30,40", "-1,0,1,32767"]);
    }

    #[test]
    fn rejects_truncated_files() {
        let dir = tempfile::tempdir().unwrap();
        let bin_path = dir.path().join("short.bin");
        fs::write(&bin_path, [0u8; RECORD_BYTES + 3]).unwrap();
        assert!(matches!(
            convert_to_csv(&bin_path),
            Err(RigError::CorruptRecording { .. })
        ));
    }
}
