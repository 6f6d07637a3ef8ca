//! Local-file-backed [`FlashRegion`]: this workspace's stand-in for the
//! journaled flash sector the real device would journal settings to (spec
//! §4.8 AMBIENT note). Records are length-prefixed and appended to a single
//! file; `erase()` truncates it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use iface::{FlashError, FlashRegion};

pub struct FileFlash {
    path: PathBuf,
    file: File,
}

impl FileFlash {
    /// Open (creating if absent) the journal file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FlashError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path, file })
    }
}

impl FlashRegion for FileFlash {
    fn append(&mut self, record: &[u8]) -> Result<(), FlashError> {
        self.file.write_all(&(record.len() as u32).to_be_bytes())?;
        self.file.write_all(record)?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Vec<u8>>, FlashError> {
        let mut f = File::open(&self.path)?;
        let mut bytes = Vec::new();
        f.read_to_end(&mut bytes)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset + 4 <= bytes.len() {
            let len = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
            let start = offset + 4;
            let end = start + len;
            if end > bytes.len() {
                // Trailing partial record from an interrupted write; the
                // prior complete record stays readable, matching the
                // monotonic-boot_count guarantee in spec §4.8.
                break;
            }
            records.push(bytes[start..end].to_vec());
            offset = end;
        }
        Ok(records)
    }

    fn erase(&mut self) -> Result<(), FlashError> {
        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_path(label: &str) -> PathBuf {
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        env::temp_dir().join(format!("ledspan-settings-test-{label}-{id}.log"))
    }

    #[test]
    fn append_then_read_all_round_trips() {
        let path = scratch_path("roundtrip");
        let _ = std::fs::remove_file(&path);
        let mut flash = FileFlash::open(&path).unwrap();
        flash.append(b"hello").unwrap();
        flash.append(b"world").unwrap();
        let records = flash.read_all().unwrap();
        assert_eq!(records, vec![b"hello".to_vec(), b"world".to_vec()]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn reopening_preserves_prior_records() {
        let path = scratch_path("reopen");
        let _ = std::fs::remove_file(&path);
        {
            let mut flash = FileFlash::open(&path).unwrap();
            flash.append(b"persisted").unwrap();
        }
        let flash = FileFlash::open(&path).unwrap();
        assert_eq!(flash.read_all().unwrap(), vec![b"persisted".to_vec()]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn erase_truncates_the_log() {
        let path = scratch_path("erase");
        let _ = std::fs::remove_file(&path);
        let mut flash = FileFlash::open(&path).unwrap();
        flash.append(b"gone-soon").unwrap();
        flash.erase().unwrap();
        assert!(flash.read_all().unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn trailing_partial_record_is_dropped_not_corrupting() {
        let path = scratch_path("partial");
        let _ = std::fs::remove_file(&path);
        {
            let mut flash = FileFlash::open(&path).unwrap();
            flash.append(b"complete").unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            // Simulate an interrupted write: a length prefix with no body.
            f.write_all(&100u32.to_be_bytes()).unwrap();
        }
        let flash = FileFlash::open(&path).unwrap();
        assert_eq!(flash.read_all().unwrap(), vec![b"complete".to_vec()]);
        let _ = std::fs::remove_file(&path);
    }
}
