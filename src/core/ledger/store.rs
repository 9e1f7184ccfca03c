//! 账本持久化：暂存 CSV + 断点 JSON，完成后写修正 CSV

use super::correct::CorrectedRecord;
use super::error::LedgerError;
use super::record::{Ledger, PositionRecord, COLUMNS};
use super::visible::VisibleRows;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Resume point written with every staged save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Transition position of the last committed change.
    pub frame_pos: u64,
    pub visible: VisibleRows,
    pub commits: u64,
}

pub trait LedgerStore {
    fn load(&self) -> Result<Option<Ledger>, LedgerError>;

    fn load_checkpoint(&self) -> Result<Option<Checkpoint>, LedgerError>;

    /// Persist the staged ledger together with its checkpoint.
    fn save(&mut self, ledger: &Ledger, checkpoint: &Checkpoint) -> Result<(), LedgerError>;

    fn save_corrected(&mut self, records: &[CorrectedRecord]) -> Result<(), LedgerError>;

    /// Drop every persisted artifact.
    fn clear(&mut self) -> Result<(), LedgerError>;
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, LedgerError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| LedgerError::Io(e.into_error()))
}

/// Write next to the target and rename over it.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), LedgerError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// `<stem>_raw.csv`, `<stem>.csv` and `<stem>_checkpoint.json` in one directory.
#[derive(Debug, Clone)]
pub struct CsvLedgerStore {
    staged: PathBuf,
    corrected: PathBuf,
    checkpoint: PathBuf,
}

impl CsvLedgerStore {
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            staged: dir.join(format!("{}_raw.csv", stem)),
            corrected: dir.join(format!("{}.csv", stem)),
            checkpoint: dir.join(format!("{}_checkpoint.json", stem)),
        }
    }

    /// Files named after `video`, in `out_dir` or next to the video.
    pub fn for_video(video: &Path, out_dir: Option<&Path>) -> Result<Self, LedgerError> {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trades".to_string());
        let dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => video
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        fs::create_dir_all(&dir)?;
        Ok(Self::new(&dir, &stem))
    }

    pub fn staged_path(&self) -> &Path {
        &self.staged
    }

    pub fn corrected_path(&self) -> &Path {
        &self.corrected
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint
    }
}

impl LedgerStore for CsvLedgerStore {
    fn load(&self) -> Result<Option<Ledger>, LedgerError> {
        if !self.staged.exists() {
            return Ok(None);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.staged)?;
        let records = reader
            .deserialize::<PositionRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "Loaded {} staged records from {}",
            records.len(),
            self.staged.display()
        );
        Ledger::from_records(records).map(Some)
    }

    fn load_checkpoint(&self) -> Result<Option<Checkpoint>, LedgerError> {
        match fs::read_to_string(&self.checkpoint) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, ledger: &Ledger, checkpoint: &Checkpoint) -> Result<(), LedgerError> {
        write_atomic(&self.staged, &to_csv(ledger.records())?)?;
        write_atomic(&self.checkpoint, &serde_json::to_vec_pretty(checkpoint)?)?;
        debug!(
            "Staged {} records, checkpoint at frame {}",
            ledger.len(),
            checkpoint.frame_pos
        );
        Ok(())
    }

    fn save_corrected(&mut self, records: &[CorrectedRecord]) -> Result<(), LedgerError> {
        write_atomic(&self.corrected, &to_csv(records)?)?;
        info!("Corrected ledger written to {}", self.corrected.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), LedgerError> {
        for path in [&self.staged, &self.corrected, &self.checkpoint] {
            remove_if_exists(path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    ledger: Option<Ledger>,
    checkpoint: Option<Checkpoint>,
    corrected: Option<Vec<CorrectedRecord>>,
    saves: usize,
}

/// In-memory store; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn ledger(&self) -> Option<Ledger> {
        self.lock().ledger.clone()
    }

    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.lock().checkpoint.clone()
    }

    pub fn corrected(&self) -> Option<Vec<CorrectedRecord>> {
        self.lock().corrected.clone()
    }

    /// Number of staged saves so far.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Option<Ledger>, LedgerError> {
        Ok(self.ledger())
    }

    fn load_checkpoint(&self) -> Result<Option<Checkpoint>, LedgerError> {
        Ok(self.checkpoint())
    }

    fn save(&mut self, ledger: &Ledger, checkpoint: &Checkpoint) -> Result<(), LedgerError> {
        let mut state = self.lock();
        state.ledger = Some(ledger.clone());
        state.checkpoint = Some(checkpoint.clone());
        state.saves += 1;
        Ok(())
    }

    fn save_corrected(&mut self, records: &[CorrectedRecord]) -> Result<(), LedgerError> {
        self.lock().corrected = Some(records.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), LedgerError> {
        *self.lock() = MemoryState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::correct_end_times;
    use crate::core::ocr::RowFields;

    fn ledger() -> Ledger {
        let fields = |time: &str, kind: &str| RowFields {
            time: time.into(),
            kind: kind.into(),
            size: "0.10".into(),
            symbol: "xauusd".into(),
            price: "1925.50".into(),
        };
        let mut ledger = Ledger::new();
        ledger
            .open(PositionRecord::open(
                "101".into(),
                fields("2023-08-15 14:30:25", "buy "),
                0,
            ))
            .unwrap();
        ledger
            .open(PositionRecord::open(
                "102".into(),
                fields("2023-08-15 15:00:00", "sell"),
                8,
            ))
            .unwrap();
        ledger
            .close("101", "15:10:00".into(), "1930.00".into())
            .unwrap();
        ledger
    }

    #[test]
    fn test_staged_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvLedgerStore::new(dir.path(), "session");
        let checkpoint = Checkpoint {
            frame_pos: 8,
            visible: VisibleRows::new(vec!["102".into()]),
            commits: 1,
        };
        store.save(&ledger(), &checkpoint).unwrap();

        let text = fs::read_to_string(dir.path().join("session_raw.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Order,Time,Type,Size,Symbol,Price,End Time,End Price,frame_pos"
        );
        assert_eq!(
            lines[1],
            "101,2023-08-15 14:30:25,buy ,0.10,xauusd,1925.50,15:10:00,1930.00,0"
        );
        assert_eq!(
            lines[2],
            "102,2023-08-15 15:00:00,sell,0.10,xauusd,1925.50,,,8"
        );
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_reload_staged_ledger_and_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvLedgerStore::new(dir.path(), "session");
        assert!(store.load().unwrap().is_none());
        assert!(store.load_checkpoint().unwrap().is_none());

        let checkpoint = Checkpoint {
            frame_pos: 8,
            visible: VisibleRows::new(vec!["102".into()]),
            commits: 1,
        };
        store.save(&ledger(), &checkpoint).unwrap();

        let reopened = CsvLedgerStore::new(dir.path(), "session");
        assert_eq!(reopened.load().unwrap(), Some(ledger()));
        assert_eq!(reopened.load_checkpoint().unwrap(), Some(checkpoint));
    }

    #[test]
    fn test_empty_ledger_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvLedgerStore::new(dir.path(), "empty");
        store.save(&Ledger::new(), &Checkpoint::default()).unwrap();

        assert_eq!(store.load().unwrap(), Some(Ledger::new()));
        let text = fs::read_to_string(store.staged_path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_corrected_csv_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvLedgerStore::new(dir.path(), "session");
        store.save(&ledger(), &Checkpoint::default()).unwrap();
        store
            .save_corrected(&correct_end_times(&ledger()).unwrap())
            .unwrap();

        let text = fs::read_to_string(store.corrected_path()).unwrap();
        assert!(text.contains("15:10:00"));
        assert!(text.contains("2023-08-15 15:10:00"));

        store.clear().unwrap();
        assert!(!store.staged_path().exists());
        assert!(!store.corrected_path().exists());
        assert!(!store.checkpoint_path().exists());
        // 重复清理不报错
        store.clear().unwrap();
    }

    #[test]
    fn test_paths_follow_video_name() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("session-01.mp4");
        let store = CsvLedgerStore::for_video(&video, None).unwrap();
        assert_eq!(store.staged_path(), dir.path().join("session-01_raw.csv"));

        let out = dir.path().join("out");
        let store = CsvLedgerStore::for_video(&video, Some(&out)).unwrap();
        assert_eq!(store.corrected_path(), out.join("session-01.csv"));
        assert_eq!(
            store.checkpoint_path(),
            out.join("session-01_checkpoint.json")
        );
        assert!(out.is_dir());
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryLedgerStore::new();
        let mut handle = store.clone();
        handle.save(&ledger(), &Checkpoint::default()).unwrap();

        assert_eq!(store.ledger(), Some(ledger()));
        assert_eq!(store.saves(), 1);
        handle.clear().unwrap();
        assert!(store.ledger().is_none());
    }
}
