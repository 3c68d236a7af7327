// Beacon - a location tracker for messaging-bot reporters
// Copyright (C) 2017-2018  Datong Sun (dndx@idndx.com)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! A JSON-lines journal on disk, one `LocationRecord` per line.
//!
//! Every append is written and synced before it becomes visible to
//! queries. The whole journal is replayed into memory on open.

use super::memory::Index;
use super::*;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Mutex;

/// What an append needs from the file underneath the journal.
trait Segment: Write {
    fn size(&self) -> io::Result<u64>;
    fn truncate(&mut self, size: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl Segment for File {
    fn size(&self) -> io::Result<u64> {
        self.metadata().map(|m| m.len())
    }

    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.set_len(size)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Writes `line` durably, or leaves the segment as it was.
fn commit<S: Segment>(seg: &mut S, line: &[u8]) -> Result<(), StorageError> {
    let size = seg.size()?;

    if let Err(e) = seg.write_all(line).and_then(|_| seg.sync()) {
        if let Err(t) = seg.truncate(size) {
            error!("unable to roll journal back to {} bytes: {}", size, t);
        }

        return Err(e.into());
    }

    Ok(())
}

struct Journal {
    file: File,
    index: Index,
}

pub struct JournalStore {
    journal: Mutex<Journal>,
}

impl JournalStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let index = replay(&mut file)?;
        info!(
            "opened journal {} with {} records",
            path.display(),
            index.len()
        );

        Ok(Self {
            journal: Mutex::new(Journal { file, index }),
        })
    }
}

/// Loads every record and cuts off a torn last line, so the next append
/// starts on a line of its own.
fn replay(file: &mut File) -> Result<Index, StorageError> {
    let mut index = Index::new();
    let mut line = String::new();
    let mut n = 0;
    let mut offset = 0_u64;
    // end of the last intact line
    let mut good = 0_u64;
    let mut terminated = true;
    let mut torn: Option<(usize, String)> = None;

    {
        let mut reader = BufReader::new(&*file);

        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }

            n += 1;
            offset += read as u64;

            if line.trim().is_empty() {
                if torn.is_none() {
                    good = offset;
                    terminated = line.ends_with('\n');
                }
                continue;
            }

            // only the very last line may be damaged
            if let Some((at, reason)) = torn.take() {
                return Err(StorageError::Corrupt { line: at, reason });
            }

            match serde_json::from_str::<LocationRecord>(&line) {
                Ok(record) => {
                    index.insert(record).map_err(|e| StorageError::Corrupt {
                        line: n,
                        reason: e.to_string(),
                    })?;

                    good = offset;
                    terminated = line.ends_with('\n');
                }
                Err(e) => torn = Some((n, e.to_string())),
            }
        }
    }

    if let Some((at, reason)) = torn.as_ref() {
        // a crash mid-append leaves a torn last line behind
        warn!("dropping torn journal tail at line {}: {}", at, reason);
        file.set_len(good)?;
    }

    if !terminated {
        file.write_all(b"\n")?;
    }

    if torn.is_some() || !terminated {
        file.sync_data()?;
    }

    Ok(index)
}

impl LocationStore for JournalStore {
    fn append(&self, record: &LocationRecord) -> Result<(), StorageError> {
        let mut journal = self.journal.lock().map_err(|_| StorageError::Poisoned)?;
        journal.index.check(record)?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        commit(&mut journal.file, line.as_bytes())?;

        journal.index.insert(record.clone())
    }

    fn most_recent(&self, reporter_id: &str) -> Result<Option<LocationRecord>, StorageError> {
        let journal = self.journal.lock().map_err(|_| StorageError::Poisoned)?;

        Ok(journal.index.most_recent(reporter_id))
    }

    fn history_for(&self, reporter_id: &str) -> Result<History, StorageError> {
        let journal = self.journal.lock().map_err(|_| StorageError::Poisoned)?;

        Ok(journal.index.history_for(reporter_id))
    }

    fn all_latest(&self) -> Result<HashMap<String, LocationRecord>, StorageError> {
        let journal = self.journal.lock().map_err(|_| StorageError::Poisoned)?;

        Ok(journal.index.all_latest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;
    use std::io;
    use tempfile::tempdir;

    fn record(id: &str, lat: f64, secs: i64) -> LocationRecord {
        let t0 = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();
        let report = PositionReport::new(id, "Ann", lat, 0.5, t0);

        LocationRecord::new(&report, t0 + Duration::seconds(secs))
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.jsonl");

        {
            let s = JournalStore::open(&path).unwrap();
            s.append(&record("u1", 1_f64, 0)).unwrap();
            s.append(&record("u1", 2_f64, 30)).unwrap();
            s.append(&record("u2", 3_f64, 10)).unwrap();
        }

        let s = JournalStore::open(&path).unwrap();
        assert_eq!(s.most_recent("u1").unwrap(), Some(record("u1", 2_f64, 30)));
        assert_eq!(
            s.history_for("u1").unwrap().into_vec(),
            vec![record("u1", 1_f64, 0), record("u1", 2_f64, 30)]
        );
        assert_eq!(s.all_latest().unwrap().len(), 2);

        s.append(&record("u1", 4_f64, 60)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 4);
    }

    #[test]
    fn test_rejected_append_is_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.jsonl");
        let s = JournalStore::open(&path).unwrap();

        s.append(&record("u1", 1_f64, 0)).unwrap();
        assert!(s.append(&record("u1", 2_f64, 0)).is_err());
        assert!(s.append(&record("u1", -95_f64, 1)).is_err());

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_torn_tail_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.jsonl");
        let mut content = serde_json::to_string(&record("u1", 1_f64, 0)).unwrap();
        content.push_str("\n{\"reporter_id\":\"u1\",\"displ");
        fs::write(&path, content).unwrap();

        {
            let s = JournalStore::open(&path).unwrap();
            assert_eq!(s.history_for("u1").unwrap().len(), 1);

            s.append(&record("u1", 2_f64, 30)).unwrap();
            s.append(&record("u1", 3_f64, 60)).unwrap();
        }

        let s = JournalStore::open(&path).unwrap();
        assert_eq!(
            s.history_for("u1").unwrap().into_vec(),
            vec![
                record("u1", 1_f64, 0),
                record("u1", 2_f64, 30),
                record("u1", 3_f64, 60),
            ]
        );
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_unterminated_last_line_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.jsonl");
        fs::write(&path, serde_json::to_string(&record("u1", 1_f64, 0)).unwrap()).unwrap();

        {
            let s = JournalStore::open(&path).unwrap();
            s.append(&record("u1", 2_f64, 30)).unwrap();
        }

        let s = JournalStore::open(&path).unwrap();
        assert_eq!(s.history_for("u1").unwrap().len(), 2);
    }

    #[test]
    fn test_damaged_line_before_tail_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.jsonl");
        let mut content = serde_json::to_string(&record("u1", 1_f64, 0)).unwrap();
        content.push_str("\n{\"reporter_id\":\"u1\",\"displ\n\n");
        content.push_str(&serde_json::to_string(&record("u1", 2_f64, 30)).unwrap());
        content.push('\n');
        fs::write(&path, content).unwrap();

        match JournalStore::open(&path) {
            Err(StorageError::Corrupt { line, .. }) => assert_eq!(line, 2),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("corrupt journal opened"),
        }
    }

    /// An in-memory segment that runs out of room after `room` bytes.
    struct Flaky {
        data: Vec<u8>,
        room: usize,
        sync_fails: bool,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left"));
            }

            let n = buf.len().min(self.room);
            self.data.extend_from_slice(&buf[..n]);
            self.room -= n;

            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Segment for Flaky {
        fn size(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn truncate(&mut self, size: u64) -> io::Result<()> {
            self.data.truncate(size as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            if self.sync_fails {
                Err(io::Error::new(io::ErrorKind::Other, "sync failed"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_failed_commit_leaves_nothing_behind() {
        let before = b"{\"reporter_id\":\"u1\"}\n".to_vec();

        let mut partial = Flaky {
            data: before.clone(),
            room: 5,
            sync_fails: false,
        };
        match commit(&mut partial, b"{\"reporter_id\":\"u2\"}\n") {
            Err(StorageError::Io(_)) => (),
            r => panic!("unexpected {:?}", r),
        }
        assert_eq!(partial.data, before);

        let mut unsynced = Flaky {
            data: before.clone(),
            room: 1024,
            sync_fails: true,
        };
        assert!(commit(&mut unsynced, b"{\"reporter_id\":\"u2\"}\n").is_err());
        assert_eq!(unsynced.data, before);

        let mut ok = Flaky {
            data: before.clone(),
            room: 1024,
            sync_fails: false,
        };
        commit(&mut ok, b"x\n").unwrap();
        assert_eq!(ok.data.len(), before.len() + 2);
    }

    #[test]
    fn test_corrupt_line_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.jsonl");
        let mut content = String::from("garbage\n");
        content.push_str(&serde_json::to_string(&record("u1", 1_f64, 0)).unwrap());
        content.push('\n');
        fs::write(&path, content).unwrap();

        match JournalStore::open(&path) {
            Err(StorageError::Corrupt { line, .. }) => assert_eq!(line, 1),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("corrupt journal opened"),
        }
    }
}
