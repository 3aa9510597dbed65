use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::actions::Action;
use super::error::Result;
use super::reducer::transition;
use super::state::AppState;

pub const SNAPSHOT_VERSION: u8 = 1;

const SNAPSHOT_SUFFIX: &str = "snapshot.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub seq: u64,
    pub ts_ms: i64,
    pub action: Action,
}

#[derive(Serialize)]
struct ActionRecordRef<'a> {
    seq: u64,
    ts_ms: i64,
    action: &'a Action,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u8,
    pub seq: u64,
    pub state: AppState,
}

/// Append-only JSON-lines log of dispatched actions, with a state snapshot
/// stored next to it.
#[derive(Debug)]
pub struct ActionJournal {
    path: PathBuf,
    snapshot_path: PathBuf,
    next_seq: u64,
}

impl ActionJournal {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let existing = load_records(path.as_path())?;
        let next_seq = existing
            .iter()
            .map(|record| record.seq)
            .max()
            .map_or(1, |seq| seq.saturating_add(1));
        let snapshot_path = snapshot_path_for(path.as_path());
        tracing::debug!(path = %path.display(), next_seq, "opened action journal");
        Ok(Self {
            path,
            snapshot_path,
            next_seq,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Sequence number of the last appended record, 0 when empty.
    pub fn last_seq(&self) -> u64 {
        self.next_seq.saturating_sub(1)
    }

    pub fn append(&mut self, action: &Action) -> Result<u64> {
        let seq = self.next_seq;
        let record = ActionRecordRef {
            seq,
            ts_ms: chrono::Utc::now().timestamp_millis(),
            action,
        };
        let line = serde_json::to_string(&record)?;
        append_line(self.path.as_path(), line.as_str())?;
        self.next_seq = self.next_seq.saturating_add(1);
        Ok(seq)
    }

    pub fn load(&self) -> Result<Vec<ActionRecord>> {
        load_records(self.path.as_path())
    }

    pub fn load_since(&self, seq_exclusive: u64) -> Result<Vec<ActionRecord>> {
        let records = self.load()?;
        Ok(records
            .into_iter()
            .filter(|record| record.seq > seq_exclusive)
            .collect())
    }

    pub fn save_snapshot(&self, snapshot: &StateSnapshot) -> Result<()> {
        let encoded = serde_json::to_vec(snapshot)?;
        std::fs::write(&self.snapshot_path, encoded)?;
        tracing::debug!(seq = snapshot.seq, "saved state snapshot");
        Ok(())
    }

    pub fn load_snapshot(&self) -> Result<Option<StateSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.snapshot_path)?;
        let snapshot = serde_json::from_slice::<StateSnapshot>(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                version = snapshot.version,
                "ignoring snapshot with unknown version"
            );
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Latest state: the snapshot (if any) plus every record after it.
    pub fn restore(&self) -> Result<AppState> {
        match self.load_snapshot()? {
            Some(snapshot) => {
                let tail = self.load_since(snapshot.seq)?;
                Ok(replay_from(snapshot.state, &tail))
            }
            None => Ok(replay(&self.load()?)),
        }
    }
}

pub fn replay(records: &[ActionRecord]) -> AppState {
    replay_from(AppState::default(), records)
}

pub fn replay_from(initial: AppState, records: &[ActionRecord]) -> AppState {
    let mut sorted: Vec<&ActionRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.seq);

    sorted
        .into_iter()
        .fold(initial, |state, record| transition(state, record.action.clone()))
}

// `<dir>/actions.jsonl` snapshots to `<dir>/actions.snapshot.json`.
fn snapshot_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("journal");
    path.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}.{SNAPSHOT_SUFFIX}"))
}

fn load_records(path: &Path) -> Result<Vec<ActionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ActionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(line = line_no + 1, error = %err, "skipping journal line");
            }
        }
    }
    Ok(records)
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::replay;
    use super::replay_from;
    use super::ActionJournal;
    use super::ActionRecord;
    use super::StateSnapshot;
    use super::SNAPSHOT_VERSION;
    use crate::actions::Action;
    use crate::state::ChatSession;
    use crate::state::RequestStatus;
    use crate::state::SessionId;
    use pretty_assertions::assert_eq;

    fn record(seq: u64, action: Action) -> ActionRecord {
        ActionRecord {
            seq,
            ts_ms: 0,
            action,
        }
    }

    #[test]
    fn append_records_are_monotonic() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("actions.jsonl");
        let mut journal = ActionJournal::open(&path).expect("open");
        let seq1 = journal.append(&Action::ToggleChatHistory).expect("append");
        let seq2 = journal
            .append(&Action::SetLoading(RequestStatus::Pending))
            .expect("append");

        assert_eq!(seq1, 1);
        assert_eq!(seq2, 2);
        assert_eq!(journal.last_seq(), 2);
        let loaded = journal.load().expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].action, Action::ToggleChatHistory);
        assert_eq!(loaded[1].seq, 2);

        let reopened = ActionJournal::open(&path).expect("reopen");
        assert_eq!(reopened.last_seq(), 2);
    }

    #[test]
    fn unparseable_lines_are_skipped() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("actions.jsonl");
        let mut journal = ActionJournal::open(&path).expect("open");
        journal.append(&Action::ToggleChatHistory).expect("append");
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut file| std::io::Write::write_all(&mut file, b"{not json\n\n"))
            .expect("corrupt");
        journal.append(&Action::ToggleChatHistory).expect("append");

        let loaded = journal.load().expect("load");
        let seqs: Vec<u64> = loaded.iter().map(|record| record.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn replay_applies_records_in_seq_order() {
        let records = vec![
            record(
                2,
                Action::UpdateCurrentChat(Some(ChatSession::new("1", "one"))),
            ),
            record(1, Action::FetchChatHistory(Some(Vec::new()))),
            record(
                3,
                Action::UpdateChatHistory(ChatSession::new("1", "one")),
            ),
        ];

        let state = replay(&records);
        assert_eq!(state.chat_history, Some(vec![SessionId::from("1")]));
    }

    #[test]
    fn snapshot_plus_tail_matches_full_replay() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("actions.jsonl");
        let mut journal = ActionJournal::open(&path).expect("open");

        journal
            .append(&Action::FetchChatHistory(Some(vec![
                ChatSession::new("1", "one"),
                ChatSession::new("2", "two"),
            ])))
            .expect("append");
        let seq = journal
            .append(&Action::UpdateCurrentChat(Some(ChatSession::new("2", "two"))))
            .expect("append");
        let at_snapshot = replay(&journal.load().expect("load"));
        journal
            .save_snapshot(&StateSnapshot {
                version: SNAPSHOT_VERSION,
                seq,
                state: at_snapshot,
            })
            .expect("save snapshot");
        journal
            .append(&Action::UpdateChatTitle {
                id: SessionId::from("2"),
                title: "renamed".to_string(),
            })
            .expect("append");

        let snapshot = journal
            .load_snapshot()
            .expect("load snapshot")
            .expect("snapshot present");
        let tail = journal.load_since(snapshot.seq).expect("tail");
        assert_eq!(tail.len(), 1);
        let restored = replay_from(snapshot.state, &tail);

        assert_eq!(restored, replay(&journal.load().expect("load")));
        assert_eq!(restored, journal.restore().expect("restore"));
        assert_eq!(
            restored
                .current_session()
                .map(|session| session.title.clone()),
            Some("renamed".to_string())
        );
    }

    #[test]
    fn journals_sharing_a_directory_keep_separate_snapshots() {
        let dir = tempdir().expect("tmpdir");
        let mut first = ActionJournal::open(dir.path().join("a.jsonl")).expect("open a");
        let mut second = ActionJournal::open(dir.path().join("b.jsonl")).expect("open b");
        assert_eq!(
            first.snapshot_path(),
            dir.path().join("a.snapshot.json").as_path()
        );

        for _ in 0..3 {
            first.append(&Action::ToggleChatHistory).expect("append a");
        }
        first
            .save_snapshot(&StateSnapshot {
                version: SNAPSHOT_VERSION,
                seq: first.last_seq(),
                state: first.restore().expect("restore a"),
            })
            .expect("save snapshot");
        second
            .append(&Action::SetLoading(RequestStatus::Pending))
            .expect("append b");

        assert!(second.load_snapshot().expect("load snapshot").is_none());
        let restored = second.restore().expect("restore b");
        assert!(restored.is_loading());
        assert!(!restored.is_chat_history_open);
        assert!(first.restore().expect("restore a").is_chat_history_open);
    }

    #[test]
    fn snapshot_with_unknown_version_is_ignored() {
        let dir = tempdir().expect("tmpdir");
        let journal = ActionJournal::open(dir.path().join("actions.jsonl")).expect("open");
        journal
            .save_snapshot(&StateSnapshot {
                version: SNAPSHOT_VERSION + 1,
                seq: 4,
                state: Default::default(),
            })
            .expect("save snapshot");

        assert!(journal.load_snapshot().expect("load snapshot").is_none());
    }
}
