//! Checkpoint Store (component C8).
//!
//! Backed by `sled`, already a teacher dependency under its caching
//! section. Keys are `"{thread_id}\0{sequence:020}"`: the null byte keeps a
//! thread's keyspace below any other thread's ASCII content in sled's
//! lexicographic iteration order, and the zero-padded sequence keeps it
//! numerically ordered, so `latest()` is a bounded reverse range scan.

use codepulse_core::model::AnalysisState;

use crate::{EngineError, Result};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub sequence: u64,
    pub step_name: String,
    pub state: AnalysisState,
    pub created_at: String,
}

pub struct CheckpointStore {
    tree: sled::Tree,
}

impl CheckpointStore {
    /// Open (creating if absent) the sled database at `store_uri`, using
    /// `database` as the tree name within it.
    pub fn open(store_uri: &str, database: &str) -> Result<Self> {
        let db = sled::open(store_uri)?;
        let tree = db.open_tree(database)?;
        Ok(Self { tree })
    }

    /// Append a new checkpoint for `thread_id`, assigning it the next
    /// sequence number. Returns the assigned sequence.
    pub fn put(&self, thread_id: &str, step_name: &str, state: &AnalysisState) -> Result<u64> {
        let sequence = self.latest(thread_id)?.map_or(0, |c| c.sequence + 1);
        let checkpoint = Checkpoint {
            thread_id: thread_id.to_string(),
            sequence,
            step_name: step_name.to_string(),
            state: state.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let key = make_key(thread_id, sequence);
        let value = serde_json::to_vec(&checkpoint)?;
        self.tree.insert(key, value)?;
        self.tree.flush()?;
        Ok(sequence)
    }

    /// The most recently committed checkpoint for `thread_id`, if any.
    pub fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let mut lower = thread_id.as_bytes().to_vec();
        lower.push(0u8);
        let mut upper = lower.clone();
        upper.push(0xFFu8);

        match self.tree.range(lower..upper).next_back() {
            Some(Ok((_, value))) => Ok(Some(serde_json::from_slice(&value)?)),
            Some(Err(e)) => Err(EngineError::Store(e)),
            None => Ok(None),
        }
    }
}

fn make_key(thread_id: &str, sequence: u64) -> Vec<u8> {
    let mut key = thread_id.as_bytes().to_vec();
    key.push(0u8);
    key.extend(format!("{sequence:020}").into_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepulse_core::model::AnalysisState;
    use tempfile::tempdir;

    #[test]
    fn latest_returns_none_for_unknown_thread() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().to_str().unwrap(), "codepulse").unwrap();
        assert!(store.latest("missing").unwrap().is_none());
    }

    #[test]
    fn put_then_latest_round_trips() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().to_str().unwrap(), "codepulse").unwrap();
        let state = AnalysisState::new("https://example.com/repo.git");
        let seq = store.put("t1", "acquire_repo", &state).unwrap();
        assert_eq!(seq, 0);

        let checkpoint = store.latest("t1").unwrap().unwrap();
        assert_eq!(checkpoint.step_name, "acquire_repo");
        assert_eq!(checkpoint.state.repo_url, state.repo_url);
    }

    #[test]
    fn latest_returns_highest_sequence() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().to_str().unwrap(), "codepulse").unwrap();
        let mut state = AnalysisState::new("https://example.com/repo.git");
        store.put("t1", "acquire_repo", &state).unwrap();
        state.file_structure = "tree".to_string();
        store.put("t1", "extract_and_chunk", &state).unwrap();

        let checkpoint = store.latest("t1").unwrap().unwrap();
        assert_eq!(checkpoint.sequence, 1);
        assert_eq!(checkpoint.step_name, "extract_and_chunk");
    }

    #[test]
    fn threads_do_not_interfere() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().to_str().unwrap(), "codepulse").unwrap();
        store
            .put("thread-a", "acquire_repo", &AnalysisState::new("a"))
            .unwrap();
        store
            .put("thread-b", "acquire_repo", &AnalysisState::new("b"))
            .unwrap();
        store
            .put("thread-b", "extract_and_chunk", &AnalysisState::new("b"))
            .unwrap();

        assert_eq!(store.latest("thread-a").unwrap().unwrap().sequence, 0);
        assert_eq!(store.latest("thread-b").unwrap().unwrap().sequence, 1);
    }
}
