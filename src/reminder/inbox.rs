//! 投递记录收件箱 - 本地 JSONL 文件
//!
//! 桌面后端把延迟激活请求追加到这里，由应用持久层读取。

use anyhow::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::delivery::ActivationRequest;

const MAX_RECORDS: usize = 200;
const KEEP_AFTER_CLEANUP: usize = 100;
const CLEANUP_CHECK_INTERVAL: usize = 10;

pub struct ReminderInbox {
    path: PathBuf,
    writes: AtomicUsize,
}

impl ReminderInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条请求（带文件锁）
    pub fn append(&self, request: &ActivationRequest) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let written = writeln!(file, "{}", serde_json::to_string(request)?);
        file.unlock()?;
        written?;

        self.maybe_cleanup();
        Ok(())
    }

    /// 读取最近 N 条，按创建时间排序
    pub fn read_recent(&self, n: usize) -> Vec<ActivationRequest> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let records = parse_lines(BufReader::new(file));
        let start = records.len().saturating_sub(n);
        let mut recent = records[start..].to_vec();
        recent.sort_by_key(|r| r.created_at);
        recent
    }

    fn maybe_cleanup(&self) {
        let count = self.writes.fetch_add(1, Ordering::Relaxed);
        if count % CLEANUP_CHECK_INTERVAL != 0 {
            return;
        }
        if let Err(e) = self.cleanup() {
            tracing::warn!(path = %self.path.display(), error = %e, "Inbox cleanup failed");
        }
    }

    /// 超过上限时只保留最近的记录
    fn cleanup(&self) -> Result<()> {
        use fs2::FileExt;

        let file = File::open(&self.path)?;
        file.lock_exclusive()?;

        let records = parse_lines(BufReader::new(&file));
        if records.len() <= MAX_RECORDS {
            file.unlock()?;
            return Ok(());
        }

        let start = records.len().saturating_sub(KEEP_AFTER_CLEANUP);
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for record in &records[start..] {
                writeln!(temp_file, "{}", serde_json::to_string(record)?)?;
            }
        }

        fs::rename(&temp_path, &self.path)?;
        file.unlock()?;
        Ok(())
    }
}

fn parse_lines<R: BufRead>(reader: R) -> Vec<ActivationRequest> {
    reader
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::composer::ContentComposer;
    use crate::reminder::trigger::ReminderTrigger;

    fn request(id: i64) -> ActivationRequest {
        let trigger = ReminderTrigger::new(id, format!("note {}", id));
        let content = ContentComposer::default().compose(&trigger.raw_body);
        ActivationRequest::save_reminder(&trigger, &content)
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = ReminderInbox::new(dir.path().join("inbox.jsonl"));
        assert!(inbox.read_recent(10).is_empty());
    }

    #[test]
    fn test_append_and_read_recent() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = ReminderInbox::new(dir.path().join("nested").join("inbox.jsonl"));

        for id in 1..=5 {
            inbox.append(&request(id)).unwrap();
        }

        let recent = inbox.read_recent(2);
        let ids: Vec<i64> = recent.iter().map(|r| r.extras.reminder_id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn test_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inbox.jsonl");
        let inbox = ReminderInbox::new(&path);
        inbox.append(&request(1)).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"garbage\n")
            .unwrap();
        inbox.append(&request(2)).unwrap();

        assert_eq!(inbox.read_recent(10).len(), 2);
    }

    #[test]
    fn test_cleanup_trims_old_records() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = ReminderInbox::new(dir.path().join("inbox.jsonl"));

        for id in 1..=(MAX_RECORDS as i64 + 11) {
            inbox.append(&request(id)).unwrap();
        }

        let all = inbox.read_recent(usize::MAX);
        assert!(all.len() <= MAX_RECORDS);
        assert_eq!(all.last().unwrap().extras.reminder_id, MAX_RECORDS as i64 + 11);
    }
}
