//! # Command Journal
//!
//! Records every command sent to the robot as JSON Lines.
//!
//! ```text
//! {"timestamp":"2026-10-19T12:00:00.125Z","command":"set_look_at_policy","look_at":3,"policy":"head_only"}
//! {"timestamp":"2026-10-19T12:00:00.130Z","command":"build_holonomic_line","line":{"x":-0.0,"y":-10.0,"duration_s":40.0}}
//! ```
//!
//! A new file is started after `max_records_per_file` records; only the newest
//! `max_files_to_keep` files are kept.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::robot::{
    AnimationHandle, AttachedFrameHandle, FrameHandle, HolonomicLine, LookAtHandle, LookAtPolicy,
    Transform,
};

const FILE_PREFIX: &str = "journal_";
const FILE_SUFFIX: &str = ".jsonl";

/// A command sent to the robot port.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RobotCommand {
    AttachFrame {
        base: FrameHandle,
        transform: Transform,
    },
    UpdateAttachedFrame {
        frame: AttachedFrameHandle,
        transform: Transform,
    },
    BuildLookAt {
        target: AttachedFrameHandle,
    },
    SetLookAtPolicy {
        look_at: LookAtHandle,
        policy: LookAtPolicy,
    },
    RunLookAt {
        look_at: LookAtHandle,
    },
    BuildHolonomicLine {
        line: HolonomicLine,
    },
    RunAnimation {
        animation: AnimationHandle,
    },
}

#[derive(Serialize)]
struct JournalRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    command: &'a RobotCommand,
}

/// Rotating JSONL writer.
#[derive(Debug)]
pub struct CommandJournal {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
}

impl CommandJournal {
    /// Creates a journal writing into `dir` (created if missing).
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Journaling robot commands to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Creates a journal from the `[telemetry]` config section.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the log directory cannot be created.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(
            &config.log_dir,
            config.max_records_per_file,
            config.max_files_to_keep,
        )
    }

    /// Appends one command.
    ///
    /// # Errors
    ///
    /// Returns `Journal` on serialization failure and `Io` on write failure.
    pub fn record(&mut self, command: &RobotCommand) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = JournalRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            command,
        };
        let line = serde_json::to_string(&record)?;

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Journal files in the directory, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be read.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| {
                        let name = name.to_string_lossy();
                        name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX)
                    })
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        // Never append to an existing file, e.g. one from an earlier run in the
        // same second; its records would not count towards the limit.
        let (path, file) = loop {
            let name = format!("{}{}_{:04}{}", FILE_PREFIX, stamp, self.file_seq, FILE_SUFFIX);
            self.file_seq += 1;

            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Journal file {} exists, trying next", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        };
        debug!("Opened journal file {}", path.display());
        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;

        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let files = self.files()?;
        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for old in files.iter().take(excess) {
            if let Err(e) = fs::remove_file(old) {
                warn!("Failed to remove old journal {}: {}", old.display(), e);
            } else {
                debug!("Removed old journal {}", old.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn policy_command() -> RobotCommand {
        RobotCommand::SetLookAtPolicy {
            look_at: LookAtHandle(3),
            policy: LookAtPolicy::HeadOnly,
        }
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_record_format() {
        let dir = tempdir().unwrap();
        let mut journal = CommandJournal::new(dir.path(), 100, 5).unwrap();
        journal.record(&policy_command()).unwrap();
        journal
            .record(&RobotCommand::BuildHolonomicLine {
                line: HolonomicLine::new(-10.0, 0.0, 40.0),
            })
            .unwrap();

        let files = journal.files().unwrap();
        assert_eq!(files.len(), 1);

        let lines = read_lines(&files[0]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["command"], "set_look_at_policy");
        assert_eq!(lines[0]["look_at"], 3);
        assert_eq!(lines[0]["policy"], "head_only");
        assert!(lines[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(lines[1]["command"], "build_holonomic_line");
        assert_eq!(lines[1]["line"]["x"], -10.0);
        assert_eq!(lines[1]["line"]["duration_s"], 40.0);
    }

    #[test]
    fn test_rotation_after_max_records() {
        let dir = tempdir().unwrap();
        let mut journal = CommandJournal::new(dir.path(), 2, 10).unwrap();
        for _ in 0..5 {
            journal.record(&policy_command()).unwrap();
        }

        let files = journal.files().unwrap();
        assert_eq!(files.len(), 3);
        let counts: Vec<usize> = files.iter().map(|f| read_lines(f).len()).collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_only_newest_files_kept() {
        let dir = tempdir().unwrap();
        let mut journal = CommandJournal::new(dir.path(), 1, 2).unwrap();
        for i in 0..4 {
            journal
                .record(&RobotCommand::RunAnimation {
                    animation: AnimationHandle(i),
                })
                .unwrap();
        }

        let files = journal.files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(read_lines(&files[0])[0]["animation"], 2);
        assert_eq!(read_lines(&files[1])[0]["animation"], 3);
    }

    #[test]
    fn test_foreign_files_untouched() {
        let dir = tempdir().unwrap();
        let foreign = dir.path().join("notes.txt");
        fs::write(&foreign, "keep me").unwrap();

        let mut journal = CommandJournal::new(dir.path(), 1, 1).unwrap();
        for _ in 0..3 {
            journal.record(&policy_command()).unwrap();
        }

        assert!(foreign.exists());
        assert_eq!(journal.files().unwrap().len(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut journal = CommandJournal::new(&nested, 10, 1).unwrap();
        journal.record(&policy_command()).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_restart_never_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        for _ in 0..2 {
            let mut journal = CommandJournal::new(dir.path(), 2, 10).unwrap();
            for _ in 0..2 {
                journal.record(&policy_command()).unwrap();
            }
        }

        let journal = CommandJournal::new(dir.path(), 2, 10).unwrap();
        let files = journal.files().unwrap();
        assert_eq!(files.len(), 2);
        for file in &files {
            assert_eq!(read_lines(file).len(), 2, "{} overfilled", file.display());
        }
    }
}
