use std::fs;
use std::io::Write;
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::debug;
use tempfile::NamedTempFile;

use crate::datetime;
use crate::time_entry::TimeEntry;

/// 外部エディタでテキストを編集する。
pub struct Editor {
    command: String,
}

impl Editor {
    /// 新しい`Editor`を返す。
    ///
    /// # Arguments
    ///
    /// * `command` - 起動するエディタのコマンド
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }

    /// 一時ファイルに`prewrite`を書き込んでエディタで開き、編集後の内容を返す。
    ///
    /// 一時ファイルは読み込み後に削除される。
    pub fn edit(&self, prewrite: &str) -> Result<String> {
        let mut file = NamedTempFile::new().context("Failed to open temporary file")?;
        file.write_all(prewrite.as_bytes())
            .context("Failed to write string on temporary file")?;
        file.flush().context("Failed to flush temporary file")?;

        debug!("Running editor: {} {:?}", self.command, file.path());
        let status = Command::new(&self.command)
            .arg(file.path())
            .status()
            .with_context(|| format!("Failed to run editor: {}", self.command))?;
        if !status.success() {
            bail!("Editor exited with {}", status);
        }

        fs::read_to_string(file.path())
            .with_context(|| format!("Failed to read file: {:?}", file.path()))
    }
}

/// エディタで編集するための、タスクのテキスト表現を返す。
///
/// 1行目が説明、2行目が開始時刻、3行目が停止時刻(いずれもLocalタイムゾーン)。
pub fn entry_text(entry: &TimeEntry) -> String {
    format!(
        "{}\n{}\n{}\n",
        entry.description,
        datetime::format_local(&entry.started_at),
        datetime::format_local(&entry.stopped_at)
    )
}

/// 編集されたテキストから説明を取り出す。
pub fn parse_description(text: &str) -> Result<String> {
    let description = text.lines().next().unwrap_or_default().trim();
    if description.is_empty() {
        bail!("invalid arguments. needs (desc)");
    }
    Ok(description.to_string())
}

/// 編集されたテキストから説明、開始時刻、停止時刻を取り出し、`current`に反映した値を返す。
///
/// 時刻の行が`entry_text`で書き出したままであれば、`current`の値を引き継ぐ。
pub fn parse_entry_text(text: &str, current: &TimeEntry) -> Result<TimeEntry> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 3 {
        bail!("invalid arguments. needs (desc, started_at, stopped_at)");
    }

    let started_at = datetime::parse_local_or_keep(lines[1], &current.started_at)
        .context("Failed to parse started_at")?;
    let stopped_at = datetime::parse_local_or_keep(lines[2], &current.stopped_at)
        .context("Failed to parse stopped_at")?;

    Ok(TimeEntry {
        description: lines[0].trim().to_string(),
        started_at,
        stopped_at,
        ..current.clone()
    })
}
