use std::io::Write;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::datetime::{self, Month};
use crate::summary::SummaryRow;
use crate::tag::Tag;
use crate::time_entry::TimeEntry;

/// タグなしの集計を表示する時のラベル。
const NO_TAG: &str = "-- No tag --";

/// Consoleにkokizamiの結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()>;

    /// タグを表示する。
    fn show_tags(&mut self, tags: &[Tag]) -> Result<()>;

    /// タグごとの集計と、その内訳の説明ごとの集計を表示する。
    ///
    /// # Arguments
    ///
    /// * `month` - 集計した月
    /// * `by_tag` - タグごとの集計
    /// * `details` - タグと説明の組ごとの集計
    fn show_summary(
        &mut self,
        month: &Month,
        by_tag: &[SummaryRow],
        details: &[SummaryRow],
    ) -> Result<()>;

    /// 説明ごとの集計を表示する。
    fn show_description_summary(&mut self, month: &Month, rows: &[SummaryRow]) -> Result<()>;
}

/// タブ区切りで表示する。
pub struct ConsoleTabSeparated<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleTabSeparated<'a, W> {
    /// 新しい`ConsoleTabSeparated`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleTabSeparated<'a, W> {
    // 開始時刻順に、ID、説明、開始時刻、停止時刻、経過時間を表示する。
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        if time_entries.is_empty() {
            writeln!(self.writer, "list is empty").context("Failed to write empty list")?;
            return Ok(());
        }

        let mut sorted_entries = time_entries.to_vec();
        sorted_entries.sort_by_key(|entry| entry.started_at);

        for entry in sorted_entries {
            writeln!(self.writer, "{}", entry_line(&entry))
                .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        Ok(())
    }

    fn show_tags(&mut self, tags: &[Tag]) -> Result<()> {
        for tag in tags {
            writeln!(self.writer, "{}\t{}", tag.id, tag.label)
                .with_context(|| format!("Failed to write tag: {:?}", tag))?;
        }
        Ok(())
    }

    fn show_summary(
        &mut self,
        month: &Month,
        by_tag: &[SummaryRow],
        details: &[SummaryRow],
    ) -> Result<()> {
        writeln!(self.writer, "Summary of {}", month).context("Failed to write summary")?;
        for row in by_tag {
            writeln!(
                self.writer,
                "{}\t{}",
                row.tag.as_deref().unwrap_or(NO_TAG),
                format_duration(row.elapsed)
            )
            .with_context(|| format!("Failed to write summary: {:?}", row))?;

            for detail in details.iter().filter(|detail| detail.tag == row.tag) {
                writeln!(
                    self.writer,
                    "  {}\t{}",
                    detail.description.as_deref().unwrap_or_default(),
                    format_duration(detail.elapsed)
                )
                .with_context(|| format!("Failed to write summary: {:?}", detail))?;
            }
        }
        Ok(())
    }

    fn show_description_summary(&mut self, month: &Month, rows: &[SummaryRow]) -> Result<()> {
        writeln!(self.writer, "Summary of {}", month).context("Failed to write summary")?;
        for row in rows {
            writeln!(
                self.writer,
                "{}\t{}\t{}",
                row.description.as_deref().unwrap_or_default(),
                row.count,
                format_duration(row.elapsed)
            )
            .with_context(|| format!("Failed to write summary: {:?}", row))?;
        }
        Ok(())
    }
}

/// タイムエントリーを1行の文字列にする。
///
/// 計測中の場合、停止時刻の欄には`*`を付けた現在時刻を表示する。
pub fn entry_line(entry: &TimeEntry) -> String {
    let stopped_at = if entry.is_active() {
        format!("*{}", datetime::format_local(&datetime::now()))
    } else {
        datetime::format_local(&entry.stopped_at)
    };
    format!(
        "{}\t{}\t{}\t{}\t{}",
        entry.id,
        entry.description,
        datetime::format_local(&entry.started_at),
        stopped_at,
        format_duration(entry.elapsed())
    )
}

/// 経過時間を秒単位に丸めて`1h2m3s`の形式にする。
pub fn format_duration(duration: Duration) -> String {
    let seconds = ((duration.num_milliseconds() + 500) / 1000).max(0);
    let (hours, minutes, seconds) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
