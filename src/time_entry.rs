use chrono::{DateTime, Duration, Utc};

use crate::datetime;
use crate::error::{KokizamiError, Result};

/// 計測対象のタスク1件(kizami)。
///
/// `stopped_at`が`datetime::not_stopped()`の場合は計測中を表す。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeEntry {
    pub id: i64,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
}

impl TimeEntry {
    /// 現在時刻から開始する、未保存の`TimeEntry`を返す。
    ///
    /// IDはストレージへの保存時に採番されるため、ここでは0とする。
    ///
    /// # Arguments
    ///
    /// * `description` - タスクの説明。空文字の場合はエラーを返す。
    pub fn new(description: &str) -> Result<Self> {
        validate_description(description)?;

        Ok(Self {
            id: 0,
            description: description.to_string(),
            started_at: datetime::now_in_secs(),
            stopped_at: datetime::not_stopped(),
        })
    }

    /// 計測中かどうかを返す。
    pub fn is_active(&self) -> bool {
        self.stopped_at == datetime::not_stopped()
    }

    /// 経過時間を返す。
    ///
    /// 計測中の場合は現在時刻までの経過時間とする。
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(&datetime::now())
    }

    /// 指定時刻を「現在」とみなした経過時間を返す。
    ///
    /// 時刻の手動編集などで負になる場合は0とする。
    pub fn elapsed_at(&self, now: &DateTime<Utc>) -> Duration {
        let until = if self.is_active() {
            *now
        } else {
            self.stopped_at
        };
        let elapsed = until - self.started_at;
        if elapsed < Duration::zero() {
            Duration::zero()
        } else {
            elapsed
        }
    }
}

/// タスクの説明が空でないことを確認する。
pub fn validate_description(description: &str) -> Result<()> {
    if description.is_empty() {
        return Err(KokizamiError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    Ok(())
}
