use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::KokizamiError;

/// 画面表示およびエディタで利用する日時のフォーマット。
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 現在のUTC時間を取得する。
#[cfg(not(test))]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// 秒未満を切り捨てた現在のUTC時間を取得する。
///
/// ストレージは秒精度で保存するため、記録する時刻は必ずこの関数で取得する。
pub fn now_in_secs() -> DateTime<Utc> {
    now().trunc_subsecs(0)
}

/// 「まだ停止していない」ことを表す停止時刻(1970-01-01 00:00:00 UTC)。
pub fn not_stopped() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// UTC時間をLocalタイムゾーンの表示用文字列にする。
pub fn format_local(datetime: &DateTime<Utc>) -> String {
    datetime.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}

/// Localタイムゾーンの`YYYY-MM-DD HH:MM:SS`をパースする。
pub fn parse_local(s: &str) -> Result<DateTime<Utc>> {
    parse_in(s, &Local)
}

/// `stored`を表示した文字列と同じであれば`stored`をそのまま返し、
/// そうでなければLocalタイムゾーンとしてパースする。
///
/// 夏時間の終わりの重複した時間帯は文字列から一意に戻せないため、
/// 編集されていない値は保存されている値を優先する。
pub fn parse_local_or_keep(s: &str, stored: &DateTime<Utc>) -> Result<DateTime<Utc>> {
    if s.trim() == format_local(stored) {
        return Ok(*stored);
    }
    parse_local(s)
}

/// 指定されたタイムゾーンの`YYYY-MM-DD HH:MM:SS`をパースする。
///
/// 夏時間の終わりで2通りに解釈できる時刻は早い方とする。
/// 夏時間の始まりで存在しない時刻はエラーとする。
fn parse_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let naive_datetime = NaiveDateTime::parse_from_str(s.trim(), DISPLAY_FORMAT)
        .with_context(|| format!("Failed to parse datetime: {}", s))?;
    let datetime = tz
        .from_local_datetime(&naive_datetime)
        .earliest()
        .with_context(|| format!("Nonexistent local datetime: {}", s))?
        .with_timezone(&Utc);

    Ok(datetime)
}

static MONTH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("Invalid regex"));

/// 集計対象の月(`YYYY-MM`)。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// `YYYY-MM`形式の文字列をパースする。
    ///
    /// ゼロ埋めされていない月(`2019-5`)や範囲外の月(`2019-13`)はエラーとする。
    pub fn parse(s: &str) -> Result<Self, KokizamiError> {
        let invalid = || {
            KokizamiError::Validation(format!("invalid month format, should be yyyy-mm: {}", s))
        };

        let captures = MONTH_PATTERN.captures(s).ok_or_else(invalid)?;
        let year: i32 = captures[1].parse().map_err(|_| invalid())?;
        let month: u32 = captures[2].parse().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;

        Ok(Self { year, month })
    }

    /// Localタイムゾーンでの今月を返す。
    pub fn current_local() -> Self {
        let today = now().with_timezone(&Local);
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    /// UTC時間がこの月に含まれるかを返す。
    pub fn contains(&self, datetime: &DateTime<Utc>) -> bool {
        datetime.year() == self.year && datetime.month() == self.month
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
