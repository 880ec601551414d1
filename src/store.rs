use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::tag::Tag;
use crate::time_entry::TimeEntry;

/// `TimeEntry`を永続化するためのtrait。
///
/// 業務ルール(計測中のタスクは1件まで、など)は持たず、`Kokizami`が担う。
#[cfg_attr(test, mockall::automock)]
pub trait EntryStore {
    /// 現在時刻を開始時刻とし、未停止の`TimeEntry`を保存する。
    ///
    /// # Arguments
    ///
    /// * `description` - タスクの説明
    fn insert(&self, description: &str) -> Result<TimeEntry>;

    /// IDで`TimeEntry`を取得する。存在しない場合は`NotFound`を返す。
    fn find_by_id(&self, id: i64) -> Result<TimeEntry>;

    /// 全ての`TimeEntry`を返す。順序は保証しない。
    fn find_all(&self) -> Result<Vec<TimeEntry>>;

    /// 停止時刻が一致する`TimeEntry`を返す。
    ///
    /// `datetime::not_stopped()`を渡すと計測中のものが得られる。
    fn find_by_stopped_at(&self, stopped_at: DateTime<Utc>) -> Result<Vec<TimeEntry>>;

    /// `TimeEntry`の全フィールドを更新する。存在しない場合は`NotFound`を返す。
    fn update(&self, entry: &TimeEntry) -> Result<()>;

    /// `TimeEntry`を削除する。存在しない場合は`NotFound`を返す。
    fn delete(&self, entry: &TimeEntry) -> Result<()>;

    /// トランザクションを開始する。
    fn begin(&self) -> Result<()>;

    /// トランザクションをコミットする。
    fn commit(&self) -> Result<()>;

    /// トランザクションをロールバックする。
    fn rollback(&self) -> Result<()>;
}

/// `Tag`と、`TimeEntry`との関連を永続化するためのtrait。
#[cfg_attr(test, mockall::automock)]
pub trait TagStore {
    /// ラベルをまとめて保存する。
    ///
    /// 空文字はスキップし、既に存在するラベルはエラーにせず無視する。
    fn insert_labels(&self, labels: &[String]) -> Result<()>;

    /// 全ての`Tag`を返す。
    fn find_all(&self) -> Result<Vec<Tag>>;

    /// IDで`Tag`を取得する。存在しない場合は`NotFound`を返す。
    fn find_by_id(&self, id: i64) -> Result<Tag>;

    /// ラベルが一致する`Tag`を返す。一致しないラベルは単に結果に含まれない。
    fn find_by_labels(&self, labels: &[String]) -> Result<Vec<Tag>>;

    /// `TimeEntry`に関連付けられた`Tag`を返す。
    fn find_by_entry_id(&self, entry_id: i64) -> Result<Vec<Tag>>;

    /// 全ての関連を`(TimeEntryのID, Tag)`の組で返す。
    fn find_relations(&self) -> Result<Vec<(i64, Tag)>>;

    /// `Tag`とその関連を削除する。存在しない場合は`NotFound`を返す。
    fn delete(&self, id: i64) -> Result<()>;

    /// `TimeEntry`に`Tag`を関連付ける。既にある組は無視する。
    fn associate(&self, entry_id: i64, tag_ids: &[i64]) -> Result<()>;

    /// `TimeEntry`の関連を全て削除する。
    fn dissociate(&self, entry_id: i64) -> Result<()>;
}
