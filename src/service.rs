use log::{debug, info, warn};

use crate::datetime::{self, Month};
use crate::error::Result;
use crate::store::{EntryStore, TagStore};
use crate::summary::{self, Grouping, SummaryRow};
use crate::tag::{extract_tags, Tag};
use crate::time_entry::{validate_description, TimeEntry};

/// kokizamiの操作をまとめたサービス。
///
/// 計測中のタスクが1件までであることと、タスクの説明とタグの対応を保つことに責任を持つ。
/// 永続化は`EntryStore`と`TagStore`に委譲する。
///
/// # Examples
///
/// ```ignore
/// let store = SqliteStore::open_in_memory()?;
/// let kokizami = Kokizami::new(&store, &store);
/// let entry = kokizami.start_tagged("write report #work")?;
/// kokizami.stop(entry.id)?;
/// ```
pub struct Kokizami<'a, E: EntryStore, T: TagStore> {
    entries: &'a E,
    tags: &'a T,
}

impl<'a, E: EntryStore, T: TagStore> Kokizami<'a, E, T> {
    /// 新しい`Kokizami`を返す。
    ///
    /// # Arguments
    ///
    /// * `entries` - `TimeEntry`のストア
    /// * `tags` - `Tag`のストア
    pub fn new(entries: &'a E, tags: &'a T) -> Self {
        Self { entries, tags }
    }

    /// 新しいタスクを開始する。
    ///
    /// 計測中のタスクがあれば先に全て停止する。説明が空の場合は何もせずエラーを返す。
    pub fn start(&self, description: &str) -> Result<TimeEntry> {
        validate_description(description)?;
        self.atomically(|| self.start_inner(description))
    }

    /// 新しいタスクを開始し、説明に含まれるハッシュタグを関連付ける。
    pub fn start_tagged(&self, description: &str) -> Result<TimeEntry> {
        validate_description(description)?;
        self.atomically(|| {
            let entry = self.start_inner(description)?;
            self.retag_inner(entry.id, &entry.description)?;
            Ok(entry)
        })
    }

    /// 過去のタスクと同じ説明で新しいタスクを開始する。
    pub fn restart(&self, id: i64) -> Result<TimeEntry> {
        let previous = self.entries.find_by_id(id)?;
        self.start_tagged(&previous.description)
    }

    /// IDでタスクを取得する。
    pub fn get(&self, id: i64) -> Result<TimeEntry> {
        self.entries.find_by_id(id)
    }

    /// タスクの説明、開始時刻、停止時刻を置き換える。
    ///
    /// 部分的な更新ではなく、渡された値で全て上書きする。保存後に読み直した値を返す。
    /// 停止時刻を未停止に戻した場合は、他の計測中のタスクを停止する。
    pub fn edit(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        validate_description(&entry.description)?;
        self.atomically(|| self.edit_inner(entry))
    }

    /// タスクを編集し、新しい説明に含まれるハッシュタグで関連を置き換える。
    ///
    /// 途中で失敗した場合は編集前の状態に戻る。
    pub fn edit_tagged(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        validate_description(&entry.description)?;
        self.atomically(|| {
            let edited = self.edit_inner(entry)?;
            self.retag_inner(edited.id, &edited.description)?;
            Ok(edited)
        })
    }

    /// タスクを停止する。
    pub fn stop(&self, id: i64) -> Result<TimeEntry> {
        let mut entry = self.entries.find_by_id(id)?;
        if !entry.is_active() {
            warn!("kizami {} has already been stopped. overwriting stopped_at", id);
        }
        entry.stopped_at = datetime::now_in_secs();
        self.entries.update(&entry)?;
        info!("Stopped kizami: {}", id);
        Ok(entry)
    }

    /// 計測中のタスクを全て停止する。
    ///
    /// 停止時刻は全て同じ値になる。
    pub fn stop_all(&self) -> Result<Vec<TimeEntry>> {
        self.atomically(|| self.stop_all_inner(None))
    }

    /// タスクとそのタグの関連を削除する。
    pub fn delete(&self, id: i64) -> Result<()> {
        self.atomically(|| {
            let entry = self.entries.find_by_id(id)?;
            self.tags.dissociate(entry.id)?;
            self.entries.delete(&entry)?;
            info!("Deleted kizami: {}", id);
            Ok(())
        })
    }

    /// 全てのタスクを返す。順序は保証しない。
    pub fn list(&self) -> Result<Vec<TimeEntry>> {
        self.entries.find_all()
    }

    /// 指定された月(`YYYY-MM`)の経過時間をタグごとに集計する。
    pub fn summary_by_tag(&self, yyyymm: &str) -> Result<Vec<SummaryRow>> {
        self.summary(yyyymm, Grouping::Tag)
    }

    /// 指定された月(`YYYY-MM`)の経過時間をタスクの説明ごとに集計する。
    pub fn summary_by_description(&self, yyyymm: &str) -> Result<Vec<SummaryRow>> {
        self.summary(yyyymm, Grouping::Description)
    }

    /// 指定された月(`YYYY-MM`)の経過時間をタグと説明の組ごとに集計する。
    pub fn summary_by_tag_and_description(&self, yyyymm: &str) -> Result<Vec<SummaryRow>> {
        self.summary(yyyymm, Grouping::TagAndDescription)
    }

    /// タスクのタグを指定されたものに置き換える。
    pub fn tagging(&self, entry_id: i64, tag_ids: &[i64]) -> Result<()> {
        self.atomically(|| {
            self.tags.dissociate(entry_id)?;
            self.tags.associate(entry_id, tag_ids)
        })
    }

    /// タスクのタグを全て外す。
    pub fn untagging(&self, entry_id: i64) -> Result<()> {
        self.tags.dissociate(entry_id)
    }

    /// タスクの関連を、説明に含まれるハッシュタグで置き換える。
    pub fn retag(&self, entry_id: i64, description: &str) -> Result<()> {
        self.atomically(|| self.retag_inner(entry_id, description))
    }

    /// 全てのタグを返す。
    pub fn tags(&self) -> Result<Vec<Tag>> {
        self.tags.find_all()
    }

    /// タスクに関連付けられたタグを返す。
    pub fn tags_by_entry_id(&self, entry_id: i64) -> Result<Vec<Tag>> {
        self.entries.find_by_id(entry_id)?;
        self.tags.find_by_entry_id(entry_id)
    }

    /// タグを削除する。
    pub fn delete_tag(&self, id: i64) -> Result<()> {
        self.tags.delete(id)?;
        info!("Deleted tag: {}", id);
        Ok(())
    }

    fn start_inner(&self, description: &str) -> Result<TimeEntry> {
        let stopped = self.stop_all_inner(None)?;
        if !stopped.is_empty() {
            info!("Stopped {} on-going kizami before starting", stopped.len());
        }
        let entry = self.entries.insert(description)?;
        info!("Started kizami: {}", entry.id);
        Ok(entry)
    }

    fn edit_inner(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        let mut current = self.entries.find_by_id(entry.id)?;
        if entry.stopped_at == datetime::not_stopped() {
            let stopped = self.stop_all_inner(Some(entry.id))?;
            if !stopped.is_empty() {
                info!("Stopped {} on-going kizami before resuming {}", stopped.len(), entry.id);
            }
        }
        current.description = entry.description.clone();
        current.started_at = entry.started_at;
        current.stopped_at = entry.stopped_at;
        self.entries.update(&current)?;
        info!("Edited kizami: {}", entry.id);

        self.entries.find_by_id(entry.id)
    }

    /// 計測中のタスクを同じ時刻で停止する。`except`のタスクは停止しない。
    fn stop_all_inner(&self, except: Option<i64>) -> Result<Vec<TimeEntry>> {
        let now = datetime::now_in_secs();
        let mut active: Vec<TimeEntry> = self
            .entries
            .find_by_stopped_at(datetime::not_stopped())?
            .into_iter()
            .filter(|entry| Some(entry.id) != except)
            .collect();
        for entry in active.iter_mut() {
            entry.stopped_at = now;
            self.entries.update(entry)?;
            debug!("Stopped kizami: {}", entry.id);
        }
        Ok(active)
    }

    fn retag_inner(&self, entry_id: i64, description: &str) -> Result<()> {
        self.tags.dissociate(entry_id)?;

        let labels = extract_tags(description);
        if labels.is_empty() {
            return Ok(());
        }
        self.tags.insert_labels(&labels)?;
        let tag_ids: Vec<i64> = self
            .tags
            .find_by_labels(&labels)?
            .iter()
            .map(|tag| tag.id)
            .collect();
        debug!("Tagging kizami {} with {:?}", entry_id, tag_ids);

        self.tags.associate(entry_id, &tag_ids)
    }

    fn summary(&self, yyyymm: &str, grouping: Grouping) -> Result<Vec<SummaryRow>> {
        let month = Month::parse(yyyymm)?;
        let entries = self.entries.find_all()?;
        let labels = summary::labels_by_entry(self.tags.find_relations()?);

        Ok(summary::summarize(&entries, &labels, &month, grouping))
    }

    /// 処理をトランザクション内で実行する。処理かコミットが失敗した場合はロールバックする。
    fn atomically<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        self.entries.begin()?;
        match f().and_then(|value| self.entries.commit().map(|_| value)) {
            Ok(value) => Ok(value),
            Err(e) => {
                if let Err(rollback_error) = self.entries.rollback() {
                    warn!("Failed to rollback: {}", rollback_error);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use mockall::predicate::eq;

    use super::Kokizami;
    use crate::datetime::{self, mock_datetime};
    use crate::error::KokizamiError;
    use crate::sqlite::SqliteStore;
    use crate::store::{MockEntryStore, MockTagStore};
    use crate::time_entry::TimeEntry;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 5, 1, 10, 0, 0).unwrap()
    }

    fn labels_of(kokizami: &Kokizami<'_, SqliteStore, SqliteStore>, id: i64) -> Vec<String> {
        kokizami
            .tags_by_entry_id(id)
            .unwrap()
            .into_iter()
            .map(|tag| tag.label)
            .collect()
    }

    /// start, stop, deleteの一連の流れを確認する。
    #[test]
    fn test_start_stop_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);

        mock_datetime::set_mock_time(t0());
        let started = kokizami.start("hoge").unwrap();
        assert_eq!(
            started,
            TimeEntry {
                id: 1,
                description: "hoge".to_string(),
                started_at: t0(),
                stopped_at: datetime::not_stopped(),
            }
        );

        let t1 = t0() + Duration::minutes(30);
        mock_datetime::set_mock_time(t1);
        kokizami.stop(1).unwrap();
        assert_eq!(
            kokizami.get(1).unwrap(),
            TimeEntry {
                stopped_at: t1,
                ..started
            }
        );

        kokizami.delete(1).unwrap();
        assert!(matches!(
            kokizami.get(1),
            Err(KokizamiError::NotFound { id: 1, .. })
        ));
    }

    #[test]
    fn test_start_empty_description() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);

        assert!(matches!(
            kokizami.start(""),
            Err(KokizamiError::Validation(_))
        ));
        assert!(kokizami.list().unwrap().is_empty());
    }

    /// 説明が空の場合はストアに触れないことを確認する。
    #[test]
    fn test_start_empty_description_does_not_touch_store() {
        let mut entries = MockEntryStore::new();
        entries.expect_begin().times(0);
        entries.expect_insert().times(0);
        let tags = MockTagStore::new();
        let kokizami = Kokizami::new(&entries, &tags);

        assert!(matches!(
            kokizami.start_tagged(""),
            Err(KokizamiError::Validation(_))
        ));
    }

    /// 新しいタスクを開始すると計測中のタスクが停止されることを確認する。
    #[test]
    fn test_start_stops_active_entry() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);

        mock_datetime::set_mock_time(t0());
        kokizami.start("first").unwrap();
        let t1 = t0() + Duration::hours(1);
        mock_datetime::set_mock_time(t1);
        kokizami.start("second").unwrap();

        let first = kokizami.get(1).unwrap();
        let second = kokizami.get(2).unwrap();
        assert_eq!(first.stopped_at, t1);
        assert!(second.is_active());
    }

    #[test]
    fn test_stop_all() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        mock_datetime::set_mock_time(t0());
        let first = store_insert(&store, "first");
        let second = store_insert(&store, "second");
        let stopped_at = t0() - Duration::hours(1);
        kokizami
            .edit(&TimeEntry {
                stopped_at,
                ..store_insert(&store, "already stopped")
            })
            .unwrap();

        let t1 = t0() + Duration::hours(2);
        mock_datetime::set_mock_time(t1);
        let stopped = kokizami.stop_all().unwrap();

        assert_eq!(stopped.len(), 2);
        assert!(kokizami.list().unwrap().iter().all(|e| !e.is_active()));
        assert_eq!(kokizami.get(first.id).unwrap().stopped_at, t1);
        assert_eq!(kokizami.get(second.id).unwrap().stopped_at, t1);
        assert_eq!(kokizami.get(3).unwrap().stopped_at, stopped_at);
    }

    /// 計測中のタスクはストア経由で直接作る(startは他を停止してしまうため)。
    fn store_insert(store: &SqliteStore, description: &str) -> TimeEntry {
        crate::store::EntryStore::insert(store, description).unwrap()
    }

    #[test]
    fn test_stop_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);

        assert!(matches!(
            kokizami.stop(42),
            Err(KokizamiError::NotFound { id: 42, .. })
        ));
        assert!(matches!(
            kokizami.delete(42),
            Err(KokizamiError::NotFound { id: 42, .. })
        ));
    }

    /// 編集した値がそのまま読み出せることを確認する。
    #[test]
    fn test_edit_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        let started = kokizami.start("hoge").unwrap();

        let edited = TimeEntry {
            id: started.id,
            description: "fuga".to_string(),
            started_at: t0(),
            stopped_at: t0() + Duration::hours(3),
        };
        let returned = kokizami.edit(&edited).unwrap();

        assert_eq!(returned, edited);
        assert_eq!(kokizami.get(started.id).unwrap(), edited);
    }

    #[test]
    fn test_edit_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);

        let missing = TimeEntry {
            id: 42,
            description: "fuga".to_string(),
            started_at: t0(),
            stopped_at: datetime::not_stopped(),
        };

        assert!(matches!(
            kokizami.edit(&missing),
            Err(KokizamiError::NotFound { id: 42, .. })
        ));
    }

    #[test]
    fn test_edit_tagged_replaces_tags() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        let started = kokizami.start_tagged("task #a #b").unwrap();
        assert_eq!(labels_of(&kokizami, started.id), vec!["#a", "#b"]);

        kokizami
            .edit_tagged(&TimeEntry {
                description: "task #c".to_string(),
                ..started.clone()
            })
            .unwrap();

        assert_eq!(labels_of(&kokizami, started.id), vec!["#c"]);
    }

    /// タグ付けは追加ではなく置き換えであることを確認する。
    #[test]
    fn test_tagging_replaces() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        let entry = kokizami.start("task").unwrap();
        crate::store::TagStore::insert_labels(
            &store,
            &["A".to_string(), "B".to_string(), "C".to_string()],
        )
        .unwrap();

        kokizami.tagging(entry.id, &[1, 2]).unwrap();
        kokizami.tagging(entry.id, &[3]).unwrap();

        assert_eq!(labels_of(&kokizami, entry.id), vec!["C"]);

        kokizami.untagging(entry.id).unwrap();
        assert!(labels_of(&kokizami, entry.id).is_empty());
    }

    #[test]
    fn test_restart() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        let first = kokizami.start_tagged("write report #work").unwrap();

        let restarted = kokizami.restart(first.id).unwrap();

        assert_ne!(restarted.id, first.id);
        assert_eq!(restarted.description, first.description);
        assert!(!kokizami.get(first.id).unwrap().is_active());
        assert_eq!(labels_of(&kokizami, restarted.id), vec!["#work"]);
        assert!(matches!(
            kokizami.restart(42),
            Err(KokizamiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_removes_relations() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        let entry = kokizami.start_tagged("task #a").unwrap();

        kokizami.delete(entry.id).unwrap();

        assert!(crate::store::TagStore::find_relations(&store)
            .unwrap()
            .is_empty());
        assert_eq!(kokizami.tags().unwrap().len(), 1);
    }

    #[test]
    fn test_summary() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        mock_datetime::set_mock_time(t0());
        kokizami.start_tagged("coding #dev").unwrap();
        mock_datetime::set_mock_time(t0() + Duration::hours(2));
        kokizami.start_tagged("lunch").unwrap();
        mock_datetime::set_mock_time(t0() + Duration::hours(3));
        kokizami.start_tagged("coding #dev").unwrap();

        let by_tag = kokizami.summary_by_tag("2019-05").unwrap();
        assert_eq!(by_tag.len(), 2);
        assert_eq!(by_tag[0].tag, None);
        assert_eq!(by_tag[0].elapsed, Duration::hours(1));
        assert_eq!(by_tag[1].tag.as_deref(), Some("#dev"));
        // 計測中の3件目は含まれない
        assert_eq!(by_tag[1].count, 1);
        assert_eq!(by_tag[1].elapsed, Duration::hours(2));

        let by_description = kokizami.summary_by_description("2019-05").unwrap();
        assert_eq!(by_description.len(), 2);

        let nested = kokizami.summary_by_tag_and_description("2019-05").unwrap();
        assert_eq!(nested.len(), 2);
    }

    #[test]
    fn test_summary_month_validation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);

        assert!(matches!(
            kokizami.summary_by_tag("2019-5"),
            Err(KokizamiError::Validation(_))
        ));
        assert!(matches!(
            kokizami.summary_by_description("bogus"),
            Err(KokizamiError::Validation(_))
        ));
        assert!(kokizami.summary_by_tag("2019-05").unwrap().is_empty());
    }

    /// 月の形式が不正な場合はストアに問い合わせないことを確認する。
    #[test]
    fn test_summary_month_validation_does_not_touch_store() {
        let mut entries = MockEntryStore::new();
        entries.expect_find_all().times(0);
        let mut tags = MockTagStore::new();
        tags.expect_find_relations().times(0);
        let kokizami = Kokizami::new(&entries, &tags);

        assert!(kokizami.summary_by_tag("bogus").is_err());
    }

    /// 途中で失敗した場合はロールバックされ、エラーがそのまま返ることを確認する。
    #[test]
    fn test_tagging_rolls_back_on_failure() {
        let mut entries = MockEntryStore::new();
        entries.expect_begin().times(1).returning(|| Ok(()));
        entries.expect_commit().times(0);
        entries.expect_rollback().times(1).returning(|| Ok(()));
        let mut tags = MockTagStore::new();
        tags.expect_dissociate()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(()));
        tags.expect_associate()
            .times(1)
            .returning(|_, _| Err(KokizamiError::tag_not_found(9)));
        let kokizami = Kokizami::new(&entries, &tags);

        assert!(matches!(
            kokizami.tagging(1, &[9]),
            Err(KokizamiError::NotFound { id: 9, .. })
        ));
    }

    /// 停止済みのタスクを未停止に戻すと、計測中だった他のタスクが停止されることを確認する。
    #[test]
    fn test_edit_to_active_stops_others() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        mock_datetime::set_mock_time(t0());
        let first = kokizami.start("a").unwrap();
        mock_datetime::set_mock_time(t0() + Duration::hours(1));
        let second = kokizami.start("b").unwrap();

        let t2 = t0() + Duration::hours(2);
        mock_datetime::set_mock_time(t2);
        let resumed = kokizami
            .edit_tagged(&TimeEntry {
                stopped_at: datetime::not_stopped(),
                ..first.clone()
            })
            .unwrap();

        let active: Vec<TimeEntry> = kokizami
            .list()
            .unwrap()
            .into_iter()
            .filter(|entry| entry.is_active())
            .collect();
        assert_eq!(active, vec![resumed]);
        assert_eq!(kokizami.get(second.id).unwrap().stopped_at, t2);
    }

    /// 計測中のタスク自身を編集しても停止されないことを確認する。
    #[test]
    fn test_edit_active_entry_keeps_it_active() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        let entry = kokizami.start("a").unwrap();

        let edited = kokizami
            .edit(&TimeEntry {
                description: "b".to_string(),
                ..entry
            })
            .unwrap();

        assert!(edited.is_active());
        assert_eq!(edited.description, "b");
    }

    /// 説明のハッシュタグでタグが置き換わり、ハッシュタグがなければ外れることを確認する。
    #[test]
    fn test_retag() {
        let store = SqliteStore::open_in_memory().unwrap();
        let kokizami = Kokizami::new(&store, &store);
        let entry = kokizami.start_tagged("task #a #b").unwrap();

        kokizami.retag(entry.id, "task #b #c").unwrap();
        assert_eq!(labels_of(&kokizami, entry.id), vec!["#b", "#c"]);

        kokizami.retag(entry.id, "task").unwrap();
        assert!(labels_of(&kokizami, entry.id).is_empty());
        assert_eq!(kokizami.tags().unwrap().len(), 3);
    }

    /// コミットに失敗した場合もロールバックされ、エラーが返ることを確認する。
    #[test]
    fn test_rollback_when_commit_fails() {
        let mut entries = MockEntryStore::new();
        entries.expect_begin().times(1).returning(|| Ok(()));
        entries
            .expect_commit()
            .times(1)
            .returning(|| Err(KokizamiError::Validation("busy".to_string())));
        entries.expect_rollback().times(1).returning(|| Ok(()));
        let mut tags = MockTagStore::new();
        tags.expect_dissociate().times(1).returning(|_| Ok(()));
        tags.expect_associate().times(1).returning(|_, _| Ok(()));
        let kokizami = Kokizami::new(&entries, &tags);

        assert!(matches!(
            kokizami.tagging(1, &[2]),
            Err(KokizamiError::Validation(_))
        ));
    }

    #[test]
    fn test_tags_by_entry_id_not_found() {
        let mut entries = MockEntryStore::new();
        entries
            .expect_find_by_id()
            .with(eq(42))
            .returning(|id| Err(KokizamiError::entry_not_found(id)));
        let mut tags = MockTagStore::new();
        tags.expect_find_by_entry_id().times(0);
        let kokizami = Kokizami::new(&entries, &tags);

        assert!(matches!(
            kokizami.tags_by_entry_id(42),
            Err(KokizamiError::NotFound { id: 42, .. })
        ));
    }
}
