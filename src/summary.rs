use std::collections::HashMap;

use chrono::Duration;

use crate::datetime::Month;
use crate::tag::Tag;
use crate::time_entry::TimeEntry;

/// 集計の単位。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grouping {
    /// タグごと。
    Tag,
    /// タスクの説明ごと。
    Description,
    /// タグと説明の組ごと。
    TagAndDescription,
}

/// 集計結果の1行。
///
/// `tag`が`None`の行はタグが付いていないタスクの集計を表す。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryRow {
    pub tag: Option<String>,
    pub description: Option<String>,
    pub count: usize,
    pub elapsed: Duration,
}

/// `TimeEntry`のIDからタグのラベル一覧を引けるようにする。
pub fn labels_by_entry(relations: Vec<(i64, Tag)>) -> HashMap<i64, Vec<String>> {
    relations
        .into_iter()
        .fold(HashMap::new(), |mut accumulate, (entry_id, tag)| {
            accumulate.entry(entry_id).or_default().push(tag.label);
            accumulate
        })
}

/// 指定された月の経過時間を集計する。
///
/// 開始時刻が`month`に含まれ、かつ停止済みの`TimeEntry`のみを対象とする。
/// 計測中のものは確定した経過時間がないため集計しない。
///
/// 結果はグループのラベル順(タグなしが先頭)に並ぶ。
/// `Grouping::TagAndDescription`の場合、同じタグ内の説明は開始時刻順で最初に現れた順とする。
///
/// # Arguments
///
/// * `entries` - 集計対象の候補
/// * `labels` - `TimeEntry`のIDごとのタグのラベル
/// * `month` - 集計する月
/// * `grouping` - 集計の単位
pub fn summarize(
    entries: &[TimeEntry],
    labels: &HashMap<i64, Vec<String>>,
    month: &Month,
    grouping: Grouping,
) -> Vec<SummaryRow> {
    let mut targets: Vec<&TimeEntry> = entries
        .iter()
        .filter(|entry| !entry.is_active() && month.contains(&entry.started_at))
        .collect();
    targets.sort_by_key(|entry| (entry.started_at, entry.id));

    let mut rows: Vec<SummaryRow> = Vec::new();
    let mut index: HashMap<(Option<String>, Option<String>), usize> = HashMap::new();

    for entry in targets {
        let tags: Vec<Option<String>> = match labels.get(&entry.id) {
            Some(labels) if !labels.is_empty() => labels.iter().cloned().map(Some).collect(),
            _ => vec![None],
        };
        let keys: Vec<(Option<String>, Option<String>)> = match grouping {
            Grouping::Tag => tags.into_iter().map(|tag| (tag, None)).collect(),
            Grouping::Description => vec![(None, Some(entry.description.clone()))],
            Grouping::TagAndDescription => tags
                .into_iter()
                .map(|tag| (tag, Some(entry.description.clone())))
                .collect(),
        };

        let elapsed = entry.elapsed();
        for key in keys {
            let position = *index.entry(key.clone()).or_insert_with(|| {
                rows.push(SummaryRow {
                    tag: key.0,
                    description: key.1,
                    count: 0,
                    elapsed: Duration::zero(),
                });
                rows.len() - 1
            });
            let row = &mut rows[position];
            row.count += 1;
            row.elapsed = row.elapsed + elapsed;
        }
    }

    // 安定ソートなので、同じタグ内の説明は出現順のまま残る
    match grouping {
        Grouping::Description => rows.sort_by(|a, b| a.description.cmp(&b.description)),
        Grouping::Tag | Grouping::TagAndDescription => rows.sort_by(|a, b| a.tag.cmp(&b.tag)),
    }

    rows
}
