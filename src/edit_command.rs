use anyhow::{bail, Context, Result};
use log::info;

use crate::datetime;
use crate::editor::{self, Editor};
use crate::service::Kokizami;
use crate::store::{EntryStore, TagStore};
use crate::time_entry::TimeEntry;

/// 編集するフィールド。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditField {
    Description,
    StartedAt,
    StoppedAt,
}

/// `edit`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct EditArgs {
    #[clap(help = "ID of the task to edit")]
    id: i64,

    #[clap(
        help = "Field to edit: desc, started_at or stopped_at. Opens $EDITOR when omitted",
        parse(try_from_str = parse_field),
    )]
    field: Option<EditField>,

    #[clap(help = "New value. Datetimes are in the format YYYY-MM-DD HH:MM:SS (local time)")]
    value: Option<String>,
}

pub struct EditCommand<'a, E: EntryStore, T: TagStore> {
    kokizami: &'a Kokizami<'a, E, T>,
    editor: &'a Editor,
}

impl<'a, E: EntryStore, T: TagStore> EditCommand<'a, E, T> {
    /// 新しい`EditCommand`を返す。
    pub fn new(kokizami: &'a Kokizami<'a, E, T>, editor: &'a Editor) -> Self {
        Self { kokizami, editor }
    }

    /// `edit`サブコマンドの処理を行う。
    ///
    /// フィールドと値が指定された場合はそのフィールドだけを書き換え、
    /// 何も指定されなかった場合はエディタで説明、開始時刻、停止時刻をまとめて編集する。
    /// いずれの場合も、編集後の説明に合わせてタグを付け直す。
    pub fn run(&self, args: EditArgs) -> Result<TimeEntry> {
        let current = self
            .kokizami
            .get(args.id)
            .with_context(|| format!("Failed to get task: {}", args.id))?;

        let edited = match (args.field, args.value) {
            (Some(field), Some(value)) => apply_field(current, field, &value)?,
            (None, None) => self.edit_with_editor(current)?,
            _ => bail!("edit needs three arguments (id, [desc|started_at|stopped_at], [new value])"),
        };

        let entry = self
            .kokizami
            .edit_tagged(&edited)
            .with_context(|| format!("Failed to edit task: {}", args.id))?;
        info!("Task edited: {}", entry.id);

        Ok(entry)
    }

    fn edit_with_editor(&self, current: TimeEntry) -> Result<TimeEntry> {
        let text = self
            .editor
            .edit(&editor::entry_text(&current))
            .context("Failed to edit text with editor")?;
        editor::parse_entry_text(&text, &current)
    }
}

/// 1つのフィールドを書き換えた`TimeEntry`を返す。
fn apply_field(mut entry: TimeEntry, field: EditField, value: &str) -> Result<TimeEntry> {
    match field {
        EditField::Description => entry.description = value.to_string(),
        EditField::StartedAt => entry.started_at = datetime::parse_local(value)?,
        EditField::StoppedAt => entry.stopped_at = datetime::parse_local(value)?,
    }
    Ok(entry)
}

/// 編集するフィールド名をパースする。
fn parse_field(s: &str) -> Result<EditField> {
    match s {
        "desc" => Ok(EditField::Description),
        "started_at" => Ok(EditField::StartedAt),
        "stopped_at" => Ok(EditField::StoppedAt),
        _ => bail!("Unknown field: {}. should be desc, started_at or stopped_at", s),
    }
}
