use anyhow::{Context, Result};
use log::info;

use crate::editor::{self, Editor};
use crate::service::Kokizami;
use crate::store::{EntryStore, TagStore};
use crate::time_entry::TimeEntry;

/// `start`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct StartArgs {
    #[clap(help = "Description of the new task. Opens $EDITOR when omitted")]
    description: Option<String>,
}

/// `restart`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct RestartArgs {
    #[clap(help = "ID of the task to restart")]
    id: i64,
}

pub struct StartCommand<'a, E: EntryStore, T: TagStore> {
    kokizami: &'a Kokizami<'a, E, T>,
    editor: &'a Editor,
}

impl<'a, E: EntryStore, T: TagStore> StartCommand<'a, E, T> {
    /// 新しい`StartCommand`を返す。
    ///
    /// # Arguments
    /// * `kokizami` - タスクを操作するサービス
    /// * `editor` - 説明が指定されなかった時に利用するエディタ
    pub fn new(kokizami: &'a Kokizami<'a, E, T>, editor: &'a Editor) -> Self {
        Self { kokizami, editor }
    }

    /// `start`サブコマンドの処理を行う。
    ///
    /// 計測中のタスクを停止してから新しいタスクを開始し、説明に含まれるハッシュタグを付与する。
    /// 説明が指定されていない場合は、エディタで入力された1行目を説明とする。
    pub fn run(&self, args: StartArgs) -> Result<TimeEntry> {
        let description = match args.description {
            Some(description) => description,
            None => {
                let text = self
                    .editor
                    .edit("")
                    .context("Failed to edit text with editor")?;
                editor::parse_description(&text)?
            }
        };

        let entry = self
            .kokizami
            .start_tagged(&description)
            .context("Failed to start a task")?;
        info!("Task started: {}", entry.id);

        Ok(entry)
    }

    /// `restart`サブコマンドの処理を行う。
    ///
    /// 指定されたタスクと同じ説明で新しいタスクを開始する。
    pub fn restart(&self, args: RestartArgs) -> Result<TimeEntry> {
        let entry = self
            .kokizami
            .restart(args.id)
            .with_context(|| format!("Failed to restart task: {}", args.id))?;
        info!("Task {} restarted as {}", args.id, entry.id);

        Ok(entry)
    }
}
