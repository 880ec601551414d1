use anyhow::{Context, Result};
use log::info;

use crate::service::Kokizami;
use crate::store::{EntryStore, TagStore};
use crate::tag::Tag;

/// `tags`サブコマンドの引数。
#[derive(Debug, Default, clap::Args)]
pub struct TagsArgs {
    #[clap(long = "id", help = "Show tags of the specified task")]
    id: Option<i64>,

    #[clap(long = "delete", help = "Delete the tag with the specified ID")]
    delete: Option<i64>,
}

pub struct TagsCommand<'a, E: EntryStore, T: TagStore> {
    kokizami: &'a Kokizami<'a, E, T>,
}

impl<'a, E: EntryStore, T: TagStore> TagsCommand<'a, E, T> {
    /// 新しい`TagsCommand`を返す。
    pub fn new(kokizami: &'a Kokizami<'a, E, T>) -> Self {
        Self { kokizami }
    }

    /// `tags`サブコマンドの処理を行う。
    ///
    /// 削除するタグが指定された場合は先に削除する。
    /// タスクのIDが指定された場合はそのタスクのタグを、それ以外は全てのタグを返す。
    pub fn run(&self, tags: TagsArgs) -> Result<Vec<Tag>> {
        if let Some(tag_id) = tags.delete {
            self.kokizami
                .delete_tag(tag_id)
                .with_context(|| format!("Failed to delete tag: {}", tag_id))?;
        }

        let found = match tags.id {
            Some(id) => self
                .kokizami
                .tags_by_entry_id(id)
                .with_context(|| format!("Failed to get tags of task: {}", id))?,
            None => self.kokizami.tags().context("Failed to get tags")?,
        };
        info!("{} tags retrieved.", found.len());

        Ok(found)
    }
}
