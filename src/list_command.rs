use anyhow::{Context, Result};
use log::info;

use crate::service::Kokizami;
use crate::store::{EntryStore, TagStore};
use crate::time_entry::TimeEntry;

/// `list`サブコマンドの引数。
#[derive(Debug, Default, clap::Args)]
pub struct ListArgs {}

pub struct ListCommand<'a, E: EntryStore, T: TagStore> {
    kokizami: &'a Kokizami<'a, E, T>,
}

impl<'a, E: EntryStore, T: TagStore> ListCommand<'a, E, T> {
    /// 新しい`ListCommand`を返す。
    pub fn new(kokizami: &'a Kokizami<'a, E, T>) -> Self {
        Self { kokizami }
    }

    /// `list`サブコマンドの処理を行う。並び替えは表示側で行う。
    pub fn run(&self, _list: ListArgs) -> Result<Vec<TimeEntry>> {
        let entries = self.kokizami.list().context("Failed to list tasks")?;
        info!("{} tasks retrieved.", entries.len());

        Ok(entries)
    }
}
