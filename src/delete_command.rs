use anyhow::{Context, Result};
use log::info;

use crate::service::Kokizami;
use crate::store::{EntryStore, TagStore};

/// `delete`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct DeleteArgs {
    #[clap(help = "ID of the task to delete")]
    id: i64,
}

pub struct DeleteCommand<'a, E: EntryStore, T: TagStore> {
    kokizami: &'a Kokizami<'a, E, T>,
}

impl<'a, E: EntryStore, T: TagStore> DeleteCommand<'a, E, T> {
    /// 新しい`DeleteCommand`を返す。
    pub fn new(kokizami: &'a Kokizami<'a, E, T>) -> Self {
        Self { kokizami }
    }

    /// `delete`サブコマンドの処理を行う。
    pub fn run(&self, delete: DeleteArgs) -> Result<()> {
        self.kokizami
            .delete(delete.id)
            .with_context(|| format!("Failed to delete task: {}", delete.id))?;
        info!("Task deleted: {}", delete.id);

        Ok(())
    }
}
