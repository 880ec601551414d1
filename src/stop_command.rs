use anyhow::{Context, Result};
use log::info;

use crate::service::Kokizami;
use crate::store::{EntryStore, TagStore};
use crate::time_entry::TimeEntry;

/// `stop`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct StopArgs {
    #[clap(help = "ID of the task to stop. Stops all on-going tasks when omitted")]
    id: Option<i64>,
}

pub struct StopCommand<'a, E: EntryStore, T: TagStore> {
    kokizami: &'a Kokizami<'a, E, T>,
}

impl<'a, E: EntryStore, T: TagStore> StopCommand<'a, E, T> {
    /// 新しい`StopCommand`を返す。
    pub fn new(kokizami: &'a Kokizami<'a, E, T>) -> Self {
        Self { kokizami }
    }

    /// `stop`サブコマンドの処理を行う。
    ///
    /// IDが指定された場合はそのタスクを、指定されていない場合は計測中の全てのタスクを停止し、
    /// 停止したタスクを返す。
    pub fn run(&self, stop: StopArgs) -> Result<Vec<TimeEntry>> {
        let stopped = match stop.id {
            Some(id) => vec![self
                .kokizami
                .stop(id)
                .with_context(|| format!("Failed to stop task: {}", id))?],
            None => self
                .kokizami
                .stop_all()
                .context("Failed to stop on-going tasks")?,
        };
        info!("{} tasks stopped.", stopped.len());

        Ok(stopped)
    }
}
