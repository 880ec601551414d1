use anyhow::{Context, Result};
use log::info;

use crate::datetime::Month;
use crate::service::Kokizami;
use crate::store::{EntryStore, TagStore};
use crate::summary::SummaryRow;

/// `summary`サブコマンドの引数。
#[derive(Debug, Default, clap::Args)]
pub struct SummaryArgs {
    #[clap(
        short = 'm',
        long = "month",
        help = "Sets a custom month in the format YYYY-MM"
    )]
    month: Option<String>,

    #[clap(long = "desc", help = "Show summary by description")]
    desc: bool,
}

/// `summary`サブコマンドの結果。
#[derive(Debug, PartialEq, Eq)]
pub enum SummaryReport {
    /// タグごとの集計と、タグと説明の組ごとの内訳。
    ByTag {
        month: Month,
        by_tag: Vec<SummaryRow>,
        details: Vec<SummaryRow>,
    },
    /// 説明ごとの集計。
    ByDescription { month: Month, rows: Vec<SummaryRow> },
}

pub struct SummaryCommand<'a, E: EntryStore, T: TagStore> {
    kokizami: &'a Kokizami<'a, E, T>,
}

impl<'a, E: EntryStore, T: TagStore> SummaryCommand<'a, E, T> {
    /// 新しい`SummaryCommand`を返す。
    pub fn new(kokizami: &'a Kokizami<'a, E, T>) -> Self {
        Self { kokizami }
    }

    /// `summary`サブコマンドの処理を行う。
    ///
    /// 月が指定されていない場合は、Localタイムゾーンで現在の月を利用する。
    pub fn run(&self, summary: SummaryArgs) -> Result<SummaryReport> {
        let yyyymm = summary
            .month
            .unwrap_or_else(|| Month::current_local().to_string());
        let month = Month::parse(&yyyymm)?;
        info!("Summary of {}", month);

        if summary.desc {
            let rows = self
                .kokizami
                .summary_by_description(&yyyymm)
                .context("Failed to summarize by description")?;
            return Ok(SummaryReport::ByDescription { month, rows });
        }

        let by_tag = self
            .kokizami
            .summary_by_tag(&yyyymm)
            .context("Failed to summarize by tag")?;
        let details = self
            .kokizami
            .summary_by_tag_and_description(&yyyymm)
            .context("Failed to summarize by tag and description")?;

        Ok(SummaryReport::ByTag {
            month,
            by_tag,
            details,
        })
    }
}
