use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;

use kokizami::config::Config;
use kokizami::console::{ConsolePresenter, ConsoleTabSeparated};
use kokizami::delete_command::{DeleteArgs, DeleteCommand};
use kokizami::edit_command::{EditArgs, EditCommand};
use kokizami::editor::Editor;
use kokizami::list_command::{ListArgs, ListCommand};
use kokizami::logging;
use kokizami::service::Kokizami;
use kokizami::sqlite::SqliteStore;
use kokizami::start_command::{RestartArgs, StartArgs, StartCommand};
use kokizami::stop_command::{StopArgs, StopCommand};
use kokizami::summary_command::{SummaryArgs, SummaryCommand, SummaryReport};
use kokizami::tags_command::{TagsArgs, TagsCommand};

/// タスクの時間を記録するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ kkzm start "write report #work"
/// $ kkzm stop
/// $ kkzm summary --month 2019-05
/// ```
#[derive(Debug, Parser)]
#[clap(name = "kkzm", version, about)]
struct Args {
    #[clap(long, global = true, help = "Enables verbose mode")]
    verbose: bool,

    #[clap(long, global = true, help = "Path to the database file")]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    subcommand: Option<SubCommands>,
}

/// サブコマンドを表す列挙型。省略時は`list`とする。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Starts a new task
    Start(StartArgs),
    /// Starts a new task with the description of an old one
    Restart(RestartArgs),
    /// Edits a task
    Edit(EditArgs),
    /// Shows the list of tasks
    List(ListArgs),
    /// Stops a task, or all on-going tasks
    Stop(StopArgs),
    /// Deletes a task
    Delete(DeleteArgs),
    /// Shows the summary of a month
    Summary(SummaryArgs),
    /// Shows the list of tags
    Tags(TagsArgs),
}

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.verbose)?;
    let config = Config::from_env(args.db).context("Failed to load configuration")?;

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open DB: {:?}", config.db_path))?;
    let result = run(&store, &config, args.subcommand);
    if let Err(e) = store.close() {
        warn!("Failed to close DB connection: {}", e);
    }

    result
}

/// サブコマンドを実行し、結果を標準出力に表示する。
fn run(store: &SqliteStore, config: &Config, subcommand: Option<SubCommands>) -> Result<()> {
    let kokizami = Kokizami::new(store, store);
    let editor = Editor::new(&config.editor);
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut presenter = ConsoleTabSeparated::new(&mut writer);

    match subcommand.unwrap_or(SubCommands::List(ListArgs::default())) {
        SubCommands::Start(start) => {
            let entry = StartCommand::new(&kokizami, &editor).run(start)?;
            presenter.show_time_entries(&[entry])?;
        }
        SubCommands::Restart(restart) => {
            let entry = StartCommand::new(&kokizami, &editor).restart(restart)?;
            presenter.show_time_entries(&[entry])?;
        }
        SubCommands::Edit(edit) => {
            let entry = EditCommand::new(&kokizami, &editor).run(edit)?;
            presenter.show_time_entries(&[entry])?;
        }
        SubCommands::List(list) => {
            let entries = ListCommand::new(&kokizami).run(list)?;
            presenter.show_time_entries(&entries)?;
        }
        SubCommands::Stop(stop) => {
            StopCommand::new(&kokizami).run(stop)?;
        }
        SubCommands::Delete(delete) => {
            DeleteCommand::new(&kokizami).run(delete)?;
        }
        SubCommands::Summary(summary) => match SummaryCommand::new(&kokizami).run(summary)? {
            SummaryReport::ByTag {
                month,
                by_tag,
                details,
            } => presenter.show_summary(&month, &by_tag, &details)?,
            SummaryReport::ByDescription { month, rows } => {
                presenter.show_description_summary(&month, &rows)?
            }
        },
        SubCommands::Tags(tags) => {
            let found = TagsCommand::new(&kokizami).run(tags)?;
            presenter.show_tags(&found)?;
        }
    }

    Ok(())
}
