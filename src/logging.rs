use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// ログの出力先と書式を設定する。
///
/// 出力は標準エラーとし、標準出力はコマンドの結果だけにする。
/// `verbose`が指定された場合は実行したSQLも出力される。
pub fn init(verbose: bool) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level(verbose))
        .chain(std::io::stderr())
        .apply()
        .context("Failed to initialize logger")?;

    Ok(())
}

fn level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;
    use rstest::rstest;

    use super::level;

    #[rstest]
    #[case::quiet(false, LevelFilter::Warn)]
    #[case::verbose(true, LevelFilter::Debug)]
    fn test_level(#[case] verbose: bool, #[case] expected: LevelFilter) {
        assert_eq!(level(verbose), expected);
    }
}
