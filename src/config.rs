use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// データベースのパスを指定する環境変数。
const DB_ENV: &str = "KOKIZAMI_DB";

/// エディタ未設定時に利用するコマンド。
const DEFAULT_EDITOR: &str = "vim";

/// 実行時の設定。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub editor: String,
}

impl Config {
    /// コマンドライン引数と環境変数から設定を作る。
    ///
    /// データベースのディレクトリが存在しない場合は作成する。
    ///
    /// # Arguments
    ///
    /// * `db_path` - `--db`で指定されたパス
    pub fn from_env(db_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::resolve(
            db_path,
            env::var(DB_ENV).ok(),
            env::var("EDITOR").ok(),
            dirs::home_dir(),
        )?;

        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        Ok(config)
    }

    /// 設定値を優先順位に従って決定する。
    ///
    /// データベースのパスは`--db`、`KOKIZAMI_DB`、`$HOME/.config/kokizami/db`の順に優先する。
    fn resolve(
        db_arg: Option<PathBuf>,
        db_env: Option<String>,
        editor_env: Option<String>,
        home_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let db_path = match (db_arg, db_env.filter(|s| !s.is_empty())) {
            (Some(path), _) => path,
            (None, Some(path)) => PathBuf::from(path),
            (None, None) => home_dir
                .context("Failed to get home directory")?
                .join(".config")
                .join("kokizami")
                .join("db"),
        };
        let editor = editor_env
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());

        Ok(Self { db_path, editor })
    }
}
