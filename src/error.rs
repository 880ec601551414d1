use thiserror::Error;

/// kokizamiのコア処理が返すエラー。
#[derive(Debug, Error)]
pub enum KokizamiError {
    /// 入力値が不正。
    #[error("invalid argument: {0}")]
    Validation(String),

    /// 指定されたIDのレコードが存在しない。
    #[error("{kind} not found: id={id}")]
    NotFound { kind: &'static str, id: i64 },

    /// 永続化層でのエラー。
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl KokizamiError {
    /// `TimeEntry`が見つからない場合のエラーを返す。
    pub fn entry_not_found(id: i64) -> Self {
        Self::NotFound { kind: "kizami", id }
    }

    /// `Tag`が見つからない場合のエラーを返す。
    pub fn tag_not_found(id: i64) -> Self {
        Self::NotFound { kind: "tag", id }
    }
}

pub type Result<T> = std::result::Result<T, KokizamiError>;
