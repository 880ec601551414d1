/// タスクに付与するタグ。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

/// 文字列からハッシュタグを抽出する。
///
/// 空白区切りで`#`から始まる2文字以上のトークンを出現順に返す。重複は除かない。
pub fn extract_tags(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| token.starts_with('#') && token.len() >= 2)
        .map(str::to_string)
        .collect()
}
