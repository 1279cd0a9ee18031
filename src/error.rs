// ============================================
// src/error.rs
// クレート共通のエラー型
// ============================================

use std::path::PathBuf;

use crate::words::Language;

/// JERN 全体で使うエラー型
#[derive(Debug, thiserror::Error)]
pub enum JernError {
    /// ファイル入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON の読み書きエラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// bincode エンコードエラー
    #[error("binary encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// bincode デコードエラー
    #[error("binary decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// 設定ファイルのエラー
    #[error("config error: {0}")]
    Config(String),

    /// 単語パックが見つからない
    #[error("no word pack for {language} at {}", path.display())]
    PackMissing { language: Language, path: PathBuf },

    /// 単語パックの中身が壊れている
    #[error("word pack for {language} is malformed: {reason}")]
    PackMalformed { language: Language, reason: String },

    /// 対話プロンプトのエラー
    #[error("prompt error: {0}")]
    Prompt(String),

    /// 保存先ディレクトリが決められない
    #[error("could not resolve a data directory")]
    NoDataDir,
}

/// 便利な Result エイリアス
pub type Result<T> = std::result::Result<T, JernError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_missing_message_names_language_and_path() {
        let err = JernError::PackMissing {
            language: Language::Russian,
            path: PathBuf::from("/data/ru.json"),
        };
        let msg = err.to_string();
        assert!(msg.contains("ru"));
        assert!(msg.contains("/data/ru.json"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: JernError = io.into();
        assert!(matches!(err, JernError::Io(_)));
    }
}
