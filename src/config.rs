// ============================================
// src/config.rs
// 設定ファイル (config.toml) の読み書き
// ============================================

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{JernError, Result};
use crate::narrator::AudioMode;
use crate::words::{Difficulty, Language};

/// アプリ設定。ファイルに無い項目は既定値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub language: Language,
    pub difficulty: Difficulty,
    /// 復習単語の差し込み
    pub active_recall: bool,
    /// 意味の読み上げを繰り返す
    pub audio_repeat: bool,
    /// 意味を読むか原語を読むか
    pub audio_mode: AudioMode,
    /// 単語パックのディレクトリ。未指定ならデータディレクトリの packs/
    pub data_dir: Option<PathBuf>,
    /// 読み上げコマンド。未指定なら読み上げない
    pub speech_command: Option<String>,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub enable_file_logs: bool,
    /// 未指定ならデータディレクトリの logs/
    pub dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: Language::Arabic,
            difficulty: Difficulty::Beginner,
            active_recall: true,
            audio_repeat: false,
            audio_mode: AudioMode::Definition,
            data_dir: None,
            speech_command: None,
            log: LogSettings::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_file_logs: true,
            dir: None,
        }
    }
}

impl AppConfig {
    /// TOML ファイルから読む
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| JernError::Config(e.to_string()))
    }

    /// ファイルがあれば読み、無ければ既定値
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| JernError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 既定の設定ファイルの場所
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().join("packs")),
        }
    }

    pub fn resolved_log_dir(&self) -> Result<PathBuf> {
        match &self.log.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().join("logs")),
        }
    }
}

pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("app", "jern", "JERN").ok_or(JernError::NoDataDir)
}
