// ============================================
// src/logging.rs
// tracing の初期化 (画面は TUI が使うのでログはファイルへ)
// ============================================

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: PathBuf,
    /// TUI を使わないコマンド (history など) では stderr にも出す
    pub to_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: PathBuf::from("./logs"),
            to_stderr: true,
        }
    }
}

/// 2回目以降の呼び出しは何もしない
pub fn init_tracing(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stderr_layer = config.to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
    });

    let file_layer = if config.enable_file_logs {
        match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("jern")
            .filename_suffix("log")
            .max_log_files(14)
            .build(&config.log_dir)
        {
            Ok(appender) => Some(fmt::layer().with_writer(appender).with_ansi(false)),
            Err(e) => {
                // ログが書けなくても練習はできる
                eprintln!("jern: file logging disabled: {e}");
                None
            }
        }
    } else {
        None
    };

    let _ = Registry::default()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LogConfig {
            enable_file_logs: true,
            log_dir: dir.path().to_path_buf(),
            ..LogConfig::default()
        };
        init_tracing(&cfg);
        init_tracing(&cfg);
    }
}
