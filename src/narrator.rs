// ============================================
// src/narrator.rs
// 意味 (英語) の読み上げ
// ============================================

use std::fmt;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::words::WordRecord;

/// 意味 (英語) を読むときのロケール
pub const NARRATION_LOCALE: &str = "en-US";

/// 何を読み上げるか
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    /// 意味を英語で
    #[default]
    Definition,
    /// 原語をその言語の音声で
    Original,
}

impl AudioMode {
    pub fn next(self) -> AudioMode {
        match self {
            AudioMode::Definition => AudioMode::Original,
            AudioMode::Original => AudioMode::Definition,
        }
    }

    /// 読み上げる文とロケール
    pub fn utterance(self, word: &WordRecord) -> (&str, &'static str) {
        match self {
            AudioMode::Definition => (&word.definition, NARRATION_LOCALE),
            AudioMode::Original => (&word.original, word.language.tts_locale()),
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioMode::Definition => f.write_str("en"),
            AudioMode::Original => f.write_str("original"),
        }
    }
}

/// 読み上げの差し替え口。呼びっぱなしで結果は返さない
pub trait Narrator {
    /// 前の読み上げを止めてから読む
    fn speak(&mut self, text: &str, locale: &str, repeat: bool);
    fn stop(&mut self);
    fn is_speaking(&mut self) -> bool;
    /// UI ループから定期的に呼ばれる (リピート処理など)
    fn tick(&mut self) {}
}

/// 音を出さずにログだけ残す
#[derive(Debug, Default)]
pub struct SilentNarrator {
    current: Option<String>,
}

impl Narrator for SilentNarrator {
    fn speak(&mut self, text: &str, locale: &str, repeat: bool) {
        tracing::debug!(text, locale, repeat, "narration (silent)");
        self.current = Some(text.to_string());
    }

    fn stop(&mut self) {
        self.current = None;
    }

    fn is_speaking(&mut self) -> bool {
        self.current.is_some()
    }
}

/// リピート時、読み終わってから次に読むまでの間
const REPEAT_GAP: Duration = Duration::from_millis(1500);

/// 設定が無いときに使う読み上げコマンド
pub const DEFAULT_SPEECH_COMMAND: &str = "espeak-ng";

/// 外部の読み上げコマンド (espeak-ng など) を起動する
#[derive(Debug)]
pub struct CommandNarrator {
    program: String,
    child: Option<Child>,
    utterance: Option<Utterance>,
}

#[derive(Debug, Clone)]
struct Utterance {
    text: String,
    locale: String,
    repeat: bool,
    /// 読み終わった時刻 (リピート待ち)
    finished_at: Option<Instant>,
}

impl CommandNarrator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            child: None,
            utterance: None,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn(&mut self, text: &str, locale: &str) {
        let voice = locale.split('-').next().unwrap_or("en");
        let spawned = Command::new(&self.program)
            .arg("-v")
            .arg(voice)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => self.child = Some(child),
            Err(e) => {
                // 読み上げが無くても練習は続けられる
                tracing::warn!(program = %self.program, error = %e, "speech command failed");
                self.child = None;
                self.utterance = None;
            }
        }
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// 子プロセスが生きているか。終わっていれば回収する
    fn child_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => {
                self.child = None;
                false
            }
        }
    }
}

impl Default for CommandNarrator {
    fn default() -> Self {
        Self::new(DEFAULT_SPEECH_COMMAND)
    }
}

impl Narrator for CommandNarrator {
    fn speak(&mut self, text: &str, locale: &str, repeat: bool) {
        self.stop();
        self.utterance = Some(Utterance {
            text: text.to_string(),
            locale: locale.to_string(),
            repeat,
            finished_at: None,
        });
        self.spawn(text, locale);
    }

    fn stop(&mut self) {
        self.utterance = None;
        self.kill_child();
    }

    fn is_speaking(&mut self) -> bool {
        self.child_running()
    }

    fn tick(&mut self) {
        if self.child_running() {
            return;
        }
        let Some(utterance) = self.utterance.as_mut() else {
            return;
        };
        if !utterance.repeat {
            self.utterance = None;
            return;
        }
        let finished_at = utterance.finished_at;
        match finished_at {
            None => utterance.finished_at = Some(Instant::now()),
            Some(at) if at.elapsed() >= REPEAT_GAP => {
                utterance.finished_at = None;
                let (text, locale) = (utterance.text.clone(), utterance.locale.clone());
                self.spawn(&text, &locale);
            }
            Some(_) => {}
        }
    }
}

impl Drop for CommandNarrator {
    fn drop(&mut self) {
        self.kill_child();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_narrator_tracks_speaking_state() {
        let mut n = SilentNarrator::default();
        assert!(!n.is_speaking());
        n.speak("water", "en-US", false);
        assert!(n.is_speaking());
        n.stop();
        assert!(!n.is_speaking());
    }

    #[test]
    fn audio_mode_picks_text_and_locale() {
        let word = WordRecord {
            id: "ar-1".into(),
            original: "شكرا".into(),
            romanized: Some("shukran".into()),
            definition: "thank you".into(),
            language: crate::words::Language::Arabic,
            frequency: Some(1),
        };
        assert_eq!(AudioMode::Definition.utterance(&word), ("thank you", "en-US"));
        assert_eq!(AudioMode::Original.utterance(&word), ("شكرا", "ar-SA"));
        assert_eq!(AudioMode::Original.next(), AudioMode::Definition);
    }

    #[test]
    fn default_program_is_espeak() {
        assert_eq!(CommandNarrator::default().program(), "espeak-ng");
    }

    #[test]
    fn missing_program_degrades_quietly() {
        let mut n = CommandNarrator::new("jern-test-no-such-speech-program");
        n.speak("water", "en-US", true);
        assert!(!n.is_speaking());
        n.tick();
        assert!(!n.is_speaking());
    }
}
