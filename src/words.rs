// ============================================
// src/words.rs
// 単語データ・言語・難易度の定義
// ============================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transliterate::fold_latin;

/// 練習対象の言語 (シリアライズ時は ISO コード)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Language {
    #[serde(rename = "ar")]
    #[value(name = "ar")]
    Arabic,
    #[serde(rename = "es")]
    #[value(name = "es")]
    Spanish,
    #[serde(rename = "ru")]
    #[value(name = "ru")]
    Russian,
    #[serde(rename = "de")]
    #[value(name = "de")]
    German,
    #[serde(rename = "ur")]
    #[value(name = "ur")]
    Urdu,
    #[serde(rename = "zh")]
    #[value(name = "zh")]
    Chinese,
    #[serde(rename = "fr")]
    #[value(name = "fr")]
    French,
    #[serde(rename = "ko")]
    #[value(name = "ko")]
    Korean,
    #[serde(rename = "ja")]
    #[value(name = "ja")]
    Japanese,
}

impl Language {
    /// 画面・履歴の並び順
    pub const ALL: [Language; 9] = [
        Language::Arabic,
        Language::Spanish,
        Language::Russian,
        Language::German,
        Language::Urdu,
        Language::Chinese,
        Language::French,
        Language::Korean,
        Language::Japanese,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::Spanish => "es",
            Language::Russian => "ru",
            Language::German => "de",
            Language::Urdu => "ur",
            Language::Chinese => "zh",
            Language::French => "fr",
            Language::Korean => "ko",
            Language::Japanese => "ja",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::Arabic => "Arabic",
            Language::Spanish => "Spanish",
            Language::Russian => "Russian",
            Language::German => "German",
            Language::Urdu => "Urdu",
            Language::Chinese => "Chinese",
            Language::French => "French",
            Language::Korean => "Korean",
            Language::Japanese => "Japanese",
        }
    }

    pub fn country_code(self) -> &'static str {
        match self {
            Language::Arabic => "AE",
            Language::Spanish => "ES",
            Language::Russian => "RU",
            Language::German => "DE",
            Language::Urdu => "PK",
            Language::Chinese => "CN",
            Language::French => "FR",
            Language::Korean => "KR",
            Language::Japanese => "JP",
        }
    }

    /// 原語を読み上げるときのロケール
    pub fn tts_locale(self) -> &'static str {
        match self {
            Language::Arabic => "ar-SA",
            other => other.code(),
        }
    }

    /// 次の言語 (F2 キーで巡回)
    pub fn next(self) -> Language {
        let idx = Self::ALL.iter().position(|&l| l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown language code: {s}"))
    }
}

/// 難易度 (出現頻度ランクの範囲)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Hard];

    /// 頻度ランクの範囲 (両端を含む)
    pub fn range(self) -> FrequencyRange {
        match self {
            Difficulty::Beginner => FrequencyRange { min: 1, max: 500 },
            Difficulty::Intermediate => FrequencyRange { min: 501, max: 2000 },
            Difficulty::Hard => FrequencyRange { min: 2001, max: 5000 },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Hard => "hard",
        }
    }

    /// 次の難易度 (F3 キーで巡回)
    pub fn next(self) -> Difficulty {
        match self {
            Difficulty::Beginner => Difficulty::Intermediate,
            Difficulty::Intermediate => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Beginner,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyRange {
    pub min: u32,
    pub max: u32,
}

impl FrequencyRange {
    pub fn contains(&self, rank: u32) -> bool {
        rank >= self.min && rank <= self.max
    }
}

/// 1単語ぶんのデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub id: String,
    /// 表示用 (原語)
    pub original: String,
    /// タイピング用 (ローマ字)。無ければ出題前に翻字して埋める
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romanized: Option<String>,
    /// 読み上げる英語の意味
    pub definition: String,
    pub language: Language,
    /// 出現頻度ランク (1 が最頻出)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
}

impl WordRecord {
    /// 頻度ランク。未設定は 0 扱い
    pub fn rank(&self) -> u32 {
        self.frequency.unwrap_or(0)
    }

    pub fn romanized(&self) -> &str {
        self.romanized.as_deref().unwrap_or("")
    }

    /// 実際にタイプする文字列 (アクセント・記号を除いた小文字英数字)
    pub fn typing_target(&self) -> String {
        typing_target(self.romanized())
    }

    /// 履歴のグループ分け用。タグか id の接頭辞で言語を判定する
    pub fn belongs_to(&self, language: Language) -> bool {
        self.language == language || self.id.starts_with(language.code())
    }
}

/// ローマ字表記をタイピング用に正規化する
pub fn typing_target(romanized: &str) -> String {
    let mut out = String::with_capacity(romanized.len());
    for c in romanized.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if let Some(folded) = fold_latin(c) {
            out.extend(folded.chars().filter(char::is_ascii_alphanumeric));
        }
        // それ以外 (空白・記号・結合文字) は捨てる
    }
    out
}
