// ============================================
// src/pack.rs
// 言語ごとの単語パック (語彙ソース) の読み込み
// ============================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use serde::Deserialize;

use crate::error::{JernError, Result};
use crate::words::{Language, WordRecord};

/// 読み込み済みの単語パック。中身は不変
#[derive(Debug, Clone)]
pub struct VocabularyPack {
    language: Language,
    words: Arc<[WordRecord]>,
}

impl VocabularyPack {
    /// 全単語に言語タグを付け直して作る
    pub fn new(language: Language, words: Vec<WordRecord>) -> Self {
        let words: Vec<WordRecord> = words
            .into_iter()
            .map(|mut w| {
                w.language = language;
                w
            })
            .collect();
        Self {
            language,
            words: words.into(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn words(&self) -> &[WordRecord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// パック JSON の1要素 (必須: id, original, definition)
#[derive(Debug, Deserialize)]
struct PackEntry {
    id: String,
    original: String,
    definition: String,
    #[serde(default)]
    romanized: Option<String>,
    #[serde(default)]
    frequency: Option<u32>,
}

impl PackEntry {
    fn into_word(self, language: Language) -> WordRecord {
        WordRecord {
            id: self.id,
            original: self.original,
            // 空文字は「無し」として扱い、出題時に翻字する
            romanized: self.romanized.filter(|r| !r.trim().is_empty()),
            definition: self.definition,
            language,
            frequency: self.frequency,
        }
    }
}

/// パック JSON (フラットな配列) を解釈する
pub fn parse_pack(language: Language, json: &str) -> Result<VocabularyPack> {
    let entries: Vec<PackEntry> =
        serde_json::from_str(json).map_err(|e| JernError::PackMalformed {
            language,
            reason: e.to_string(),
        })?;
    Ok(VocabularyPack::new(
        language,
        entries.into_iter().map(|e| e.into_word(language)).collect(),
    ))
}

/// 語彙ソース
pub trait PackSource: Send + Sync {
    fn load(&self, language: Language) -> Result<VocabularyPack>;
}

/// `<dir>/<code>.json` を読むソース
#[derive(Debug, Clone)]
pub struct DirPackSource {
    dir: PathBuf,
}

impl DirPackSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, language: Language) -> PathBuf {
        self.dir.join(format!("{}.json", language.code()))
    }
}

impl PackSource for DirPackSource {
    fn load(&self, language: Language) -> Result<VocabularyPack> {
        let path = self.path_for(language);
        if !path.exists() {
            return Err(JernError::PackMissing { language, path });
        }
        let json = fs::read_to_string(&path)?;
        parse_pack(language, &json)
    }
}

/// バックグラウンド読み込みの結果。どの言語の要求だったかを必ず持つ
#[derive(Debug)]
pub struct PackLoaded {
    pub language: Language,
    pub result: Result<VocabularyPack>,
}

/// 別スレッドでパックを読み、チャネルで結果を返す
pub struct PackLoader {
    source: Arc<dyn PackSource>,
    tx: Sender<PackLoaded>,
    rx: Receiver<PackLoaded>,
}

impl PackLoader {
    pub fn new(source: Arc<dyn PackSource>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { source, tx, rx }
    }

    /// 読み込みを開始する (待たない)
    pub fn request(&self, language: Language) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tracing::info!(%language, "loading word pack");
        let spawned = thread::Builder::new()
            .name(format!("pack-{language}"))
            .spawn(move || {
                let result = source.load(language);
                // 受信側が既に居なくても問題ない
                let _ = tx.send(PackLoaded { language, result });
            });
        if let Err(e) = spawned {
            let _ = self.tx.send(PackLoaded {
                language,
                result: Err(JernError::Io(e)),
            });
        }
    }

    /// 届いている結果をすべて取り出す
    pub fn drain(&self) -> Vec<PackLoaded> {
        let mut loaded = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(msg) => loaded.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        loaded
    }

    /// 次の結果が届くまで待つ (起動直後・テスト用)
    pub fn wait(&self) -> Option<PackLoaded> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": "ru-1", "original": "да", "romanized": "da", "definition": "yes", "frequency": 3},
        {"id": "ru-2", "original": "нет", "definition": "no"},
        {"id": "ru-3", "original": "мир", "romanized": "", "definition": "peace", "language": "es"}
    ]"#;

    #[test]
    fn parse_fills_optional_fields_and_stamps_language() {
        let pack = parse_pack(Language::Russian, SAMPLE).unwrap();
        assert_eq!(pack.len(), 3);
        assert!(pack.words().iter().all(|w| w.language == Language::Russian));
        assert_eq!(pack.words()[0].romanized.as_deref(), Some("da"));
        assert_eq!(pack.words()[1].romanized, None);
        assert_eq!(pack.words()[1].frequency, None);
        assert_eq!(pack.words()[2].romanized, None);
    }

    #[test]
    fn parse_rejects_missing_required_fields() {
        let err = parse_pack(Language::German, r#"[{"id": "de-1", "original": "ja"}]"#).unwrap_err();
        assert!(matches!(err, JernError::PackMalformed { language: Language::German, .. }));
    }

    #[test]
    fn dir_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirPackSource::new(dir.path());
        let err = source.load(Language::French).unwrap_err();
        assert!(matches!(err, JernError::PackMissing { language: Language::French, .. }));
    }

    #[test]
    fn dir_source_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("de.json"), r#"{"not": "an array"}"#).unwrap();
        let err = DirPackSource::new(dir.path()).load(Language::German).unwrap_err();
        assert!(matches!(err, JernError::PackMalformed { language: Language::German, .. }));
    }

    #[test]
    fn dir_source_reads_language_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ru.json"), SAMPLE).unwrap();
        let pack = DirPackSource::new(dir.path()).load(Language::Russian).unwrap();
        assert_eq!(pack.language(), Language::Russian);
        assert_eq!(pack.len(), 3);
        assert_eq!(pack.words()[2].romanized, None);
    }

    #[test]
    fn bundled_packs_parse() {
        for (language, json) in [
            (Language::Arabic, include_str!("../data/ar.json")),
            (Language::Spanish, include_str!("../data/es.json")),
            (Language::Russian, include_str!("../data/ru.json")),
            (Language::German, include_str!("../data/de.json")),
        ] {
            let pack = parse_pack(language, json).unwrap();
            assert!(!pack.is_empty(), "{language} pack is empty");
        }
    }

    #[test]
    fn loader_delivers_result_tagged_with_language() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ru.json"), SAMPLE).unwrap();
        let loader = PackLoader::new(Arc::new(DirPackSource::new(dir.path())));

        loader.request(Language::Russian);
        let loaded = loader.wait().unwrap();
        assert_eq!(loaded.language, Language::Russian);
        assert_eq!(loaded.result.unwrap().len(), 3);

        loader.request(Language::Korean);
        let loaded = loader.wait().unwrap();
        assert_eq!(loaded.language, Language::Korean);
        assert!(loaded.result.is_err());
    }
}
