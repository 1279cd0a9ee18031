// ============================================
// src/history.rs
// 習得済み単語の履歴 (ポリシー) と、その保存先
// ============================================

use bincode::config::standard;
use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::project_dirs;
use crate::error::{JernError, Result};
use crate::words::{Language, WordRecord};

/// 履歴の上限件数
pub const HISTORY_CAP: usize = 500;

const HISTORY_FILE_BIN: &str = "history.bin";
const HISTORY_FILE_JSON: &str = "history.json"; // デバッグ用

// --------------------------------------------------
// 履歴のポリシー
// --------------------------------------------------

/// 新しい順・id 重複なし・最大 500 件の履歴
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    words: Vec<WordRecord>,
}

/// 言語ごとにまとめた履歴 (表示用)
#[derive(Debug, Clone)]
pub struct HistoryGroup<'a> {
    pub language: Language,
    pub words: Vec<&'a WordRecord>,
}

impl History {
    /// 保存データから復元する。壊れたデータでも不変条件は守る
    pub fn from_words(words: Vec<WordRecord>) -> Self {
        let mut deduped: Vec<WordRecord> = Vec::with_capacity(words.len().min(HISTORY_CAP));
        for word in words {
            if deduped.len() == HISTORY_CAP {
                break;
            }
            if !deduped.iter().any(|w| w.id == word.id) {
                deduped.push(word);
            }
        }
        Self { words: deduped }
    }

    /// 完了した単語を先頭に追加する。既にあれば何もしない (位置も更新しない)
    pub fn record(&mut self, word: WordRecord) -> bool {
        if self.contains(&word.id) {
            return false;
        }
        self.words.insert(0, word);
        self.words.truncate(HISTORY_CAP);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.words.iter().any(|w| w.id == id)
    }

    /// 指定言語の履歴 (新しい順)
    pub fn for_language(&self, language: Language) -> Vec<&WordRecord> {
        self.words.iter().filter(|w| w.language == language).collect()
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

    /// 言語ごとのグループ。空のグループは含めない
    pub fn grouped(&self) -> Vec<HistoryGroup<'_>> {
        Language::ALL
            .iter()
            .map(|&language| HistoryGroup {
                language,
                words: self.words.iter().filter(|w| w.belongs_to(language)).collect(),
            })
            .filter(|g| !g.words.is_empty())
            .collect()
    }

    /// 原語・ローマ字・意味のどれかに部分一致 (大文字小文字は無視)
    pub fn search(&self, query: &str) -> Vec<&WordRecord> {
        let needle = query.to_lowercase();
        self.words
            .iter()
            .filter(|w| {
                w.original.to_lowercase().contains(&needle)
                    || w.romanized().to_lowercase().contains(&needle)
                    || w.definition.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

// --------------------------------------------------
// 保存先
// --------------------------------------------------

/// 履歴の保存先。並び順や重複の扱いは知らない、ただの配列置き場
pub trait HistoryStore {
    fn load(&self) -> Result<Vec<WordRecord>>;
    fn save(&self, words: &[WordRecord]) -> Result<()>;
}

/// メモリ上だけの保存先 (テスト・--ephemeral 用)
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    words: Arc<Mutex<Vec<WordRecord>>>,
}

impl MemoryHistoryStore {
    pub fn with_words(words: Vec<WordRecord>) -> Self {
        Self {
            words: Arc::new(Mutex::new(words)),
        }
    }

    /// 最後に保存された内容
    pub fn snapshot(&self) -> Vec<WordRecord> {
        self.words.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<WordRecord>> {
        Ok(self.snapshot())
    }

    fn save(&self, words: &[WordRecord]) -> Result<()> {
        if let Ok(mut slot) = self.words.lock() {
            *slot = words.to_vec();
        }
        Ok(())
    }
}

/// 保存ファイルの中身
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryFile {
    saved_at: DateTime<Utc>,
    words: Vec<WordRecord>,
}

/// bincode用の内部表現（DateTimeをi64に、言語をコード文字列に変換）
#[derive(Encode, Decode)]
struct HistoryFileBin {
    saved_at_secs: i64,
    words: Vec<WordRecordBin>,
}

#[derive(Encode, Decode)]
struct WordRecordBin {
    id: String,
    original: String,
    romanized: Option<String>,
    definition: String,
    language: String,
    frequency: Option<u32>,
}

impl From<&WordRecord> for WordRecordBin {
    fn from(word: &WordRecord) -> Self {
        Self {
            id: word.id.clone(),
            original: word.original.clone(),
            romanized: word.romanized.clone(),
            definition: word.definition.clone(),
            language: word.language.code().to_string(),
            frequency: word.frequency,
        }
    }
}

impl TryFrom<WordRecordBin> for WordRecord {
    type Error = String;

    fn try_from(bin: WordRecordBin) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: bin.id,
            original: bin.original,
            romanized: bin.romanized,
            definition: bin.definition,
            language: bin.language.parse()?,
            frequency: bin.frequency,
        })
    }
}

/// ファイルに保存する履歴 (バイナリ本番用 + JSON デバッグ用)
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// OS ごとのデータ保存用ディレクトリを使う
    pub fn in_project_dirs() -> Result<Self> {
        Ok(Self::new(project_dirs()?.data_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bin_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE_BIN)
    }

    fn json_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE_JSON)
    }

    fn load_bin(&self) -> Result<Vec<WordRecord>> {
        let mut file = File::open(self.bin_path())?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let (bin_data, _): (HistoryFileBin, usize) =
            bincode::decode_from_slice(&buffer, standard())?;
        tracing::debug!(saved_at_secs = bin_data.saved_at_secs, "decoded binary history");
        let mut words = Vec::with_capacity(bin_data.words.len());
        for bin in bin_data.words {
            match WordRecord::try_from(bin) {
                Ok(word) => words.push(word),
                Err(reason) => tracing::warn!(%reason, "skipping history entry"),
            }
        }
        Ok(words)
    }

    fn load_json(&self) -> Result<Vec<WordRecord>> {
        let reader = BufReader::new(File::open(self.json_path())?);
        let data: HistoryFile = serde_json::from_reader(reader)?;
        Ok(data.words)
    }

    /// 一時ファイルに書いてから置き換える
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let temp_file = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(&temp_file);
            writer.write_all(bytes)?;
            writer.flush()?;
        }
        temp_file.persist(path).map_err(|e| JernError::Io(e.error))?;
        Ok(())
    }
}

impl HistoryStore for FileHistoryStore {
    /// バイナリ優先、JSONフォールバック。どちらも無ければ空
    fn load(&self) -> Result<Vec<WordRecord>> {
        if self.bin_path().exists() {
            match self.load_bin() {
                Ok(words) => return Ok(words),
                Err(e) => tracing::warn!(error = %e, "binary history unreadable, trying JSON"),
            }
        }
        if self.json_path().exists() {
            return self.load_json();
        }
        Ok(Vec::new())
    }

    fn save(&self, words: &[WordRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let saved_at = Utc::now();

        // --- 1. バイナリ形式で保存 (本番用) ---
        let bin_data = HistoryFileBin {
            saved_at_secs: saved_at.timestamp(),
            words: words.iter().map(WordRecordBin::from).collect(),
        };
        let encoded = bincode::encode_to_vec(&bin_data, standard())?;
        self.write_atomic(&self.bin_path(), &encoded)?;

        // --- 2. JSON形式で保存 (デバッグ用) ---
        let json = serde_json::to_vec_pretty(&HistoryFile {
            saved_at,
            words: words.to_vec(),
        })?;
        self.write_atomic(&self.json_path(), &json)?;

        tracing::debug!(count = words.len(), dir = %self.dir.display(), "history saved");
        Ok(())
    }
}
