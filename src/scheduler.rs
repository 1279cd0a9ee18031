// ============================================
// src/scheduler.rs
// 出題キューのスケジューラ
// (難易度別の新出単語 + 復習単語の差し込み + フォールバック)
// ============================================

use std::collections::{HashSet, VecDeque};

use rand::Rng;

use crate::history::History;
use crate::pack::VocabularyPack;
use crate::transliterate::Transliterate;
use crate::words::{Difficulty, Language, WordRecord};

// --------------------------------------------------
// 設定値
// --------------------------------------------------

/// スケジューラの定数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// 補充後のキューの長さ
    pub target_depth: usize,
    /// これを下回ったら補充する
    pub low_water: usize,
    /// 新出単語がこの数だけ続いたら復習単語を1つ差し込む
    pub recall_interval: usize,
    /// パックがこれより小さいときは履歴の除外を直近だけにする
    pub small_pack_threshold: usize,
    /// 小さいパックで除外する直近履歴の件数
    pub small_pack_history_window: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_depth: 6,
            low_water: 3,
            recall_interval: 5,
            small_pack_threshold: 50,
            small_pack_history_window: 5,
        }
    }
}

// --------------------------------------------------
// 乱択
// --------------------------------------------------

/// 候補プールから一様に1つ選ぶ。テストでは決め打ちのものに差し替える
pub trait Picker {
    /// `0..len` の添字を返す (`len > 0` のときだけ呼ばれる)
    fn pick_index(&mut self, len: usize) -> usize;
}

/// rand による一様乱択
#[derive(Debug, Clone)]
pub struct RandomPicker<R> {
    rng: R,
}

impl<R: Rng> RandomPicker<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomPicker<rand::rngs::ThreadRng> {
    pub fn thread() -> Self {
        Self::new(rand::rng())
    }
}

impl<R: Rng> Picker for RandomPicker<R> {
    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

// --------------------------------------------------
// 状態
// --------------------------------------------------

/// 新出単語プールのどの段階で候補が見つかったか
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FallbackLevel {
    /// 難易度内・キューと履歴を除外
    Fresh,
    /// 難易度内・キューだけ除外
    IgnoreHistory,
    /// 難易度を無視・キューだけ除外
    IgnoreTier,
    /// 重複も許す
    Duplicates,
}

/// 1回の補充で何をしたか
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefillReport {
    pub recall_picks: usize,
    pub novel_picks: usize,
    /// 新出単語で使った一番深いフォールバック
    pub deepest_fallback: Option<FallbackLevel>,
}

impl RefillReport {
    pub fn added(&self) -> usize {
        self.recall_picks + self.novel_picks
    }
}

/// 設定変更の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsChange {
    pub queue_reset: bool,
    pub language_changed: bool,
}

/// 1人の学習者のセッション状態
#[derive(Debug, Clone)]
pub struct SessionState {
    pub language: Language,
    pub difficulty: Difficulty,
    pub active_recall: bool,
    /// 先頭が今の出題
    pub upcoming: VecDeque<WordRecord>,
    pub history: History,
    /// 前回の復習差し込み以降に出した新出単語の数
    pub recall_counter: usize,
}

impl SessionState {
    pub fn new(language: Language, difficulty: Difficulty, active_recall: bool, history: History) -> Self {
        Self {
            language,
            difficulty,
            active_recall,
            upcoming: VecDeque::new(),
            history,
            recall_counter: 0,
        }
    }
}

// --------------------------------------------------
// スケジューラ本体
// --------------------------------------------------

pub struct Scheduler<P: Picker> {
    state: SessionState,
    config: SchedulerConfig,
    /// 今の言語のパック。読み込み中・失敗時は None
    pack: Option<VocabularyPack>,
    picker: P,
    transliterator: Box<dyn Transliterate + Send>,
}

impl<P: Picker> Scheduler<P> {
    pub fn new(
        state: SessionState,
        config: SchedulerConfig,
        picker: P,
        transliterator: Box<dyn Transliterate + Send>,
    ) -> Self {
        Self {
            state,
            config,
            pack: None,
            picker,
            transliterator,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn pack(&self) -> Option<&VocabularyPack> {
        self.pack.as_ref()
    }

    /// 今の出題 (キューの先頭)
    pub fn current(&self) -> Option<&WordRecord> {
        self.state.upcoming.front()
    }

    /// 読み込んだパックを受け取る。今の言語のものでなければ捨てる
    pub fn install_pack(&mut self, pack: VocabularyPack) -> bool {
        if pack.language() != self.state.language {
            tracing::debug!(
                pack = %pack.language(),
                active = %self.state.language,
                "discarding stale word pack"
            );
            return false;
        }
        tracing::info!(language = %pack.language(), words = pack.len(), "word pack ready");
        self.pack = Some(pack);
        true
    }

    /// 言語・難易度を変える。どちらかが変わればキューとカウンタを捨てる
    pub fn update_settings(
        &mut self,
        language: Option<Language>,
        difficulty: Option<Difficulty>,
    ) -> SettingsChange {
        let language_changed = language.is_some_and(|l| l != self.state.language);
        let difficulty_changed = difficulty.is_some_and(|d| d != self.state.difficulty);
        let queue_reset = language_changed || difficulty_changed;

        if queue_reset {
            self.state.upcoming.clear();
            self.state.recall_counter = 0;
        }
        if let Some(language) = language {
            self.state.language = language;
        }
        if let Some(difficulty) = difficulty {
            self.state.difficulty = difficulty;
        }
        if language_changed {
            // 新しい言語のパックが届くまで補充しない
            self.pack = None;
        }
        if queue_reset {
            tracing::info!(
                language = %self.state.language,
                difficulty = %self.state.difficulty,
                "settings changed, queue reset"
            );
        }
        SettingsChange {
            queue_reset,
            language_changed,
        }
    }

    /// 復習差し込みの ON/OFF。キューはそのまま
    pub fn set_active_recall(&mut self, enabled: bool) {
        self.state.active_recall = enabled;
    }

    /// 先頭の単語を履歴に入れてキューから外す。空なら何もしない
    pub fn advance(&mut self) -> Option<WordRecord> {
        let head = self.state.upcoming.pop_front()?;
        if self.state.history.record(head.clone()) {
            tracing::debug!(id = %head.id, history = self.state.history.len(), "word mastered");
        }
        Some(head)
    }

    pub fn needs_refill(&self) -> bool {
        self.pack.as_ref().is_some_and(|p| !p.is_empty())
            && self.state.upcoming.len() < self.config.low_water
    }

    /// 低水位を下回っているときだけ補充する
    pub fn refill_if_low(&mut self) -> Option<RefillReport> {
        if self.needs_refill() {
            Some(self.refill())
        } else {
            None
        }
    }

    /// キューを目標の長さまで埋める
    pub fn refill(&mut self) -> RefillReport {
        let mut report = RefillReport::default();
        let Some(pack) = self.pack.clone() else {
            return report;
        };
        if pack.is_empty() {
            return report;
        }
        let needed = self.config.target_depth.saturating_sub(self.state.upcoming.len());
        if needed == 0 {
            return report;
        }

        let language = self.state.language;
        let range = self.state.difficulty.range();

        // キュー内の id (この補充で積んだものも含む)
        let mut queued: HashSet<String> = self.state.upcoming.iter().map(|w| w.id.clone()).collect();

        let lang_history: Vec<WordRecord> = self
            .state
            .history
            .for_language(language)
            .into_iter()
            .cloned()
            .collect();
        let history_limit = if pack.len() < self.config.small_pack_threshold {
            self.config.small_pack_history_window
        } else {
            lang_history.len()
        };
        let history_excluded: HashSet<&str> = lang_history
            .iter()
            .take(history_limit)
            .map(|w| w.id.as_str())
            .collect();

        for _ in 0..needed {
            // 1. 復習単語の差し込み (ちょうど recall_interval 語ごと)
            if self.state.active_recall
                && !lang_history.is_empty()
                && self.state.recall_counter >= self.config.recall_interval
            {
                let candidates: Vec<&WordRecord> =
                    lang_history.iter().filter(|w| !queued.contains(&w.id)).collect();
                if !candidates.is_empty() {
                    let recall = candidates[self.picker.pick_index(candidates.len())].clone();
                    tracing::debug!(id = %recall.id, "active recall pick");
                    queued.insert(recall.id.clone());
                    let recall = self.presentable(recall);
                    self.state.upcoming.push_back(recall);
                    self.state.recall_counter = 0;
                    report.recall_picks += 1;
                    continue;
                }
                // 履歴が全部キューに入っている -> 今回は新出単語にする
            }

            // 2. 新出単語
            let in_tier = |w: &WordRecord| range.contains(w.rank());
            let fresh = |w: &WordRecord| !queued.contains(&w.id);

            let (pool, level) = {
                let words = pack.words();
                let tiers: [(FallbackLevel, Vec<&WordRecord>); 3] = [
                    (
                        FallbackLevel::Fresh,
                        words
                            .iter()
                            .filter(|w| {
                                in_tier(*w) && fresh(*w) && !history_excluded.contains(w.id.as_str())
                            })
                            .collect(),
                    ),
                    (
                        FallbackLevel::IgnoreHistory,
                        words.iter().filter(|w| in_tier(*w) && fresh(*w)).collect(),
                    ),
                    (FallbackLevel::IgnoreTier, words.iter().filter(|w| fresh(*w)).collect()),
                ];
                tiers
                    .into_iter()
                    .find(|(_, pool)| !pool.is_empty())
                    .map(|(level, pool)| (pool, level))
                    .unwrap_or_else(|| (words.iter().collect(), FallbackLevel::Duplicates))
            };
            if pool.is_empty() {
                // パック自体が空のときだけ
                break;
            }

            let next = pool[self.picker.pick_index(pool.len())].clone();
            if level != FallbackLevel::Fresh {
                tracing::debug!(?level, id = %next.id, "novel pick used fallback pool");
            }
            queued.insert(next.id.clone());
            let next = self.presentable(next);
            self.state.upcoming.push_back(next);
            self.state.recall_counter += 1;
            report.novel_picks += 1;
            report.deepest_fallback = report.deepest_fallback.max(Some(level));
        }

        tracing::debug!(
            added = report.added(),
            recall = report.recall_picks,
            queue = self.state.upcoming.len(),
            "queue refilled"
        );
        report
    }

    /// ローマ字が無ければ翻字で埋める
    fn presentable(&self, mut word: WordRecord) -> WordRecord {
        if word.romanized.as_deref().is_none_or(|r| r.is_empty()) {
            word.romanized = Some(self.transliterator.transliterate(&word.original, word.language));
        }
        word
    }
}
