// ============================================
// src/session.rs
// スケジューラ・履歴の保存先・パック読み込み・読み上げをまとめる
// ============================================

use crate::history::{History, HistoryStore};
use crate::narrator::{AudioMode, Narrator};
use crate::pack::{PackLoaded, PackLoader};
use crate::scheduler::{Picker, Scheduler, SchedulerConfig, SessionState};
use crate::transliterate::Transliterate;
use crate::words::{Difficulty, Language, WordRecord};

/// パックの読み込み状況 (UI 表示用)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading(Language),
    Ready,
    Failed { language: Language, message: String },
}

/// 起動時の設定
#[derive(Debug, Clone, Copy)]
pub struct TrainerSettings {
    pub language: Language,
    pub difficulty: Difficulty,
    pub active_recall: bool,
    pub audio_repeat: bool,
    pub audio_mode: AudioMode,
}

/// 1人の学習者の練習セッション全体
pub struct Trainer<P: Picker> {
    scheduler: Scheduler<P>,
    store: Box<dyn HistoryStore>,
    loader: PackLoader,
    narrator: Box<dyn Narrator>,
    status: LoadStatus,
    audio_repeat: bool,
    audio_mode: AudioMode,
    /// 出題が変わるたびに増える (同じ id の連続でも読み上げ直すため)
    presentation: u64,
    spoken: Option<u64>,
}

impl<P: Picker> Trainer<P> {
    /// 履歴を読み込み、最初の言語のパック読み込みを始める
    pub fn new(
        settings: TrainerSettings,
        store: Box<dyn HistoryStore>,
        loader: PackLoader,
        narrator: Box<dyn Narrator>,
        picker: P,
        transliterator: Box<dyn Transliterate + Send>,
    ) -> Self {
        let history = match store.load() {
            Ok(words) => History::from_words(words),
            Err(e) => {
                tracing::warn!(error = %e, "could not load history, starting fresh");
                History::default()
            }
        };
        tracing::info!(mastered = history.len(), "history loaded");

        let state = SessionState::new(
            settings.language,
            settings.difficulty,
            settings.active_recall,
            history,
        );
        let scheduler = Scheduler::new(state, SchedulerConfig::default(), picker, transliterator);
        loader.request(settings.language);

        Self {
            scheduler,
            store,
            loader,
            narrator,
            status: LoadStatus::Loading(settings.language),
            audio_repeat: settings.audio_repeat,
            audio_mode: settings.audio_mode,
            presentation: 0,
            spoken: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        self.scheduler.state()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn current(&self) -> Option<&WordRecord> {
        self.scheduler.current()
    }

    pub fn history(&self) -> &History {
        &self.scheduler.state().history
    }

    pub fn audio_repeat(&self) -> bool {
        self.audio_repeat
    }

    pub fn audio_mode(&self) -> AudioMode {
        self.audio_mode
    }

    /// 出題の通し番号。UI はこれが変わったら入力をリセットする
    pub fn presentation(&self) -> u64 {
        self.presentation
    }

    /// UI ループから毎回呼ぶ。届いたパックの反映・補充・読み上げ
    pub fn tick(&mut self) {
        for loaded in self.loader.drain() {
            self.apply_loaded(loaded);
        }
        self.refill_if_low();
        self.narrate_current();
        self.narrator.tick();
    }

    /// パックが届くまで待つ (起動直後用)
    pub fn wait_for_pack(&mut self) {
        while matches!(self.status, LoadStatus::Loading(_)) {
            match self.loader.wait() {
                Some(loaded) => self.apply_loaded(loaded),
                None => break,
            }
        }
        self.refill_if_low();
    }

    fn apply_loaded(&mut self, loaded: PackLoaded) {
        let PackLoaded { language, result } = loaded;
        if language != self.scheduler.state().language {
            // 途中で言語が変わった -> 古い結果は捨てる
            tracing::debug!(%language, "ignoring pack load for inactive language");
            return;
        }
        match result {
            Ok(pack) => {
                if pack.is_empty() {
                    tracing::warn!(%language, "word pack is empty");
                }
                self.scheduler.install_pack(pack);
                self.status = LoadStatus::Ready;
            }
            Err(e) => {
                tracing::error!(%language, error = %e, "failed to load word pack");
                self.status = LoadStatus::Failed {
                    language,
                    message: e.to_string(),
                };
            }
        }
    }

    fn refill_if_low(&mut self) {
        let had_current = self.scheduler.current().is_some();
        let Some(report) = self.scheduler.refill_if_low() else {
            return;
        };
        if !had_current && report.added() > 0 {
            self.presentation += 1;
        }
    }

    fn narrate_current(&mut self) {
        if self.spoken == Some(self.presentation) {
            return;
        }
        if let Some(word) = self.scheduler.current() {
            let (text, locale) = self.audio_mode.utterance(word);
            self.narrator.speak(text, locale, self.audio_repeat);
            self.spoken = Some(self.presentation);
        }
    }

    /// 今の単語をもう一度読む
    pub fn replay(&mut self) {
        self.narrator.stop();
        self.spoken = None;
        self.narrate_current();
    }

    /// 今の単語を打ち終えた (またはスキップした)
    pub fn complete_current(&mut self) -> Option<WordRecord> {
        let done = self.scheduler.advance()?;
        self.presentation += 1;
        self.narrator.stop();
        self.persist_history();
        self.refill_if_low();
        Some(done)
    }

    fn persist_history(&self) {
        if let Err(e) = self.store.save(self.scheduler.state().history.words()) {
            // 保存できなくても練習は続ける
            tracing::error!(error = %e, "failed to save history");
        }
    }

    /// 言語・難易度の変更。言語が変わればパックを読み直す
    pub fn change_settings(&mut self, language: Option<Language>, difficulty: Option<Difficulty>) {
        let change = self.scheduler.update_settings(language, difficulty);
        // 失敗した言語を選び直したときも再読み込み
        let retry = language.is_some() && matches!(self.status, LoadStatus::Failed { .. });
        if !change.queue_reset && !retry {
            return;
        }
        if change.queue_reset {
            self.presentation += 1;
        }
        self.narrator.stop();
        self.spoken = None;
        if change.language_changed || retry {
            let language = self.scheduler.state().language;
            self.status = LoadStatus::Loading(language);
            self.loader.request(language);
        }
        self.refill_if_low();
    }

    pub fn set_active_recall(&mut self, enabled: bool) {
        self.scheduler.set_active_recall(enabled);
    }

    /// 意味と原語の切り替え。今の単語を新しいモードで読み直す
    pub fn set_audio_mode(&mut self, mode: AudioMode) {
        if mode == self.audio_mode {
            return;
        }
        self.audio_mode = mode;
        self.narrator.stop();
        self.spoken = None;
    }

    pub fn set_audio_repeat(&mut self, enabled: bool) {
        self.audio_repeat = enabled;
        // 今の単語を新しい設定で読み直す
        self.narrator.stop();
        self.spoken = None;
    }

    /// 終了時
    pub fn shutdown(&mut self) {
        self.narrator.stop();
        self.persist_history();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;
    use crate::pack::{PackSource, VocabularyPack};
    use crate::scheduler::RandomPicker;
    use crate::transliterate::BasicTransliterator;
    use crate::error::{JernError, Result};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::{Arc, Mutex};

    /// メモリ上のパック。ru は読み込み失敗
    struct FakeSource;

    impl PackSource for FakeSource {
        fn load(&self, language: Language) -> Result<VocabularyPack> {
            if language == Language::Russian {
                return Err(JernError::PackMalformed {
                    language,
                    reason: "broken".into(),
                });
            }
            let words = (0..60)
                .map(|i| WordRecord {
                    id: format!("{}-{i}", language.code()),
                    original: format!("o{i}"),
                    romanized: Some(format!("r{i}")),
                    definition: format!("d{i}"),
                    language,
                    frequency: Some(i + 1),
                })
                .collect();
            Ok(VocabularyPack::new(language, words))
        }
    }

    /// 読み上げ要求を記録する
    #[derive(Clone, Default)]
    struct RecordingNarrator {
        spoken: Arc<Mutex<Vec<String>>>,
        locales: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingNarrator {
        fn texts(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }

        fn last(&self) -> Option<(String, String)> {
            let text = self.spoken.lock().unwrap().last().cloned()?;
            let locale = self.locales.lock().unwrap().last().cloned()?;
            Some((text, locale))
        }
    }

    impl Narrator for RecordingNarrator {
        fn speak(&mut self, text: &str, locale: &str, _repeat: bool) {
            self.spoken.lock().unwrap().push(text.to_string());
            self.locales.lock().unwrap().push(locale.to_string());
        }
        fn stop(&mut self) {}
        fn is_speaking(&mut self) -> bool {
            false
        }
    }

    fn trainer(
        language: Language,
        store: MemoryHistoryStore,
        narrator: RecordingNarrator,
    ) -> Trainer<RandomPicker<StdRng>> {
        let settings = TrainerSettings {
            language,
            difficulty: Difficulty::Beginner,
            active_recall: true,
            audio_repeat: false,
            audio_mode: AudioMode::Definition,
        };
        Trainer::new(
            settings,
            Box::new(store),
            PackLoader::new(Arc::new(FakeSource)),
            Box::new(narrator),
            RandomPicker::new(StdRng::seed_from_u64(1)),
            Box::new(BasicTransliterator),
        )
    }

    #[test]
    fn starts_loading_then_fills_queue() {
        let mut t = trainer(Language::Spanish, MemoryHistoryStore::default(), RecordingNarrator::default());
        assert_eq!(t.status(), &LoadStatus::Loading(Language::Spanish));
        t.wait_for_pack();
        assert_eq!(t.status(), &LoadStatus::Ready);
        assert_eq!(t.state().upcoming.len(), 6);
    }

    #[test]
    fn load_failure_is_a_status_not_an_error() {
        let mut t = trainer(Language::Russian, MemoryHistoryStore::default(), RecordingNarrator::default());
        t.wait_for_pack();
        assert!(matches!(t.status(), LoadStatus::Failed { language: Language::Russian, .. }));
        assert!(t.current().is_none());
        assert!(t.complete_current().is_none());
    }

    #[test]
    fn completion_persists_history() {
        let store = MemoryHistoryStore::default();
        let mut t = trainer(Language::Spanish, store.clone(), RecordingNarrator::default());
        t.wait_for_pack();
        let first = t.current().cloned().unwrap();
        let done = t.complete_current().unwrap();
        assert_eq!(done.id, first.id);
        assert_eq!(store.snapshot()[0].id, first.id);
        // 低水位を下回るまでは補充しない
        assert_eq!(t.state().upcoming.len(), 5);
    }

    #[test]
    fn history_is_restored_from_store() {
        let saved = FakeSource.load(Language::Spanish).unwrap().words()[..3].to_vec();
        let t = trainer(
            Language::Spanish,
            MemoryHistoryStore::with_words(saved),
            RecordingNarrator::default(),
        );
        assert_eq!(t.history().len(), 3);
    }

    #[test]
    fn language_change_resets_queue_and_reloads() {
        let mut t = trainer(Language::Spanish, MemoryHistoryStore::default(), RecordingNarrator::default());
        t.wait_for_pack();
        t.change_settings(Some(Language::German), None);
        assert!(t.state().upcoming.is_empty());
        assert_eq!(t.state().recall_counter, 0);
        assert_eq!(t.status(), &LoadStatus::Loading(Language::German));

        t.wait_for_pack();
        assert!(t.state().upcoming.iter().all(|w| w.language == Language::German));
        assert_eq!(t.state().upcoming.len(), 6);
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut t = trainer(Language::Spanish, MemoryHistoryStore::default(), RecordingNarrator::default());
        // es の読み込み完了前に de へ切り替える
        t.change_settings(Some(Language::German), None);
        t.wait_for_pack();
        t.tick();
        assert!(t.state().upcoming.iter().all(|w| w.language == Language::German));
    }

    #[test]
    fn current_word_is_narrated_once_per_presentation() {
        let narrator = RecordingNarrator::default();
        let mut t = trainer(Language::Spanish, MemoryHistoryStore::default(), narrator.clone());
        t.wait_for_pack();
        t.tick();
        t.tick();
        let first = t.current().map(|w| w.definition.clone()).unwrap();
        assert_eq!(narrator.texts(), [first]);

        t.complete_current();
        t.tick();
        assert_eq!(narrator.texts().len(), 2);
    }

    #[test]
    fn audio_mode_switches_between_definition_and_original() {
        let narrator = RecordingNarrator::default();
        let mut t = trainer(Language::German, MemoryHistoryStore::default(), narrator.clone());
        t.wait_for_pack();
        t.tick();
        let word = t.current().cloned().unwrap();
        assert_eq!(narrator.last(), Some((word.definition.clone(), "en-US".to_string())));

        t.set_audio_mode(AudioMode::Original);
        t.tick();
        assert_eq!(narrator.last(), Some((word.original.clone(), "de".to_string())));
        assert_eq!(narrator.texts().len(), 2);

        // 同じモードを選んでも読み直さない
        t.set_audio_mode(AudioMode::Original);
        t.tick();
        assert_eq!(narrator.texts().len(), 2);
    }

    #[test]
    fn replay_speaks_current_word_again() {
        let narrator = RecordingNarrator::default();
        let mut t = trainer(Language::Spanish, MemoryHistoryStore::default(), narrator.clone());
        t.wait_for_pack();
        t.tick();
        t.replay();
        let definition = t.current().map(|w| w.definition.clone()).unwrap();
        assert_eq!(narrator.texts(), [definition.clone(), definition]);
    }

    #[test]
    fn reselecting_current_settings_does_not_renarrate() {
        let narrator = RecordingNarrator::default();
        let mut t = trainer(Language::Spanish, MemoryHistoryStore::default(), narrator.clone());
        t.wait_for_pack();
        t.tick();
        let presentation = t.presentation();
        t.change_settings(Some(Language::Spanish), Some(Difficulty::Beginner));
        t.tick();
        assert_eq!(narrator.texts().len(), 1);
        assert_eq!(t.presentation(), presentation);
        assert_eq!(t.state().upcoming.len(), 6);
    }
}
