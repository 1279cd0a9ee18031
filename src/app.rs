// ============================================
// src/app.rs
// 練習画面 (TUI の状態・キー入力・描画)
// ============================================

use std::io::{Result, stdout};
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::history::HISTORY_CAP;
use crate::scheduler::Picker;
use crate::session::{LoadStatus, Trainer};
use crate::typing::{TypingState, WordResult};

/// アプリ全体の状態を管理する
pub struct AppState<P: Picker> {
    trainer: Trainer<P>,
    /// 今の出題に対する入力
    typing: TypingState,
    /// `typing` がどの出題のものか
    typing_for: u64,
    /// 直前の単語のリザルト
    last_result: Option<WordResult>,
    last_word: Option<String>,
}

impl<P: Picker> AppState<P> {
    pub fn new(trainer: Trainer<P>) -> Self {
        let mut state = Self {
            trainer,
            typing: TypingState::new(""),
            typing_for: u64::MAX,
            last_result: None,
            last_word: None,
        };
        state.sync_typing();
        state
    }

    /// 出題が変わっていたら入力をリセットする
    fn sync_typing(&mut self) {
        let presentation = self.trainer.presentation();
        if self.typing_for == presentation {
            return;
        }
        let target = self
            .trainer
            .current()
            .map(|w| w.typing_target())
            .unwrap_or_default();
        self.typing = TypingState::new(&target);
        self.typing_for = presentation;
    }

    pub fn tick(&mut self) {
        self.trainer.tick();
        self.sync_typing();
    }

    /// キー入力の処理。false を返したら終了
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Esc => return false,
            KeyCode::Backspace => self.typing.handle_backspace(),
            KeyCode::Tab => self.complete(false),
            KeyCode::F(2) => {
                let next = self.trainer.state().language.next();
                self.trainer.change_settings(Some(next), None);
            }
            KeyCode::F(3) => {
                let next = self.trainer.state().difficulty.next();
                self.trainer.change_settings(None, Some(next));
            }
            KeyCode::F(4) => {
                let enabled = !self.trainer.state().active_recall;
                self.trainer.set_active_recall(enabled);
            }
            KeyCode::F(5) => {
                let enabled = !self.trainer.audio_repeat();
                self.trainer.set_audio_repeat(enabled);
            }
            KeyCode::F(6) => {
                let mode = self.trainer.audio_mode().next();
                self.trainer.set_audio_mode(mode);
            }
            KeyCode::F(7) => self.trainer.replay(),
            KeyCode::Char(c) => {
                if self.trainer.current().is_some() && self.typing.handle_char_input(c) {
                    // 完了したら自動で次へ
                    self.complete(true);
                }
            }
            _ => {}
        }
        self.sync_typing();
        true
    }

    /// 次のお題に進む。`typed` が false ならスキップ
    fn complete(&mut self, typed: bool) {
        let result = if typed { self.typing.result() } else { None };
        if let Some(done) = self.trainer.complete_current() {
            self.last_result = result;
            self.last_word = Some(done.original);
        }
    }

    pub fn shutdown(&mut self) {
        self.trainer.shutdown();
    }
}

// --------------------------------------------------
// TUIセットアップと実行ループ
// --------------------------------------------------

pub fn run<P: Picker>(trainer: Trainer<P>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app_state = AppState::new(trainer);
    let outcome = run_app(&mut terminal, &mut app_state);
    app_state.shutdown();
    restore_terminal()?;
    outcome
}

fn setup_terminal() -> Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal() -> Result<()> {
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()?;
    Ok(())
}

fn run_app<P: Picker>(terminal: &mut Terminal<impl Backend>, app_state: &mut AppState<P>) -> Result<()> {
    loop {
        app_state.tick();
        terminal.draw(|f| ui(f, app_state))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app_state.handle_key(key.code) {
                    break;
                }
            }
        }
    }
    Ok(())
}

// --------------------------------------------------
// UI描画
// --------------------------------------------------

fn ui<P: Picker>(f: &mut Frame, app_state: &AppState<P>) {
    let size = f.area();
    // 枠線を描画
    let block = Block::default()
        .borders(Borders::ALL)
        .title("JERN")
        .title_bottom(
            " Tab skip | F2 language | F3 difficulty | F4 recall | F5 repeat | F6 voice | F7 replay | Esc quit ",
        );
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] 言語 / 難易度 / 設定
            Constraint::Length(1), // [1] 習得数ゲージ
            Constraint::Length(1), // [2] リザルト
            Constraint::Length(1), // [3] 空白
            Constraint::Length(1), // [4] 原語
            Constraint::Length(1), // [5] 意味
            Constraint::Length(1), // [6] 空白
            Constraint::Min(1),    // [7] タイピングエリア
        ])
        .split(inner_area);

    let trainer = &app_state.trainer;
    let state = trainer.state();

    // 0. ヘッダ
    let flags = format!(
        "recall:{} repeat:{} voice:{}",
        if state.active_recall { "on" } else { "off" },
        if trainer.audio_repeat() { "on" } else { "off" },
        trainer.audio_mode(),
    );
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!("{} / {}", state.language.label(), state.difficulty),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("   "),
            Span::styled(flags, Style::default().fg(Color::DarkGray)),
        ])),
        chunks[0],
    );

    // 1. 習得数
    let mastered = state.history.len();
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE))
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio((mastered as f64 / HISTORY_CAP as f64).min(1.0))
        .label(format!("Mastered: {mastered}"));
    f.render_widget(gauge, chunks[1]);

    // 2. リザルト
    let result_text = match (&app_state.last_word, app_state.last_result) {
        (Some(word), Some(r)) => format!(
            "{word}  CPS: {:.2} / Time: {:.2}s / Miss: {}",
            r.cps, r.duration_sec, r.misses
        ),
        (Some(word), None) => format!("{word}  (skipped)"),
        _ => String::new(),
    };
    f.render_widget(
        Paragraph::new(result_text).style(Style::default().fg(Color::Yellow)),
        chunks[2],
    );

    let Some(word) = trainer.current() else {
        // 読み込み中・読み込み失敗・補充待ち
        let (message, color) = match trainer.status() {
            LoadStatus::Loading(language) => {
                (format!("Loading {} data pack...", language.label()), Color::Gray)
            }
            LoadStatus::Failed { language, message } => (
                format!("{} pack unavailable: {message} (F2 to pick another)", language.label()),
                Color::Red,
            ),
            LoadStatus::Ready => ("Replenishing...".to_string(), Color::Gray),
        };
        f.render_widget(
            Paragraph::new(message).style(Style::default().fg(color)).centered(),
            chunks[4],
        );
        return;
    };

    // 4. 原語
    f.render_widget(
        Paragraph::new(word.original.as_str())
            .style(Style::default().fg(Color::White).bold())
            .centered(),
        chunks[4],
    );

    // 5. 意味
    f.render_widget(
        Paragraph::new(word.definition.as_str())
            .style(Style::default().fg(Color::Gray).italic())
            .centered(),
        chunks[5],
    );

    // 7. ローマ字タイピングエリア
    let typing = &app_state.typing;
    let mut spans = Vec::new();
    let typed = typing.typed();
    let nothing_typed = typed.is_empty();
    if !nothing_typed {
        // 入力済み (緑)
        spans.push(Span::styled(typed, Style::default().fg(Color::Green)));
    }
    if let Some(next) = typing.next_char() {
        // カーソル (白または赤)
        let style = if typing.is_error() {
            Style::default().fg(Color::White).bg(Color::Red)
        } else {
            Style::default().fg(Color::Black).bg(Color::White)
        };
        spans.push(Span::styled(next.to_string(), style));
        // カーソル以降の残り (灰色)
        spans.push(Span::styled(typing.rest(), Style::default().fg(Color::DarkGray)));
    } else if nothing_typed {
        // ローマ字が作れなかったお題
        spans.push(Span::styled(
            "(no romanization, Tab to skip)",
            Style::default().fg(Color::DarkGray).italic(),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)).centered(), chunks[7]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;
    use crate::narrator::{AudioMode, SilentNarrator};
    use crate::pack::{PackLoader, PackSource, VocabularyPack};
    use crate::scheduler::RandomPicker;
    use crate::session::TrainerSettings;
    use crate::transliterate::BasicTransliterator;
    use crate::words::{Difficulty, Language, WordRecord};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    /// 1語だけのパック
    struct OneWordSource {
        romanized: Option<&'static str>,
    }

    impl PackSource for OneWordSource {
        fn load(&self, language: Language) -> crate::error::Result<VocabularyPack> {
            Ok(VocabularyPack::new(
                language,
                vec![WordRecord {
                    id: format!("{}-1", language.code()),
                    original: "شكرا".into(),
                    romanized: self.romanized.map(str::to_string),
                    definition: "thank you".into(),
                    language,
                    frequency: Some(1),
                }],
            ))
        }
    }

    fn app(store: MemoryHistoryStore) -> AppState<RandomPicker<StdRng>> {
        app_with(store, Some("shukran"))
    }

    fn app_with(
        store: MemoryHistoryStore,
        romanized: Option<&'static str>,
    ) -> AppState<RandomPicker<StdRng>> {
        let mut trainer = Trainer::new(
            TrainerSettings {
                language: Language::Arabic,
                difficulty: Difficulty::Beginner,
                active_recall: true,
                audio_repeat: false,
                audio_mode: AudioMode::Definition,
            },
            Box::new(store),
            PackLoader::new(Arc::new(OneWordSource { romanized })),
            Box::new(SilentNarrator::default()),
            RandomPicker::new(StdRng::seed_from_u64(3)),
            Box::new(BasicTransliterator),
        );
        trainer.wait_for_pack();
        AppState::new(trainer)
    }

    #[test]
    fn typing_the_word_completes_it() {
        let store = MemoryHistoryStore::default();
        let mut app = app(store.clone());
        for c in "shukran".chars() {
            assert!(app.handle_key(KeyCode::Char(c)));
        }
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(app.last_word.as_deref(), Some("شكرا"));
        assert!(app.last_result.is_some());
        // 新しい出題で入力はリセット済み
        assert_eq!(app.typing.typed(), "");
    }

    #[test]
    fn word_without_romanization_only_advances_on_skip() {
        // アラビア文字は翻字できない -> お題が空になる
        let store = MemoryHistoryStore::default();
        let mut app = app_with(store.clone(), None);
        assert_eq!(app.trainer.current().and_then(|w| w.romanized.as_deref()), Some(""));

        assert!(app.handle_key(KeyCode::Char('z')));
        assert!(store.snapshot().is_empty());
        assert!(app.trainer.history().is_empty());
        assert!(app.last_result.is_none());
        assert!(app.typing.is_error());

        assert!(app.handle_key(KeyCode::Tab));
        assert_eq!(store.snapshot().len(), 1);
        assert!(app.last_result.is_none());
    }

    #[test]
    fn voice_keys_toggle_mode_and_replay() {
        let mut app = app(MemoryHistoryStore::default());
        assert_eq!(app.trainer.audio_mode(), AudioMode::Definition);
        app.handle_key(KeyCode::F(6));
        assert_eq!(app.trainer.audio_mode(), AudioMode::Original);
        assert!(app.handle_key(KeyCode::F(7)));
        app.handle_key(KeyCode::F(6));
        assert_eq!(app.trainer.audio_mode(), AudioMode::Definition);
    }

    #[test]
    fn tab_skips_and_escape_quits() {
        let store = MemoryHistoryStore::default();
        let mut app = app(store.clone());
        assert!(app.handle_key(KeyCode::Tab));
        assert_eq!(store.snapshot().len(), 1);
        assert!(app.last_result.is_none());
        assert!(!app.handle_key(KeyCode::Esc));
    }

    #[test]
    fn function_keys_change_settings() {
        let mut app = app(MemoryHistoryStore::default());
        app.handle_key(KeyCode::F(3));
        assert_eq!(app.trainer.state().difficulty, Difficulty::Intermediate);
        app.handle_key(KeyCode::F(4));
        assert!(!app.trainer.state().active_recall);
        app.handle_key(KeyCode::F(2));
        assert_eq!(app.trainer.state().language, Language::Spanish);
        assert!(app.trainer.state().upcoming.is_empty());
    }

    #[test]
    fn draws_without_panicking() {
        let app = app(MemoryHistoryStore::default());
        let backend = TestBackend::new(80, 16);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();
    }
}
