// ============================================
// src/typing.rs
// 1単語ぶんのタイピング入力の判定
// ============================================

use std::time::{Duration, Instant};

/// 今の出題に対する入力状態
#[derive(Debug, Clone)]
pub struct TypingState {
    /// 正規化済みのお題 (例: "shukran")
    target: Vec<char>,
    /// 正しく打てた文字数
    typed_count: usize,
    is_error: bool,        // ミスタイプ中か
    start_time: Option<Instant>, // 最初のキー入力の時刻
    /// この単語でのミス回数
    misses: u32,
}

/// 1単語の結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordResult {
    pub duration_sec: f64,
    pub misses: u32,
    pub chars: usize,
    pub cps: f64,
}

impl TypingState {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.chars().collect(),
            typed_count: 0,
            is_error: false,
            start_time: None,
            misses: 0,
        }
    }

    /// キー入力の処理。お題を打ち終わったら true
    pub fn handle_char_input(&mut self, c: char) -> bool {
        // タイマー開始
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        if self.target.is_empty() {
            // 打てる文字が無いお題はスキップでしか進まない
            self.is_error = true;
            self.misses += 1;
            return false;
        }
        if self.is_complete() {
            return true;
        }

        let expected = self.target[self.typed_count];
        if c.to_ascii_lowercase() == expected {
            self.typed_count += 1;
            self.is_error = false;
        } else {
            self.is_error = true;
            self.misses += 1;
        }
        self.is_complete()
    }

    /// Backspace の処理
    pub fn handle_backspace(&mut self) {
        if !self.is_error {
            self.typed_count = self.typed_count.saturating_sub(1);
        }
        self.is_error = false; // Backspaceでエラーはリセット
    }

    /// 全部打ち終わったか。空のお題は打ち終わらない
    pub fn is_complete(&self) -> bool {
        !self.target.is_empty() && self.typed_count >= self.target.len()
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// 打ち終わった部分
    pub fn typed(&self) -> String {
        self.target[..self.typed_count].iter().collect()
    }

    /// 次に打つ文字
    pub fn next_char(&self) -> Option<char> {
        self.target.get(self.typed_count).copied()
    }

    /// 次の文字より後ろ
    pub fn rest(&self) -> String {
        self.target.iter().skip(self.typed_count + 1).collect()
    }

    /// 結果を計算する。1文字も打っていなければ None
    pub fn result(&self) -> Option<WordResult> {
        let start = self.start_time?;
        Some(self.result_after(start.elapsed()))
    }

    fn result_after(&self, elapsed: Duration) -> WordResult {
        let duration_sec = elapsed.as_secs_f64();
        let chars = self.target.len();
        let cps = if duration_sec > 0.0 {
            chars as f64 / duration_sec // CPS = 総文字数 / 秒
        } else {
            0.0
        };
        WordResult {
            duration_sec,
            misses: self.misses,
            chars,
            cps,
        }
    }
}
