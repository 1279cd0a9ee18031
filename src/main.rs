// ============================================
// src/main.rs (メインファイル)
// コマンドライン引数の解釈と起動
// ============================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};

use jern::config::AppConfig;
use jern::error::{JernError, Result};
use jern::history::{FileHistoryStore, History, HistoryStore, MemoryHistoryStore};
use jern::logging::{LogConfig, init_tracing};
use jern::narrator::{AudioMode, CommandNarrator, Narrator, SilentNarrator};
use jern::pack::{DirPackSource, PackLoader};
use jern::scheduler::RandomPicker;
use jern::session::{Trainer, TrainerSettings};
use jern::transliterate::BasicTransliterator;
use jern::words::{Difficulty, Language};

/// リポジトリ同梱のサンプルパック
const BUNDLED_PACK_DIR: &str = "data";

#[derive(Parser)]
#[command(name = "jern", version, about = "Type the romanized word while its meaning is read aloud.")]
struct Cli {
    /// 設定ファイル (既定: OS の設定ディレクトリの config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    practice: PracticeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// 練習を始める (既定)
    Practice(PracticeArgs),
    /// 習得済みの単語を一覧表示する
    History {
        /// この言語だけ
        #[arg(long, value_enum)]
        language: Option<Language>,
        /// 原語・ローマ字・意味で絞り込む
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Args, Clone, Default)]
struct PracticeArgs {
    #[arg(long, value_enum)]
    language: Option<Language>,
    #[arg(long, value_enum)]
    difficulty: Option<Difficulty>,
    /// 復習単語を差し込まない
    #[arg(long)]
    no_recall: bool,
    /// 意味を繰り返し読み上げる
    #[arg(long)]
    repeat_audio: bool,
    /// 読み上げる内容 (definition: 意味 / original: 原語)
    #[arg(long, value_enum)]
    audio_mode: Option<AudioMode>,
    /// 単語パック (<code>.json) のディレクトリ
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// 読み上げに使うコマンド (例: espeak-ng)
    #[arg(long)]
    speech_command: Option<String>,
    /// 履歴を保存しない
    #[arg(long)]
    ephemeral: bool,
    /// 言語と難易度を対話的に選ぶ
    #[arg(long)]
    choose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::default_config_path()?,
    };
    let config = AppConfig::load_or_default(&config_path)?;

    match cli.command {
        Some(Command::History { language, search }) => {
            init_logging(&config, true);
            print_history(language, search.as_deref())
        }
        Some(Command::Practice(args)) => {
            init_logging(&config, false);
            practice(&config, args)
        }
        None => {
            init_logging(&config, false);
            practice(&config, cli.practice)
        }
    }
}

fn init_logging(config: &AppConfig, to_stderr: bool) {
    let log_dir = config
        .resolved_log_dir()
        .unwrap_or_else(|_| PathBuf::from("./logs"));
    init_tracing(&LogConfig {
        log_level: config.log.level.clone(),
        enable_file_logs: config.log.enable_file_logs,
        log_dir,
        to_stderr,
    });
}

// MARK: 練習

fn practice(config: &AppConfig, args: PracticeArgs) -> Result<()> {
    let mut settings = TrainerSettings {
        language: args.language.unwrap_or(config.language),
        difficulty: args.difficulty.unwrap_or(config.difficulty),
        active_recall: config.active_recall && !args.no_recall,
        audio_repeat: config.audio_repeat || args.repeat_audio,
        audio_mode: args.audio_mode.unwrap_or(config.audio_mode),
    };
    if args.choose {
        choose_settings(&mut settings)?;
    }

    let pack_dir = resolve_pack_dir(config, args.data_dir.as_deref())?;
    tracing::info!(
        language = %settings.language,
        difficulty = %settings.difficulty,
        packs = %pack_dir.display(),
        "starting practice"
    );

    let store: Box<dyn HistoryStore> = if args.ephemeral {
        Box::new(MemoryHistoryStore::default())
    } else {
        Box::new(FileHistoryStore::in_project_dirs()?)
    };
    let narrator: Box<dyn Narrator> = match args.speech_command.or_else(|| config.speech_command.clone()) {
        Some(program) => Box::new(CommandNarrator::new(program)),
        None => Box::new(SilentNarrator::default()),
    };

    let trainer = Trainer::new(
        settings,
        store,
        PackLoader::new(Arc::new(DirPackSource::new(pack_dir))),
        narrator,
        RandomPicker::thread(),
        Box::new(BasicTransliterator),
    );
    jern::app::run(trainer)?;
    tracing::info!("practice finished");
    Ok(())
}

/// 引数 > 設定ファイル > 同梱の data/ > データディレクトリの packs/
fn resolve_pack_dir(config: &AppConfig, cli_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = cli_dir {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = &config.data_dir {
        return Ok(dir.clone());
    }
    let bundled = PathBuf::from(BUNDLED_PACK_DIR);
    if bundled.is_dir() {
        return Ok(bundled);
    }
    config.resolved_data_dir()
}

fn choose_settings(settings: &mut TrainerSettings) -> Result<()> {
    let theme = ColorfulTheme::default();

    let labels: Vec<&str> = Language::ALL.iter().map(|l| l.label()).collect();
    let current = Language::ALL
        .iter()
        .position(|&l| l == settings.language)
        .unwrap_or(0);
    let picked = Select::with_theme(&theme)
        .with_prompt("Language")
        .items(&labels)
        .default(current)
        .interact()
        .map_err(|e| JernError::Prompt(e.to_string()))?;
    settings.language = Language::ALL[picked];

    let names: Vec<&str> = Difficulty::ALL.iter().map(|d| d.name()).collect();
    let current = Difficulty::ALL
        .iter()
        .position(|&d| d == settings.difficulty)
        .unwrap_or(0);
    let picked = Select::with_theme(&theme)
        .with_prompt("Difficulty")
        .items(&names)
        .default(current)
        .interact()
        .map_err(|e| JernError::Prompt(e.to_string()))?;
    settings.difficulty = Difficulty::ALL[picked];
    Ok(())
}

// MARK: 履歴表示

fn print_history(language: Option<Language>, search: Option<&str>) -> Result<()> {
    let store = FileHistoryStore::in_project_dirs()?;
    let history = History::from_words(store.load()?);

    if history.is_empty() {
        println!("{}", style("Your brain is a tabula rasa. Move your fingers.").dim().italic());
        return Ok(());
    }

    let matches: Option<Vec<&str>> =
        search.map(|q| history.search(q).into_iter().map(|w| w.id.as_str()).collect());

    for group in history.grouped() {
        if language.is_some_and(|l| l != group.language) {
            continue;
        }
        let words: Vec<_> = group
            .words
            .iter()
            .filter(|w| matches.as_ref().is_none_or(|m| m.contains(&w.id.as_str())))
            .collect();
        if words.is_empty() {
            continue;
        }

        println!(
            "{} {} {}",
            style(group.language.country_code()).dim(),
            style(group.language.label()).bold(),
            style(format!("({})", words.len())).cyan()
        );
        for word in words {
            println!(
                "  {}  {}  {}",
                style(&word.original).bold(),
                style(word.romanized()).green(),
                style(&word.definition).dim()
            );
        }
    }
    Ok(())
}
