use crate::config::Config;
use crate::library::{IngestReport, LibraryController, NextUnread};
use crate::llm::{Credential, GeminiClient, TextGenerator};
use crate::render;
use crate::segmenter::{SegmentSource, Segmenter};
use crate::store::LibraryStore;
use crate::summarizer::Summarizer;
use crate::txt_loader::TxtLoader;
use crate::types::{Recap, Selection};
use clap::{Parser, Subcommand};
use log::warn;
use std::path::PathBuf;

/// 📚 Book Shuffler - 随机顺序分段阅读
#[derive(Parser, Debug)]
#[command(name = "book-shuffler")]
#[command(about = "Split books into ~5000-word segments and read them in random order")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Gemini API 密钥
    #[arg(long, env = "GEMINI_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// 更详细的日志（可重复）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// 只输出错误日志
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// 导入 .txt 书籍并分段
    Add {
        /// 要导入的文本文件
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// 覆盖书名（只能用于单个文件）
        #[arg(long)]
        title: Option<String>,
        /// 重新导入已存在的书（进度清零）
        #[arg(long)]
        replace: bool,
        /// 不调用服务，直接按词数切分
        #[arg(long)]
        local: bool,
    },
    /// 随机给出一段未读内容
    Read {
        /// 输出转义后的 HTML 片段
        #[arg(long)]
        html: bool,
    },
    /// 显示每本书的阅读进度
    Status,
    /// 重置一本书的进度
    Reset { title: String },
    /// 重置所有书的进度
    ResetAll,
    /// 从书库删除一本书
    Delete { title: String },
}

/// 执行命令
pub fn run(cli: Cli) -> Result<(), String> {
    let config = Config::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    let credential = cli.api_key.as_deref().and_then(Credential::new);
    let controller = LibraryController::new(config.open_store());

    match cli.command {
        Command::Add {
            files,
            title,
            replace,
            local,
        } => add_books(&controller, &config, credential, &files, title, replace, local),
        Command::Read { html } => read_next(&controller, &config, credential, html),
        Command::Status => {
            show_status(&controller);
            Ok(())
        }
        Command::Reset { title } => {
            if controller.reset(&title).map_err(|e| e.to_string())? {
                println!("🔄 《{}》的进度已重置", title);
            } else {
                println!("⚠️  书库中没有《{}》", title);
            }
            Ok(())
        }
        Command::ResetAll => {
            let count = controller.reset_all().map_err(|e| e.to_string())?;
            println!("🔄 已重置 {} 本书的进度", count);
            Ok(())
        }
        Command::Delete { title } => {
            if controller.delete(&title).map_err(|e| e.to_string())? {
                println!("🗑️  已删除《{}》", title);
            } else {
                println!("⚠️  书库中没有《{}》", title);
            }
            Ok(())
        }
    }
}

fn gemini_client(config: &Config, credential: Option<Credential>) -> Result<GeminiClient, String> {
    GeminiClient::new(
        credential,
        config.api_base.clone(),
        config.model.clone(),
        config.request_timeout(),
    )
    .map_err(|e| e.to_string())
}

fn add_books<S: LibraryStore>(
    controller: &LibraryController<S>,
    config: &Config,
    credential: Option<Credential>,
    files: &[PathBuf],
    title: Option<String>,
    replace: bool,
    local: bool,
) -> Result<(), String> {
    if credential.is_none() && !local {
        return Err("请先提供 Gemini API 密钥（--api-key 或 GEMINI_API_KEY），或使用 --local".to_string());
    }
    if title.is_some() && files.len() > 1 {
        return Err("--title 只能用于单个文件".to_string());
    }

    let client = gemini_client(config, credential)?;
    let segmenter =
        Segmenter::with_settings(client, config.segment_word_count, config.segment_tolerance);

    import_files(controller, &segmenter, files, title.as_deref(), replace, local);
    Ok(())
}

/// 单个文件的导入结果
#[derive(Debug)]
pub enum AddOutcome {
    Ingested(IngestReport),
    /// 书库中已有同名书，未使用 --replace
    Skipped(String),
    Failed(String),
}

/// 逐个导入文件
///
/// 每个文件导入前都重新读取书库，同一次调用中先导入的书也会被视为已存在
///
/// # 参数
/// - `title`: 覆盖书名（单文件时使用）
/// - `replace`: 是否覆盖已存在的同名书
/// - `local`: 不调用服务，直接按词数切分
pub fn import_files<S: LibraryStore, G: TextGenerator>(
    controller: &LibraryController<S>,
    segmenter: &Segmenter<G>,
    files: &[PathBuf],
    title: Option<&str>,
    replace: bool,
    local: bool,
) -> Vec<AddOutcome> {
    let loader = TxtLoader::new();
    let mut outcomes = Vec::with_capacity(files.len());

    for path in files {
        let mut book = match loader.load(path) {
            Ok(book) => book,
            Err(e) => {
                eprintln!("❌ 读取 {} 失败: {}", path.display(), e);
                outcomes.push(AddOutcome::Failed(e.to_string()));
                continue;
            }
        };
        if let Some(title) = title {
            book.title = title.to_string();
        }

        if !replace && controller.snapshot().contains_key(&book.title) {
            println!("⏭️  《{}》已在书库中，跳过（使用 --replace 重新导入）", book.title);
            outcomes.push(AddOutcome::Skipped(book.title));
            continue;
        }

        println!("⏳ 正在处理《{}》({})...", book.title, book.encoding);
        let result = if local {
            controller.ingest_locally(segmenter, &book.title, &book.content)
        } else {
            controller.ingest(segmenter, &book.title, &book.content)
        };

        match result {
            Ok(report) => {
                let how = match report.source {
                    SegmentSource::Service => "AI 分段",
                    SegmentSource::Fallback => "按词数分段",
                };
                println!("✅ 《{}》处理完成，共 {} 段（{}）", report.title, report.total_segments, how);
                outcomes.push(AddOutcome::Ingested(report));
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                outcomes.push(AddOutcome::Failed(e.to_string()));
            }
        }
    }

    outcomes
}

fn read_next<S: LibraryStore>(
    controller: &LibraryController<S>,
    config: &Config,
    credential: Option<Credential>,
    html: bool,
) -> Result<(), String> {
    let selection = match controller.next_unread().map_err(|e| e.to_string())? {
        NextUnread::Segment(selection) => selection,
        NextUnread::EmptyLibrary => {
            println!("👈 书库是空的，先用 `add` 导入几本书吧");
            return Ok(());
        }
        NextUnread::Exhausted => {
            println!("🎉 所有的书都读完了！使用 `reset-all` 重新开始");
            return Ok(());
        }
    };

    if credential.is_none() && !selection.is_first {
        warn!("no API key given, the recap will use the fallback text");
    }
    let client = gemini_client(config, credential)?;
    let summarizer = Summarizer::with_context(
        client,
        config.recap_previous_words,
        config.recap_current_words,
    );
    let recap = recap_for(&selection, &summarizer);

    if html {
        print!("{}", render::selection_html(&selection, recap.as_ref()));
    } else {
        print_selection(&selection, recap.as_ref());
    }

    if let Some(record) = controller.snapshot().get(&selection.title) {
        println!();
        println!("{} {}", render::progress_bar(record.progress()), render::progress_line(record));
    }
    Ok(())
}

/// 非首段时生成回顾
pub fn recap_for<G: TextGenerator>(selection: &Selection, summarizer: &Summarizer<G>) -> Option<Recap> {
    if selection.is_first {
        return None;
    }
    let previous = selection.previous_segment.as_deref()?;
    Some(summarizer.recap(&selection.title, previous, &selection.segment_text))
}

fn print_selection(selection: &Selection, recap: Option<&Recap>) {
    println!("📖 {}", render::sanitize_for_terminal(&selection.title));
    println!("{}", render::segment_heading(selection));
    println!();

    if let Some(recap) = recap {
        println!("{}", render::sanitize_for_terminal(&recap.text));
        println!();
    }

    println!("{}", render::sanitize_for_terminal(&selection.segment_text));
}

fn show_status<S: LibraryStore>(controller: &LibraryController<S>) {
    let library = controller.snapshot();
    if library.is_empty() {
        println!("📭 还没有导入任何书");
        return;
    }

    println!("📊 阅读进度");
    for (title, record) in &library {
        println!();
        println!("{}", render::sanitize_for_terminal(title));
        println!(
            "  {} {} [{}]",
            render::progress_bar(record.progress()),
            render::progress_line(record),
            record.state().label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, OfflineGenerator};
    use crate::store::JsonFileStore;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    struct FixedReply;

    impl TextGenerator for FixedReply {
        fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok("Where we left off: a storm.".to_string())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn selection(index: usize) -> Selection {
        Selection {
            title: "Book".to_string(),
            segment_text: format!("seg-{}", index),
            segment_index: index,
            total_segments: 3,
            is_first: index == 0,
            previous_segment: index.checked_sub(1).map(|i| format!("seg-{}", i)),
        }
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::parse_from(["book-shuffler", "add", "a.txt", "b.txt", "--local"]);
        assert_eq!(
            cli.command,
            Command::Add {
                files: vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
                title: None,
                replace: false,
                local: true,
            }
        );
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["book-shuffler", "read", "--html", "-vv", "--api-key", "k"]);
        assert_eq!(cli.command, Command::Read { html: true });
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_parse_reset_all_and_delete() {
        let cli = Cli::parse_from(["book-shuffler", "reset-all"]);
        assert_eq!(cli.command, Command::ResetAll);

        let cli = Cli::parse_from(["book-shuffler", "delete", "War and Peace"]);
        assert_eq!(
            cli.command,
            Command::Delete {
                title: "War and Peace".to_string()
            }
        );
    }

    #[test]
    fn test_add_requires_files() {
        assert!(Cli::try_parse_from(["book-shuffler", "add"]).is_err());
    }

    #[test]
    fn test_no_recap_for_first_segment() {
        let summarizer = Summarizer::new(FixedReply);
        assert!(recap_for(&selection(0), &summarizer).is_none());
    }

    #[test]
    fn test_recap_for_later_segment() {
        let summarizer = Summarizer::new(FixedReply);
        let recap = recap_for(&selection(2), &summarizer).unwrap();
        assert_eq!(recap.text, "Where we left off: a storm.");
        assert!(recap.generated_at <= Utc::now());
    }

    fn write_book(dir: &TempDir, sub: &str, name: &str, content: &str) -> PathBuf {
        let folder = dir.path().join(sub);
        fs::create_dir_all(&folder).unwrap();
        let path = folder.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_same_title_twice_keeps_first_without_replace() {
        let dir = TempDir::new().unwrap();
        let first = write_book(&dir, "a", "Dune.txt", "spice must flow");
        let second = write_book(&dir, "b", "Dune.txt", "a completely different book text");
        let controller = LibraryController::new(JsonFileStore::new(dir.path().join("books_data.json")));
        let segmenter = Segmenter::with_settings(OfflineGenerator, 2, 0);

        let outcomes = import_files(&controller, &segmenter, &[first, second], None, false, true);

        assert!(matches!(outcomes[0], AddOutcome::Ingested(_)));
        assert!(matches!(&outcomes[1], AddOutcome::Skipped(title) if title == "Dune"));
        let library = controller.snapshot();
        assert_eq!(library["Dune"].segments, vec!["spice must", "flow"]);
    }

    #[test]
    fn test_same_title_twice_with_replace_keeps_last() {
        let dir = TempDir::new().unwrap();
        let first = write_book(&dir, "a", "Dune.txt", "spice must flow");
        let second = write_book(&dir, "b", "Dune.txt", "sandworms");
        let controller = LibraryController::new(JsonFileStore::new(dir.path().join("books_data.json")));
        let segmenter = Segmenter::with_settings(OfflineGenerator, 2, 0);

        let outcomes = import_files(&controller, &segmenter, &[first, second], None, true, true);

        assert!(matches!(&outcomes[1], AddOutcome::Ingested(report) if report.replaced));
        assert_eq!(controller.snapshot()["Dune"].segments, vec!["sandworms"]);
    }

    #[test]
    fn test_import_reports_unreadable_file_and_continues() {
        let dir = TempDir::new().unwrap();
        let good = write_book(&dir, "a", "Emma.txt", "Emma Woodhouse, handsome, clever");
        let missing = dir.path().join("missing.txt");
        let controller = LibraryController::new(JsonFileStore::new(dir.path().join("books_data.json")));
        let segmenter = Segmenter::new(OfflineGenerator);

        let outcomes = import_files(&controller, &segmenter, &[missing, good], Some("Emma"), false, true);

        assert!(matches!(outcomes[0], AddOutcome::Failed(_)));
        assert!(matches!(outcomes[1], AddOutcome::Ingested(_)));
        assert!(controller.snapshot().contains_key("Emma"));
    }
}
