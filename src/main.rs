use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use study_hub_lib::content::{Difficulty, Volume};
use study_hub_lib::formula;
use study_hub_lib::{HubConfig, HubError, StudyHub};

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser, Debug)]
#[command(
    name = "study-hub",
    version,
    about = "Physics Study Hub: search chapters, render formulas, practise and review"
)]
struct CliArgs {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Override the data directory (defaults to STUDY_HUB_DATA_DIR or ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter chapters, formulas and problems by a search string
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, default_value = "vol1")]
        volume: Volume,
    },
    /// Split formula markup into plain/subscript/superscript segments
    Formula {
        text: String,
        /// Render as HTML instead of a segment list
        #[arg(long)]
        html: bool,
    },
    /// List practice problems
    Problems {
        #[arg(default_value = "")]
        query: String,
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },
    /// Featured problems for the home page
    Featured {
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
    /// Check and record an answer to a practice problem
    Answer { problem_id: u32, answer: String },
    /// Print the flashcards of a volume or chapter
    Flashcards {
        #[arg(long, default_value = "vol1")]
        volume: Volume,
        #[arg(long)]
        chapter: Option<u32>,
        /// Shuffle with this seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Record a flashcard review
    Review {
        card_key: String,
        /// Mark the card as not yet known
        #[arg(long)]
        unknown: bool,
    },
    /// Ask the AI tutor; reads follow-up questions from stdin when no question is given
    Ask {
        question: Option<String>,
        #[arg(long, default_value = "vol1")]
        volume: Volume,
        #[arg(long)]
        chapter: Option<u32>,
    },
    /// Run an auth trigger event (JSON file, or stdin with "-") and print the result
    Trigger { event: PathBuf },
    /// Show study progress
    Progress,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(log_filter())
        .init();

    let args = CliArgs::parse();
    let mut config = HubConfig::load();
    if let Some(dir) = args.data_dir.clone() {
        config.data_dir = dir;
    }

    let hub = match StudyHub::open(config) {
        Ok(hub) => hub,
        Err(e) => {
            error!("Failed to load content: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&hub, args.command, args.json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// 日志过滤：RUST_LOG 优先，未设置或无法解析时只输出 warn 及以上
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), HubError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(hub: &StudyHub, command: Command, json: bool) -> Result<(), HubError> {
    match command {
        Command::Search { query, volume } => {
            let result = hub.search(&query, volume);
            if json {
                return print_json(&result);
            }
            if result.is_empty() {
                println!("No results for \"{}\" in {}", query, volume);
                return Ok(());
            }
            println!("Chapters ({}):", result.chapters.len());
            for chapter in &result.chapters {
                println!("  {}. {}", chapter.id, chapter.title);
            }
            println!("Formulas ({}):", result.formulas.len());
            for f in &result.formulas {
                let text = formula::to_plain_text(&formula::render(&f.formula));
                println!("  {}: {}", f.name, text);
            }
            println!("Problems ({}):", result.problems.len());
            for problem in &result.problems {
                println!("  #{} [{}] {}", problem.id, problem.difficulty, problem.question);
            }
        }
        Command::Formula { text, html } => {
            let segments = formula::render(&text);
            if html {
                println!("{}", formula::to_html(&segments));
            } else if json {
                print_json(&segments)?;
            } else {
                for segment in &segments {
                    println!("{:?}\t{:?}", segment.kind, segment.text);
                }
            }
        }
        Command::Problems { query, difficulty } => {
            let problems = hub.problems(&query, difficulty);
            if json {
                return print_json(&problems);
            }
            for problem in problems {
                println!(
                    "#{} [{}] {}: {}",
                    problem.id, problem.difficulty, problem.topic, problem.question
                );
            }
        }
        Command::Featured { limit } => {
            let problems = hub.featured_problems(limit);
            if json {
                return print_json(&problems);
            }
            for problem in problems {
                println!("#{} [{}] {}", problem.id, problem.difficulty, problem.question);
            }
        }
        Command::Answer { problem_id, answer } => {
            let verdict = hub.submit_answer(problem_id, &answer)?;
            if json {
                return print_json(&verdict);
            }
            println!("{:?}", verdict);
        }
        Command::Flashcards { volume, chapter, seed } => {
            let mut deck = hub.flashcards(volume, chapter)?;
            if let Some(seed) = seed {
                deck.shuffle(seed);
            }
            if json {
                return print_json(&deck.cards());
            }
            for card in deck.cards() {
                println!("[{}] {}\n{}\n", card.key, card.front, card.back);
            }
        }
        Command::Review { card_key, unknown } => {
            hub.record_review(&card_key, !unknown)?;
        }
        Command::Ask { question, volume, chapter } => {
            let mut tutor = hub.tutor(chapter.map(|id| (volume, id)))?;
            match question {
                Some(question) => println!("{}", tutor.ask(&question, hub.catalog())?),
                None => {
                    let stdin = io::stdin();
                    print!("> ");
                    io::stdout().flush()?;
                    for line in stdin.lock().lines() {
                        let line = line?;
                        if line.trim().eq_ignore_ascii_case("exit") {
                            break;
                        }
                        match tutor.ask(&line, hub.catalog()) {
                            Ok(answer) => println!("{}\n", answer),
                            Err(e) => eprintln!("{}", e),
                        }
                        print!("> ");
                        io::stdout().flush()?;
                    }
                }
            }
        }
        Command::Trigger { event } => {
            let raw = if event.as_os_str() == "-" {
                io::read_to_string(io::stdin())?
            } else {
                fs::read_to_string(&event)?
            };
            let value = serde_json::from_str(&raw)?;
            print_json(&hub.handle_trigger(value))?;
        }
        Command::Progress => {
            let report = hub.progress()?;
            if json {
                return print_json(&report);
            }
            println!("Solved {} of {} problems", report.solved.len(), report.total_problems);
            println!(
                "Flashcards reviewed: {} ({} known)",
                report.reviews.reviewed, report.reviews.known
            );
        }
    }
    Ok(())
}
