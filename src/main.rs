use shotswp::cli::{format_bytes, is_confirmation, parse_command, AppConfig, Args, Command, HELP_TEXT};
use shotswp::config::UserConfig;
use shotswp::{
    CommitOutcome, Decision, DirectoryCatalog, MediaId, MediaItem, Result, SweepError,
    ThumbnailState, TriageSession,
};

use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Prompt = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    init_tracing(args.verbose);

    let user_config = UserConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load user config, using defaults");
        UserConfig::default()
    });
    let config = AppConfig::from_args(args, &user_config);

    if let Err(e) = run(&config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "shotswp=debug" } else { "shotswp=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(config: &AppConfig) -> Result<()> {
    let mut catalog = DirectoryCatalog::new(&config.directory)
        .with_screenshot_patterns(config.screenshot_patterns.clone());
    catalog.set_dry_run(config.dry_run);

    let mut session = TriageSession::new(Arc::new(catalog), config.session_options());
    let count = session.start().await?;

    if count == 0 {
        println!(
            "No screenshots found in directory: {}",
            config.directory.display()
        );
        return Ok(());
    }

    if config.list_only {
        print_candidates(session.cursor().candidates());
        return Ok(());
    }

    if config.dry_run {
        println!("[DRY RUN] No files will be moved to trash");
    }
    println!("Found {} screenshots. Type ? for help.", count);

    let mut prompt = BufReader::new(tokio::io::stdin()).lines();
    run_loop(&mut session, config, &mut prompt).await?;

    let stats = session.statistics();
    println!(
        "\nReviewed {} of {}: kept {}, {} still queued ({})",
        stats.reviewed,
        stats.total,
        stats.kept,
        stats.queued,
        format_bytes(stats.queued_bytes)
    );
    if stats.queued > 0 {
        println!("Queued items were not deleted.");
    }

    Ok(())
}

/// Main command loop
async fn run_loop(
    session: &mut TriageSession<DirectoryCatalog>,
    config: &AppConfig,
    prompt: &mut Prompt,
) -> Result<()> {
    let mut shown: Option<MediaId> = None;

    loop {
        match session.current().cloned() {
            Some(item) if shown.as_ref() != Some(&item.id) => {
                let thumbnail = session.thumbnail(&item).await;
                session.prefetch_next();
                print_card(session, &item, &thumbnail);
                shown = Some(item.id);
            }
            Some(_) => {}
            None if shown.is_some() => {
                let queue = session.queue().snapshot();
                println!(
                    "No more screenshots. {} queued ({}). Type c to clean or x to exit.",
                    queue.len(),
                    format_bytes(queue.queued_bytes())
                );
                shown = None;
            }
            None => {}
        }

        let Some(line) = read_line(prompt, "> ").await? else {
            break;
        };

        match parse_command(&line) {
            Command::Keep => {
                session.decide(Decision::Keep);
            }
            Command::Delete => {
                if let Some(item) = session.decide(Decision::Delete) {
                    println!(
                        "Queued {} ({} total)",
                        item.name,
                        format_bytes(session.queue().queued_bytes())
                    );
                }
            }
            Command::ShowQueue => print_queue(session),
            Command::Unqueue(n) => {
                let target = session.queue().items().into_iter().nth(n - 1);
                match target.and_then(|item| session.unqueue(&item.id)) {
                    Some(item) => println!("Removed {} from the queue", item.name),
                    None => println!("No queued item {}", n),
                }
            }
            Command::ClearQueue => {
                session.clear_queue();
                println!("Queue cleared");
            }
            Command::Clean => {
                clean(session, config, prompt).await?;
                shown = None;
            }
            Command::Help => println!("{}", HELP_TEXT),
            Command::Exit => break,
            Command::Unknown(input) if input.is_empty() => {}
            Command::Unknown(input) => println!("Unknown command: {} (? for help)", input),
        }
    }

    Ok(())
}

/// Deletes the queue after confirmation; a failed delete is reported and the queue kept
async fn clean(
    session: &mut TriageSession<DirectoryCatalog>,
    config: &AppConfig,
    prompt: &mut Prompt,
) -> Result<()> {
    let queue = session.queue().snapshot();
    if queue.is_empty() {
        println!("Nothing queued");
        return Ok(());
    }

    if !config.skip_confirm {
        let question = format!(
            "Move {} files ({}) to trash? [y/N] ",
            queue.len(),
            format_bytes(queue.queued_bytes())
        );
        match read_line(prompt, &question).await? {
            Some(answer) if is_confirmation(&answer) => {}
            _ => {
                println!("Cancelled");
                return Ok(());
            }
        }
    }

    match session.clean().await {
        Ok(CommitOutcome::Deleted { count, bytes }) => {
            let prefix = if config.dry_run { "[DRY RUN] " } else { "" };
            println!("{}Deleted {} files, freed {}", prefix, count, format_bytes(bytes));
        }
        Ok(CommitOutcome::NothingToDo) => println!("Nothing queued"),
        Err(e @ SweepError::DeleteFailed(_)) => {
            println!("{}. The queue was kept, try again with c.", e)
        }
        Err(e) => println!("{}", e),
    }

    Ok(())
}

async fn read_line(prompt: &mut Prompt, text: &str) -> Result<Option<String>> {
    print!("{}", text);
    io::stdout().flush()?;
    Ok(prompt.next_line().await?)
}

fn print_card(session: &TriageSession<DirectoryCatalog>, item: &MediaItem, thumbnail: &ThumbnailState) {
    let cursor = session.cursor();
    let preview = match thumbnail {
        ThumbnailState::Ready(t) => format!("{}x{}", t.width, t.height),
        ThumbnailState::Degraded(t) => format!("{}x{} (low quality)", t.width, t.height),
        ThumbnailState::Unavailable(_) | ThumbnailState::Stale => "no preview".to_string(),
    };

    println!(
        "\n[{}/{}] {}\n      {}  {}  preview {}",
        cursor.position() + 1,
        cursor.len(),
        item.name,
        item.created_at.format("%Y-%m-%d %H:%M"),
        format_bytes(item.estimated_size_bytes),
        preview
    );
}

fn print_queue(session: &TriageSession<DirectoryCatalog>) {
    let queue = session.queue().snapshot();
    if queue.is_empty() {
        println!("Queue is empty");
        return;
    }

    for (i, item) in queue.items().iter().enumerate() {
        println!(
            "  {:>3}. {}  {}",
            i + 1,
            item.name,
            format_bytes(item.estimated_size_bytes)
        );
    }
    println!(
        "  {} selected, space to be freed: {}",
        queue.len(),
        format_bytes(queue.queued_bytes())
    );
}

fn print_candidates(candidates: &[MediaItem]) {
    let total: u64 = candidates.iter().map(|c| c.estimated_size_bytes).sum();
    for item in candidates {
        println!(
            "{}  {:>10}  {}",
            item.created_at.format("%Y-%m-%d %H:%M"),
            format_bytes(item.estimated_size_bytes),
            item.name
        );
    }
    println!("{} screenshots, {}", candidates.len(), format_bytes(total));
}
