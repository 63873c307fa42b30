use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use tokio::sync::mpsc;

use file_list_model::browser::{Browser, BrowserOptions};
use file_list_model::config::{AppConfig, GeneralConfig, SortConfig, TreeConfig, WatcherConfig};
use file_list_model::error::{ModelError, Result};
use file_list_model::event::EventHandler;
use file_list_model::model::{ModelEvent, SortColumn};
use file_list_model::render;

/// List a directory as a lazily loaded, sorted tree.
#[derive(Parser, Debug)]
#[command(name = "flm", version, about)]
struct Cli {
    /// Root directory to list (defaults to the configured path, then ".")
    path: Option<PathBuf>,

    /// Path to a config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Sort column: name, size, type or modified
    #[arg(long, short = 's')]
    sort: Option<String>,

    /// Sort descending
    #[arg(long, short = 'r')]
    reverse: bool,

    /// Mix directories with files instead of listing them first
    #[arg(long)]
    no_dirs_first: bool,

    /// Directory levels to expand below the top level
    #[arg(long, short = 'd')]
    depth: Option<usize>,

    /// Include hidden files
    #[arg(long, short = 'a')]
    all: bool,

    /// Print rows as JSON lines
    #[arg(long)]
    json: bool,

    /// Keep running and report model changes until interrupted
    #[arg(long, short = 'w')]
    watch: bool,

    /// Disable filesystem watcher (only meaningful with --watch)
    #[arg(long)]
    no_watcher: bool,
}

impl Cli {
    /// Partial config holding only what was given on the command line.
    fn overrides(&self) -> Result<AppConfig> {
        if let Some(name) = &self.sort {
            if SortColumn::from_name(name).is_none() {
                return Err(ModelError::Config(format!("unknown sort column {:?}", name)));
            }
        }
        Ok(AppConfig {
            general: GeneralConfig {
                default_path: None,
                show_hidden: self.all.then_some(true),
            },
            sort: SortConfig {
                column: self.sort.clone(),
                order: self.reverse.then(|| "descending".to_string()),
                directories_first: self.no_dirs_first.then_some(false),
            },
            tree: TreeConfig {
                expand_depth: self.depth,
                has_child: None,
            },
            watcher: WatcherConfig {
                enabled: (!self.watch || self.no_watcher).then_some(false),
                ..WatcherConfig::default()
            },
            ..AppConfig::default()
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = cli.overrides()?;
    let config = AppConfig::load(cli.config.as_deref(), Some(&overrides));

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level()))
        .format_timestamp(None)
        .init();

    let path = cli
        .path
        .clone()
        .or_else(|| config.default_path().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(path, &config, cli.json, cli.watch))
}

async fn run(path: PathBuf, config: &AppConfig, json: bool, watch: bool) -> Result<()> {
    let mut events = EventHandler::new();
    let mut browser = Browser::new(&path, BrowserOptions::from(config), &events)?;
    let mut changes = browser.model_mut().subscribe();

    log::info!("listing {}", browser.root().location.display());
    browser.start();
    browser.run_until_idle(&mut events).await?;
    drain(&mut changes);

    let rows = render::collect_rows(browser.model())?;
    let output = if json {
        render::render_json(&rows)?
    } else {
        render::render_text(&rows)
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    drop(stdout);

    if !watch {
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.next() => match event {
                Some(event) => browser.handle_event(event)?,
                None => break,
            },
        }
        for change in drain(&mut changes) {
            println!("{}", render::describe_event(&change));
        }
    }
    Ok(())
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ModelEvent>) -> Vec<ModelEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
