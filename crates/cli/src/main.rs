use clap::{Parser, Subcommand};
use pview_core::constants::{DEFAULT_PAGE_LENGTH, MAX_PAGE_WINDOW, PAGE_CNT, PATIENT_COLUMNS};
use pview_core::filter::{build_filter, ReferenceData};
use pview_core::pagination::{clamp_to_limit, compute_range, limit_page, make_seq_array};
use pview_core::sort::{next_sort_state, SortState};
use pview_core::store::Store;
use pview_core::{CoreConfig, ListOrchestrator, RecordingDispatcher, UiCommand};
use pview_types::{PageLength, PageNumber};
use std::path::Path;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pview")]
#[command(about = "PView patient list core CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the patient table columns
    Columns,
    /// Show the page window containing a page
    Range {
        /// Page number (1-based)
        page: u32,
        /// Window size
        #[arg(
            long,
            default_value_t = PAGE_CNT,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE_WINDOW))
        )]
        window: u32,
        /// Total rows in the list; clamps the window to the last page
        #[arg(long)]
        total: Option<u64>,
        /// Rows per page, used with --total
        #[arg(long, default_value_t = DEFAULT_PAGE_LENGTH.get())]
        length: u32,
    },
    /// Show the sort state after a header click
    Sort {
        /// Clicked column
        column: String,
        /// Currently active column (optional)
        #[arg(long)]
        active: Option<String>,
        /// The active column is sorted descending
        #[arg(long)]
        desc: bool,
    },
    /// Print the filter descriptor for a column as JSON
    Filter {
        /// Column id (gender, age, race, ethnicity, isDeath)
        column: String,
        /// Gender options (comma-separated)
        #[arg(long, default_value = "")]
        gender: String,
        /// Race options (comma-separated)
        #[arg(long, default_value = "")]
        race: String,
        /// Ethnicity options (comma-separated)
        #[arg(long, default_value = "")]
        ethnicity: String,
    },
    /// Print the actions a script of UI events dispatches, one JSON line each
    Replay {
        /// File of UiCommand JSON lines
        script: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Columns) => {
            for column in PATIENT_COLUMNS {
                println!(
                    "{:<14} {:<14} {}",
                    column.id,
                    column.label,
                    column.table_col.unwrap_or("(not sortable)")
                );
            }
        }
        Some(Commands::Range {
            page,
            window,
            total,
            length,
        }) => {
            let range = compute_range(PageNumber::new(page)?, window);
            let pages = match total {
                Some(total) => clamp_to_limit(&range, limit_page(total, PageLength::new(length)?)),
                None => make_seq_array(&range),
            };
            println!("window: {}..={}", range.start(), range.end());
            println!("pages: {}", join(&pages));
        }
        Some(Commands::Sort {
            column,
            active,
            desc,
        }) => {
            let prior = SortState {
                active_column: active,
                descending: desc,
            };
            let next = next_sort_state(Some(&column), &prior);
            println!(
                "active: {}, descending: {}",
                next.active_column.as_deref().unwrap_or("-"),
                next.descending
            );
        }
        Some(Commands::Filter {
            column,
            gender,
            race,
            ethnicity,
        }) => {
            let reference = ReferenceData {
                gender: split_list(&gender),
                race: split_list(&race),
                ethnicity: split_list(&ethnicity),
            };
            match build_filter(&column, &reference) {
                Some(descriptor) => println!("{}", serde_json::to_string_pretty(&descriptor)?),
                None => eprintln!("'{}' is not a filterable column", column),
            }
        }
        Some(Commands::Replay { script }) => {
            for line in replay(Path::new(&script))? {
                println!("{}", line);
            }
        }
        None => {
            println!("Use 'pview --help' for commands");
        }
    }

    Ok(())
}

/// Runs a script through an orchestrator and store without answering any fetch.
fn replay(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let cfg = Arc::new(CoreConfig::default());
    let mut store = Store::new(&cfg);
    let mut orchestrator = ListOrchestrator::new(cfg);
    let mut out = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: UiCommand = serde_json::from_str(line)
            .map_err(|e| format!("line {}: {}", n + 1, e))?;

        let mut dispatcher = RecordingDispatcher::new();
        let outcome = orchestrator.handle(&event, store.snapshot(), &mut dispatcher);
        if !outcome.is_dispatched() {
            eprintln!("line {}: {:?}", n + 1, outcome);
        }
        for action in dispatcher.take() {
            store.apply(&action);
            out.push(action.to_json()?);
        }
    }

    Ok(out)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn join(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
