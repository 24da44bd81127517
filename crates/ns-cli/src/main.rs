//! Netsift CLI
//!
//! CLI tool for compiling filter lists and checking requests against them.

mod lists;

use clap::{Parser, Subcommand};
use serde::Serialize;

use ns_core::list::CategoryCounts;
use ns_core::orchestrator::FilterSet;
use ns_core::types::{RequestDescriptor, Verdict};

use lists::{load_lists, DroppedEntry, ListSpec};

#[derive(Parser)]
#[command(name = "ns-cli")]
#[command(about = "Netsift filter list compiler and request checker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile filter lists and report per-category statistics
    Compile {
        /// Filter lists as NAME=PATH or PATH, in evaluation order
        #[arg(short, long = "list", required = true)]
        lists: Vec<ListSpec>,

        /// Print every dropped line with the reason
        #[arg(long)]
        dropped: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Evaluate one request against the lists
    Check {
        /// Filter lists as NAME=PATH or PATH, in evaluation order
        #[arg(short, long = "list", required = true)]
        lists: Vec<ListSpec>,

        /// Resource URL being requested
        #[arg(short, long)]
        url: String,

        /// Domain of the page issuing the request
        #[arg(short, long)]
        domain: Option<String>,

        /// The request is third-party
        #[arg(short, long)]
        third_party: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile { lists, dropped, json } => cmd_compile(&lists, dropped, json).await,
        Commands::Check {
            lists,
            url,
            domain,
            third_party,
            json,
        } => cmd_check(&lists, &url, domain.as_deref(), third_party, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[derive(Serialize)]
struct ListReport<'a> {
    name: &'a str,
    version: &'a str,
    path: String,
    lines: usize,
    rules: usize,
    dropped: usize,
    deduped: usize,
    invalid_regex: usize,
    elapsed_ms: f64,
    categories: CategoryCounts,
    #[serde(skip_serializing_if = "no_entries")]
    dropped_lines: &'a [DroppedEntry],
}

fn no_entries(entries: &&[DroppedEntry]) -> bool {
    entries.is_empty()
}

async fn cmd_compile(specs: &[ListSpec], show_dropped: bool, json: bool) -> Result<(), String> {
    let loaded = load_lists(specs, show_dropped).await?;

    let reports: Vec<ListReport<'_>> = loaded
        .iter()
        .map(|l| ListReport {
            name: l.list.name(),
            version: l.list.version(),
            path: l.path.display().to_string(),
            lines: l.stats.lines,
            rules: l.stats.rules,
            dropped: l.stats.dropped,
            deduped: l.stats.deduped,
            invalid_regex: l.stats.invalid_regex,
            elapsed_ms: l.elapsed_ms,
            categories: l.list.counts(),
            dropped_lines: &l.dropped,
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&reports).map_err(|e| format!("Failed to encode JSON: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    for (idx, report) in reports.iter().enumerate() {
        println!("[{}] {} ({})", idx, report.name, report.path);
        if !report.version.is_empty() {
            println!("  Version:  {}", report.version);
        }
        println!("  Lines:    {}", report.lines);
        println!(
            "  Rules:    {} (dropped {}, duplicates {}, invalid regex {})",
            report.rules, report.dropped, report.deduped, report.invalid_regex
        );
        println!("  Time:     {:.1}ms", report.elapsed_ms);
        for (category, count) in report.categories.iter().filter(|(_, count)| *count > 0) {
            println!("    {:<30} {}", category.name(), count);
        }
        for entry in report.dropped_lines {
            println!("  - line {} [{}] {}", entry.line, entry.reason, entry.text);
        }
    }

    Ok(())
}

async fn cmd_check(
    specs: &[ListSpec],
    url: &str,
    domain: Option<&str>,
    third_party: bool,
    json: bool,
) -> Result<(), String> {
    let loaded = load_lists(specs, false).await?;
    let set = FilterSet::new(loaded.into_iter().map(|l| l.list).collect());

    let request = RequestDescriptor::new(domain, url, third_party);
    let verdict = set.evaluate(&request);

    if json {
        let out = serde_json::to_string_pretty(&verdict).map_err(|e| format!("Failed to encode JSON: {}", e))?;
        println!("{}", out);
    } else {
        print_verdict(&verdict);
    }

    Ok(())
}

fn print_verdict(verdict: &Verdict) {
    println!("Disposition: {:?}", verdict.disposition);
    if let Some(matched) = &verdict.matched {
        println!("  List:      {}", matched.list_name);
        println!("  Category:  {}", matched.category);
        println!("  Fragments: {}", matched.fragments);
        println!("  Rule:      {}", matched.original_text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_command() {
        let cli = Cli::try_parse_from([
            "ns-cli",
            "check",
            "--list",
            "easylist=a.txt",
            "--list",
            "b.txt",
            "--url",
            "https://ads.net/x.js",
            "--domain",
            "news.com",
            "--third-party",
        ])
        .unwrap();

        match cli.command {
            Commands::Check {
                lists,
                url,
                domain,
                third_party,
                json,
            } => {
                assert_eq!(lists.len(), 2);
                assert_eq!(lists[0].name.as_deref(), Some("easylist"));
                assert_eq!(url, "https://ads.net/x.js");
                assert_eq!(domain.as_deref(), Some("news.com"));
                assert!(third_party);
                assert!(!json);
            }
            _ => panic!("expected check"),
        }
    }
}
