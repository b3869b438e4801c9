use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::categorizer::{
    run_automatic, AutoOptions, AutoSummary, BatchCategorizer, BatchProgress, BatchStatus, Phase,
    Scope,
};
use crate::cli::open_store;
use crate::error::Result;
use crate::gateway::CommandGateway;

fn print_progress(p: &BatchProgress) {
    let phase = match p.phase {
        Phase::Transfers => "transfers",
        Phase::Categories => "categories",
    };
    match &p.status {
        BatchStatus::Started => {
            println!(
                "  {phase}: batch {}/{} ({} transactions)...",
                p.batch, p.total, p.size
            );
        }
        BatchStatus::Finished { suggestions } => {
            println!(
                "  {phase}: batch {}/{} {} ({suggestions} suggestions)",
                p.batch,
                p.total,
                "done".green()
            );
        }
        BatchStatus::Skipped { error } => {
            println!(
                "  {phase}: batch {}/{} {}: {error}",
                p.batch,
                p.total,
                "skipped".yellow()
            );
        }
    }
}

fn print_dry_run(summary: &AutoSummary) {
    let transfers: Vec<_> = summary.transfers.iter().filter(|s| s.is_transfer).collect();
    if !transfers.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Transaction", "Reasoning"]);
        for s in transfers {
            table.add_row(vec![Cell::new(&s.transaction_id), Cell::new(&s.reasoning)]);
        }
        println!("Transfers\n{table}");
    }
    if !summary.categories.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Transaction", "Category", "Confidence", "Reasoning"]);
        for s in &summary.categories {
            table.add_row(vec![
                Cell::new(&s.transaction_id),
                Cell::new(&s.category),
                Cell::new(format!("{:.0}%", s.confidence * 100.0)),
                Cell::new(&s.reasoning),
            ]);
        }
        println!("Categories\n{table}");
    }
}

pub fn run(all: bool, dry_run: bool) -> Result<()> {
    let (settings, store) = open_store()?;
    let gateway = CommandGateway::new(
        settings.gateway.program.clone(),
        settings.gateway.args.clone(),
    );
    let categorizer = BatchCategorizer::new(&gateway, settings.effective_batch_size());
    let options = AutoOptions {
        scope: if all { Scope::All } else { Scope::Uncategorized },
        dry_run,
        examples_limit: settings.examples_limit,
    };

    println!(
        "Categorizing {} in batches of {}",
        if all { "all transactions" } else { "uncategorized transactions" },
        categorizer.batch_size()
    );
    let mut progress = |p: &BatchProgress| print_progress(p);
    let summary = match run_automatic(&store, &categorizer, &options, &mut progress) {
        Ok(summary) => summary,
        Err(e) if e.is_gateway_failure() => {
            eprintln!(
                "{}",
                format!(
                    "Transfer identification failed; nothing was written. Check the gateway command `{}`.",
                    settings.gateway.program
                )
                .red()
            );
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if dry_run {
        print_dry_run(&summary);
        println!(
            "{} {} transfers, {} categories suggested (nothing written)",
            "Dry run:".bold(),
            summary.transfers_marked,
            summary.categorized
        );
    } else {
        println!(
            "{} transfers marked, {} categorized",
            summary.transfers_marked, summary.categorized
        );
    }
    if summary.batches_skipped > 0 {
        println!(
            "{}",
            format!("{} batch(es) skipped; re-run to retry them", summary.batches_skipped).yellow()
        );
    }
    Ok(())
}
