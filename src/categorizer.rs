//! Batch categorization through an external model.
//!
//! Two passes run in order. Transfer identification walks the transactions in
//! overlapping windows so a matched pair straddling a boundary still lands in
//! one window, and gives up entirely on the first failed window: flagging only
//! one side of a pair is worse than flagging nothing. Categorization uses plain
//! consecutive batches and skips a failed batch, since every transaction is
//! independent there.

use std::collections::HashSet;
use std::ops::Range;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::gateway::{parse_response, Gateway};
use crate::models::{
    Account, CategorizedExample, Category, CategoryAnalysisResult, CategorySuggestion, Transaction,
    TransactionFilter, TransferAnalysisResult, TransferSuggestion,
};
use crate::prompts::{category_prompt, transfer_prompt};
use crate::store::TransactionStore;

pub const DEFAULT_BATCH_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Transfers,
    Categories,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    Started,
    Finished { suggestions: usize },
    Skipped { error: String },
}

#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub phase: Phase,
    /// 1-based batch number.
    pub batch: usize,
    pub total: usize,
    pub size: usize,
    pub status: BatchStatus,
}

/// Window ranges for transfer identification. Consecutive windows share
/// `clamp(batch_size / 5, 2, 5)` transactions.
pub fn transfer_windows(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    if len == 0 {
        return vec![];
    }
    if len <= batch_size {
        return vec![0..len];
    }
    let overlap = (batch_size / 5).clamp(2, 5);
    let step = batch_size.saturating_sub(overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + batch_size).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += step;
    }
    windows
}

/// Non-overlapping batch ranges for categorization.
pub fn category_batches(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct CategorizeOutcome {
    pub suggestions: Vec<CategorySuggestion>,
    pub batches_skipped: usize,
}

pub struct BatchCategorizer<'a> {
    gateway: &'a dyn Gateway,
    batch_size: usize,
}

impl<'a> BatchCategorizer<'a> {
    pub fn new(gateway: &'a dyn Gateway, batch_size: usize) -> Self {
        Self {
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Ask the model which transactions are transfers between the user's own
    /// accounts. Any failed window fails the whole call.
    pub fn identify_transfers(
        &self,
        transactions: &[Transaction],
        accounts: &[Account],
        progress: &mut dyn FnMut(&BatchProgress),
    ) -> Result<Vec<TransferSuggestion>> {
        let windows = transfer_windows(transactions.len(), self.batch_size);
        let total = windows.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<TransferSuggestion> = Vec::new();

        for (i, range) in windows.into_iter().enumerate() {
            let window = &transactions[range.clone()];
            let mut report = |status| {
                progress(&BatchProgress {
                    phase: Phase::Transfers,
                    batch: i + 1,
                    total,
                    size: window.len(),
                    status,
                })
            };
            report(BatchStatus::Started);
            debug!(window = i + 1, start = range.start, end = range.end, "Identifying transfers");

            let response = self
                .gateway
                .run(&transfer_prompt(window, accounts))
                .and_then(|text| parse_response::<TransferAnalysisResult>(&text))
                .map_err(|e| {
                    warn!(window = i + 1, error = %e, "Transfer identification aborted");
                    e
                })?;

            let in_window: HashSet<&str> = window.iter().map(|t| t.id.as_str()).collect();
            let mut added = 0;
            for suggestion in response.suggestions {
                if !in_window.contains(suggestion.transaction_id.as_str()) {
                    warn!(
                        id = %suggestion.transaction_id,
                        "Dropping transfer suggestion for unknown transaction"
                    );
                    continue;
                }
                if seen.insert(suggestion.transaction_id.clone()) {
                    merged.push(suggestion);
                    added += 1;
                }
            }
            report(BatchStatus::Finished { suggestions: added });
        }

        info!(suggestions = merged.len(), "Transfer identification finished");
        Ok(merged)
    }

    /// Ask the model for a category per transaction. Failed batches are
    /// skipped and counted.
    pub fn categorize_transactions(
        &self,
        transactions: &[Transaction],
        categories: &[Category],
        accounts: &[Account],
        examples: &[CategorizedExample],
        progress: &mut dyn FnMut(&BatchProgress),
    ) -> CategorizeOutcome {
        let batches = category_batches(transactions.len(), self.batch_size);
        let total = batches.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut outcome = CategorizeOutcome::default();

        for (i, range) in batches.into_iter().enumerate() {
            let batch = &transactions[range];
            let mut report = |status| {
                progress(&BatchProgress {
                    phase: Phase::Categories,
                    batch: i + 1,
                    total,
                    size: batch.len(),
                    status,
                })
            };
            report(BatchStatus::Started);

            let prompt = category_prompt(batch, categories, accounts, examples);
            let response = match self
                .gateway
                .run(&prompt)
                .and_then(|text| parse_response::<CategoryAnalysisResult>(&text))
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(batch = i + 1, error = %e, "Skipping categorization batch");
                    outcome.batches_skipped += 1;
                    report(BatchStatus::Skipped { error: e.to_string() });
                    continue;
                }
            };

            let in_batch: HashSet<&str> = batch.iter().map(|t| t.id.as_str()).collect();
            let mut added = 0;
            for suggestion in response.suggestions {
                if !in_batch.contains(suggestion.transaction_id.as_str()) {
                    warn!(
                        id = %suggestion.transaction_id,
                        "Dropping category suggestion for unknown transaction"
                    );
                    continue;
                }
                if suggestion.category.trim().is_empty() {
                    continue;
                }
                if seen.insert(suggestion.transaction_id.clone()) {
                    outcome.suggestions.push(suggestion);
                    added += 1;
                }
            }
            report(BatchStatus::Finished { suggestions: added });
        }

        info!(
            suggestions = outcome.suggestions.len(),
            skipped = outcome.batches_skipped,
            "Categorization finished"
        );
        outcome
    }
}

/// Flag every transaction the model called a transfer. Returns how many were marked.
pub fn apply_transfers(
    store: &dyn TransactionStore,
    suggestions: &[TransferSuggestion],
) -> Result<usize> {
    let mut marked = 0;
    for s in suggestions.iter().filter(|s| s.is_transfer) {
        store.set_transfer_flag(&s.transaction_id)?;
        marked += 1;
    }
    Ok(marked)
}

/// Write each suggested category, creating it under its exact name if needed.
/// Returns how many transactions were written.
pub fn apply_categories(
    store: &dyn TransactionStore,
    suggestions: &[CategorySuggestion],
) -> Result<usize> {
    let mut written = 0;
    for s in suggestions {
        let category_id = store.get_or_create_category(&s.category)?;
        store.set_category(&s.transaction_id, category_id)?;
        written += 1;
    }
    Ok(written)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Uncategorized,
    All,
}

#[derive(Debug, Clone)]
pub struct AutoOptions {
    pub scope: Scope,
    /// Compute suggestions without writing anything.
    pub dry_run: bool,
    pub examples_limit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AutoSummary {
    pub transfers: Vec<TransferSuggestion>,
    pub categories: Vec<CategorySuggestion>,
    pub transfers_marked: usize,
    pub categorized: usize,
    pub batches_skipped: usize,
}

fn fetch(store: &dyn TransactionStore, scope: Scope) -> Result<Vec<Transaction>> {
    match scope {
        Scope::Uncategorized => store.list_uncategorized(),
        Scope::All => store.list_transactions(&TransactionFilter::default()),
    }
}

/// The full automatic pipeline: transfers first, then categories for what is
/// left. Safe to re-run; every write is an overwrite.
pub fn run_automatic(
    store: &dyn TransactionStore,
    categorizer: &BatchCategorizer,
    options: &AutoOptions,
    progress: &mut dyn FnMut(&BatchProgress),
) -> Result<AutoSummary> {
    let accounts = store.list_accounts()?;
    let mut summary = AutoSummary::default();

    let candidates = fetch(store, options.scope)?;
    info!(count = candidates.len(), scope = ?options.scope, "Starting automatic categorization");
    summary.transfers = categorizer.identify_transfers(&candidates, &accounts, progress)?;
    let flagged: HashSet<&str> = summary
        .transfers
        .iter()
        .filter(|s| s.is_transfer)
        .map(|s| s.transaction_id.as_str())
        .collect();
    if options.dry_run {
        summary.transfers_marked = flagged.len();
    } else {
        summary.transfers_marked = apply_transfers(store, &summary.transfers)?;
    }

    let remaining: Vec<Transaction> = fetch(store, options.scope)?
        .into_iter()
        .filter(|t| !t.is_transfer && !flagged.contains(t.id.as_str()))
        .collect();
    let categories = store.list_categories()?;
    let examples = if options.examples_limit > 0 {
        store.categorized_examples(options.examples_limit)?
    } else {
        vec![]
    };

    let outcome = categorizer.categorize_transactions(
        &remaining,
        &categories,
        &accounts,
        &examples,
        progress,
    );
    summary.batches_skipped = outcome.batches_skipped;
    summary.categories = outcome.suggestions;
    if options.dry_run {
        summary.categorized = summary.categories.len();
    } else {
        summary.categorized = apply_categories(store, &summary.categories)?;
    }

    Ok(summary)
}
