use colored::Colorize;

use crate::browser::CategoryBrowser;
use crate::cli::open_store;
use crate::error::Result;
use crate::models::TransactionFilter;
use crate::tui::Theme;

pub fn run(account: Option<String>, from: Option<String>, to: Option<String>) -> Result<()> {
    let (_, store) = open_store()?;
    let filter = TransactionFilter {
        account_id: account,
        from,
        to,
    };

    let mut browser = CategoryBrowser::load(&store, filter)?;
    if browser.is_empty() {
        println!("{}", "No transactions to review.".green());
        return Ok(());
    }
    browser.run(&store, &Theme::default())
}
