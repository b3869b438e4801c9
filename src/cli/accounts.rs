use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::error::Result;
use crate::store::TransactionStore;

pub fn list() -> Result<()> {
    let (_, store) = open_store()?;
    let accounts = store.list_accounts()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Nickname", "Type"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.name),
            Cell::new(account.nickname.unwrap_or_default()),
            Cell::new(account.account_type),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
