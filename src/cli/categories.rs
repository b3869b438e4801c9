use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::error::Result;
use crate::store::TransactionStore;

pub fn add(name: &str, internal: bool) -> Result<()> {
    let (_, store) = open_store()?;
    store.add_category(name, internal)?;
    println!("Added category: {}", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, store) = open_store()?;
    let categories = store.list_categories()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Kind"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(if cat.is_internal { "internal" } else { "regular" }),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
