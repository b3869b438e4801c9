use crate::error::Result;
use crate::settings::load_settings;
use crate::store::SqliteStore;

pub fn run() -> Result<()> {
    let settings = load_settings()?;
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!(
        "Gateway:    {} {}",
        settings.gateway.program,
        settings.gateway.args.join(" ")
    );
    println!("Batch size: {}", settings.effective_batch_size());

    if db_path.exists() {
        let store = SqliteStore::open(&db_path)?;
        let conn = store.conn();

        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
        let accounts = count("SELECT count(*) FROM accounts")?;
        let transactions = count("SELECT count(*) FROM transactions")?;
        let transfers = count("SELECT count(*) FROM transactions WHERE is_transfer = 1")?;
        let uncategorized = count(
            "SELECT count(*) FROM transactions WHERE category_id IS NULL AND is_transfer = 0",
        )?;
        let categories = count("SELECT count(*) FROM categories")?;

        println!();
        println!("Accounts:       {accounts}");
        println!("Transactions:   {transactions}");
        println!("Transfers:      {transfers}");
        println!("Uncategorized:  {uncategorized}");
        println!("Categories:     {categories}");
    } else {
        println!();
        println!("Database not found. Run `penny init` to set up.");
    }

    Ok(())
}
