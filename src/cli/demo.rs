use chrono::{Datelike, Local};

use crate::cli::open_store;
use crate::error::Result;
use crate::models::{Account, Transaction};
use crate::store::{SqliteStore, TransactionStore};

const CHECKING: &str = "demo-checking";
const SAVINGS: &str = "demo-savings";
const CARD: &str = "demo-card";
const MONTHS: u32 = 3;

struct DemoAccount {
    id: &'static str,
    name: &'static str,
    nickname: Option<&'static str>,
    account_type: &'static str,
}

const ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        id: CHECKING,
        name: "CHASE TOTAL CHECKING",
        nickname: Some("Everyday"),
        account_type: "checking",
    },
    DemoAccount {
        id: SAVINGS,
        name: "ALLY ONLINE SAVINGS",
        nickname: Some("Rainy Day"),
        account_type: "savings",
    },
    DemoAccount {
        id: CARD,
        name: "AMEX GOLD CARD",
        nickname: None,
        account_type: "credit_card",
    },
];

/// Transactions repeated every month: (account, day, description, cents).
const MONTHLY: &[(&str, u32, &str, i64)] = &[
    (CHECKING, 1, "ACME CORP PAYROLL", 412_500),
    (CHECKING, 2, "OAKWOOD APARTMENTS RENT", -185_000),
    (CHECKING, 6, "PACIFIC GAS & ELECTRIC", -9_412),
    (CARD, 4, "WHOLE FOODS MARKET #1043", -8_421),
    (CARD, 9, "SHELL OIL 5744", -4_310),
    (CARD, 11, "NETFLIX.COM", -1_549),
    (CARD, 13, "STARBUCKS STORE 2291", -675),
    (CARD, 18, "TRADER JOE'S #552", -6_230),
    (CARD, 21, "CHIPOTLE 1187", -1_388),
    (CARD, 24, "AMAZON MKTPLACE PMTS", -3_699),
    (SAVINGS, 28, "INTEREST PAYMENT", 412),
    (CHECKING, 15, "ACME CORP PAYROLL", 412_500),
];

/// Money moving between the demo accounts: (from, to, day, outgoing
/// description, incoming description, cents).
const TRANSFERS: &[(&str, &str, u32, &str, &str, i64)] = &[
    (CHECKING, SAVINGS, 3, "ONLINE TRANSFER TO SAV ...4821", "TRANSFER FROM CHK ...0917", 50_000),
    (CHECKING, CARD, 26, "AMEX EPAYMENT ACH PMT", "ONLINE PAYMENT - THANK YOU", 24_600),
];

fn txn(id: String, account_id: &str, posted: &str, description: &str, amount: i64) -> Transaction {
    Transaction {
        id,
        account_id: account_id.to_string(),
        posted: posted.to_string(),
        amount,
        description: description.to_string(),
        is_pending: false,
        is_transfer: false,
        category_id: None,
    }
}

/// Build a few months of transactions ending at the current month. Days stay
/// at or below 28 so every month has them.
fn generate_transactions() -> Vec<Transaction> {
    let today = Local::now().date_naive();
    let mut txns = Vec::new();

    for i in 0..MONTHS {
        let target = today - chrono::Months::new(MONTHS - 1 - i);
        let (year, month) = (target.year(), target.month());
        let date = |day: u32| format!("{year:04}-{month:02}-{day:02}");

        for (n, (account, day, description, amount)) in MONTHLY.iter().enumerate() {
            txns.push(txn(
                format!("demo-{year}{month:02}-{n:02}"),
                account,
                &date(*day),
                description,
                *amount,
            ));
        }
        for (n, (from, to, day, out_desc, in_desc, amount)) in TRANSFERS.iter().enumerate() {
            let prefix = format!("demo-{year}{month:02}-x{n}");
            txns.push(txn(format!("{prefix}-out"), from, &date(*day), out_desc, -amount));
            txns.push(txn(format!("{prefix}-in"), to, &date(*day), in_desc, *amount));
        }
    }

    // the newest card charge has not settled yet
    if let Some(last) = txns.iter_mut().rev().find(|t| t.account_id == CARD && t.amount < 0) {
        last.is_pending = true;
    }
    txns
}

fn insert_demo_data(store: &SqliteStore) -> Result<usize> {
    for a in ACCOUNTS {
        store.upsert_account(&Account {
            id: a.id.to_string(),
            name: a.name.to_string(),
            nickname: a.nickname.map(str::to_string),
            account_type: a.account_type.to_string(),
        })?;
    }
    let txns = generate_transactions();
    for t in &txns {
        store.upsert_transaction(t)?;
    }
    Ok(txns.len())
}

pub fn run() -> Result<()> {
    let (_, store) = open_store()?;

    if store.list_accounts()?.iter().any(|a| a.id == CHECKING) {
        println!("Demo data already loaded (account '{CHECKING}' exists).");
        return Ok(());
    }

    let count = insert_demo_data(&store)?;
    println!("Demo data loaded!");
    println!("  {} accounts, {count} transactions", ACCOUNTS.len());
    println!();
    println!("Next steps:");
    println!("  penny categorize --dry-run   preview model suggestions");
    println!("  penny review                 categorize by hand");
    Ok(())
}
