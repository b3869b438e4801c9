use std::collections::HashMap;

use serde::Serialize;

use crate::fmt::decimal;
use crate::models::{Account, CategorizedExample, Category, Transaction};

#[derive(Serialize)]
struct PromptAccount<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    account_type: &'a str,
}

#[derive(Serialize)]
struct PromptTransaction<'a> {
    id: &'a str,
    date: &'a str,
    account: &'a str,
    amount: String,
    description: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pending: bool,
}

#[derive(Serialize)]
struct PromptExample<'a> {
    description: &'a str,
    amount: String,
    category: &'a str,
}

fn accounts_json(accounts: &[Account]) -> String {
    let rows: Vec<PromptAccount> = accounts
        .iter()
        .map(|a| PromptAccount {
            id: &a.id,
            name: a.display_name(),
            account_type: &a.account_type,
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

fn transactions_json(transactions: &[Transaction], accounts: &[Account]) -> String {
    let names: HashMap<&str, &str> = accounts
        .iter()
        .map(|a| (a.id.as_str(), a.display_name()))
        .collect();
    let rows: Vec<PromptTransaction> = transactions
        .iter()
        .map(|t| PromptTransaction {
            id: &t.id,
            date: &t.posted,
            account: names.get(t.account_id.as_str()).copied().unwrap_or(&t.account_id),
            amount: decimal(t.amount),
            description: &t.description,
            pending: t.is_pending,
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

fn bullet_list(names: &[&str]) -> String {
    if names.is_empty() {
        return "(none)".to_string();
    }
    names.iter().map(|n| format!("- {n}")).collect::<Vec<_>>().join("\n")
}

pub fn transfer_prompt(transactions: &[Transaction], accounts: &[Account]) -> String {
    format!(
        "You identify transfers between a single person's own accounts.\n\
         \n\
         A transfer moves money from one of the accounts below to another one of them: \
         a checking-to-savings move, a credit card payment from checking, a brokerage deposit. \
         Transfers are not income and not spending.\n\
         \n\
         Be conservative. Only report a transaction when it is unambiguous:\n\
         - it pairs with another listed transaction of the opposite sign and the same absolute amount \
         on a different account within a few days, or\n\
         - its description explicitly says it is a transfer or payment to one of these accounts.\n\
         Leave out anything you are unsure about. Do not report ordinary purchases, income or refunds.\n\
         \n\
         Accounts:\n{accounts}\n\
         \n\
         Transactions (amounts are signed; negative is money leaving the account):\n{transactions}\n\
         \n\
         Respond with a single JSON object and nothing else, no prose and no code fences:\n\
         {{\"suggestions\": [{{\"transaction_id\": \"<id>\", \"is_transfer\": true, \"reasoning\": \"<short reason>\"}}]}}\n\
         Return {{\"suggestions\": []}} if there are no clear transfers.",
        accounts = accounts_json(accounts),
        transactions = transactions_json(transactions, accounts),
    )
}

pub fn category_prompt(
    transactions: &[Transaction],
    categories: &[Category],
    accounts: &[Account],
    examples: &[CategorizedExample],
) -> String {
    let regular: Vec<&str> = categories
        .iter()
        .filter(|c| !c.is_internal)
        .map(|c| c.name.as_str())
        .collect();
    let internal: Vec<&str> = categories
        .iter()
        .filter(|c| c.is_internal)
        .map(|c| c.name.as_str())
        .collect();

    let mut prompt = format!(
        "You categorize personal financial transactions.\n\
         \n\
         Pick exactly one category for each transaction, using the category name verbatim from these lists.\n\
         \n\
         Regular categories:\n{regular}\n\
         \n\
         Internal categories (only for adjustments and money moved between the person's own accounts):\n{internal}\n\
         \n\
         Accounts:\n{accounts}\n",
        regular = bullet_list(&regular),
        internal = bullet_list(&internal),
        accounts = accounts_json(accounts),
    );

    if !examples.is_empty() {
        let rows: Vec<PromptExample> = examples
            .iter()
            .map(|e| PromptExample {
                description: &e.description,
                amount: decimal(e.amount),
                category: &e.category,
            })
            .collect();
        prompt.push_str(&format!(
            "\nPreviously categorized transactions, for reference:\n{}\n",
            serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
        ));
    }

    prompt.push_str(&format!(
        "\nTransactions to categorize:\n{transactions}\n\
         \n\
         Respond with a single JSON object and nothing else, no prose and no code fences:\n\
         {{\"suggestions\": [{{\"transaction_id\": \"<id>\", \"category\": \"<category name>\", \
         \"confidence\": 0.9, \"reasoning\": \"<short reason>\"}}]}}\n\
         confidence is your certainty between 0 and 1. Skip a transaction rather than invent a category.",
        transactions = transactions_json(transactions, accounts),
    ));
    prompt
}
