use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub nickname: Option<String>,
    pub account_type: String,
}

impl Account {
    /// Nickname when the user set one, otherwise the institution's name.
    pub fn display_name(&self) -> &str {
        match self.nickname.as_deref() {
            Some(nick) if !nick.trim().is_empty() => nick,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Internal categories (transfers, adjustments) stay out of spend totals.
    pub is_internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub posted: String,
    /// Signed amount in minor currency units (cents).
    pub amount: i64,
    pub description: String,
    pub is_pending: bool,
    pub is_transfer: bool,
    pub category_id: Option<i64>,
}

/// A previously categorized transaction, shown to the model as guidance.
#[derive(Debug, Clone, Serialize)]
pub struct CategorizedExample {
    pub description: String,
    pub amount: i64,
    pub category: String,
}

/// Narrows `list_transactions`; every field is optional.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account_id: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSuggestion {
    pub transaction_id: String,
    pub is_transfer: bool,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub transaction_id: String,
    pub category: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Response shape expected from the model for transfer identification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferAnalysisResult {
    pub suggestions: Vec<TransferSuggestion>,
}

/// Response shape expected from the model for categorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryAnalysisResult {
    pub suggestions: Vec<CategorySuggestion>,
}
