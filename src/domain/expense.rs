use super::ids::ExpenseId;
use super::money::{Amount, Money};
use crate::error::{CrediarioError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    #[serde(alias = "gasolina")]
    Fuel,
    #[serde(alias = "alimentacao")]
    Food,
    #[serde(alias = "transporte")]
    Transport,
    #[serde(alias = "manutencao")]
    Maintenance,
    #[serde(alias = "escritorio")]
    Office,
    Marketing,
    #[serde(alias = "outros")]
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Fuel,
        ExpenseCategory::Food,
        ExpenseCategory::Transport,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Office,
        ExpenseCategory::Marketing,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "fuel",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Maintenance => "maintenance",
            ExpenseCategory::Office => "office",
            ExpenseCategory::Marketing => "marketing",
            ExpenseCategory::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = CrediarioError;

    fn from_str(s: &str) -> Result<Self> {
        let category = match s.trim().to_lowercase().as_str() {
            "fuel" | "gasolina" => ExpenseCategory::Fuel,
            "food" | "alimentacao" => ExpenseCategory::Food,
            "transport" | "transporte" => ExpenseCategory::Transport,
            "maintenance" | "manutencao" => ExpenseCategory::Maintenance,
            "office" | "escritorio" => ExpenseCategory::Office,
            "marketing" => ExpenseCategory::Marketing,
            "other" | "outros" => ExpenseCategory::Other,
            other => {
                return Err(CrediarioError::validation(format!(
                    "Unknown expense category '{other}'"
                )));
            }
        };
        Ok(category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Money,
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by every modification.
    #[serde(default)]
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewExpense {
    pub description: String,
    pub amount: Decimal,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<NaiveDate>,
}

/// Fields to change on an existing expense; `None` leaves a field as is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<NaiveDate>,
}

impl NewExpense {
    pub fn into_expense(self, now: DateTime<Utc>) -> Result<Expense> {
        if self.description.trim().is_empty() {
            return Err(CrediarioError::validation("Description is required"));
        }
        let amount = Amount::new(self.amount)?;
        let category = self
            .category
            .ok_or_else(|| CrediarioError::validation("Category is required"))?;
        let expense_date = self
            .expense_date
            .ok_or_else(|| CrediarioError::validation("Expense date is required"))?;
        Ok(Expense {
            id: ExpenseId::new(),
            description: self.description.trim().to_string(),
            amount: amount.into(),
            category,
            expense_date,
            created_at: now,
            updated_at: now,
            revision: 0,
        })
    }
}

impl Expense {
    /// Applies a patch, validating before touching any field.
    pub fn apply(&mut self, patch: ExpensePatch, now: DateTime<Utc>) -> Result<()> {
        if let Some(description) = &patch.description
            && description.trim().is_empty()
        {
            return Err(CrediarioError::validation("Description is required"));
        }
        let amount = patch.amount.map(Amount::new).transpose()?;

        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(amount) = amount {
            self.amount = amount.into();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(expense_date) = patch.expense_date {
            self.expense_date = expense_date;
        }
        self.updated_at = now;
        self.revision += 1;
        Ok(())
    }
}

/// Sum per category, skipping categories with nothing spent.
pub fn totals_by_category(expenses: &[Expense]) -> Vec<(ExpenseCategory, Money)> {
    let mut totals: BTreeMap<ExpenseCategory, Money> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category).or_default() += expense.amount;
    }
    totals.into_iter().filter(|(_, total)| !total.is_zero()).collect()
}
