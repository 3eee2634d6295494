//! Shopping list consolidation.
//!
//! Line items from every recipe in a cart are grouped by ingredient name and
//! unit, not by catalog id, so two catalog rows sharing both collapse into a
//! single line.

use std::collections::BTreeMap;

use serde::Serialize;

pub const EXPORT_FILE_NAME: &str = "shopping_cart.txt";
pub const EMPTY_PLACEHOLDER: &str = "Your shopping list is empty.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListRow {
    pub name: String,
    pub unit: String,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub rows: Vec<ShoppingListRow>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// One `name (unit) — total` line per row.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return EMPTY_PLACEHOLDER.to_string();
        }
        self.rows
            .iter()
            .map(|row| format!("{} ({}) — {}", row.name, row.unit, row.total))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Sum quantities per (name, unit); output is sorted by name, then unit.
pub fn consolidate<I>(items: I) -> ShoppingList
where
    I: IntoIterator<Item = (String, String, u32)>,
{
    let mut totals: BTreeMap<(String, String), u64> = BTreeMap::new();
    for (name, unit, quantity) in items {
        *totals.entry((name, unit)).or_default() += u64::from(quantity);
    }

    let rows = totals
        .into_iter()
        .map(|((name, unit), total)| ShoppingListRow { name, unit, total })
        .collect();

    ShoppingList { rows }
}
