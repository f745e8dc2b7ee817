use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    constants::{SHOPPING_LIST_CONTENT_TYPE, SHOPPING_LIST_SUFFIX},
    schema::CartIngredientRow,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone)]
pub struct ShoppingList {
    pub owner: String,
    pub generated_at: NaiveDateTime,
    pub lines: Vec<ShoppingListLine>,
}

impl ShoppingList {
    /// Sums the amounts of every `(name, measurement_unit)` pair. Lines come out
    /// ordered by name, then unit.
    pub fn from_rows(owner: &str, generated_at: NaiveDateTime, rows: Vec<CartIngredientRow>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        rows.into_iter().for_each(|row| {
            *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
        });

        let lines = totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingListLine {
                name,
                measurement_unit,
                amount,
            })
            .collect();

        Self {
            owner: owner.to_string(),
            generated_at,
            lines,
        }
    }

    pub fn render(&self, title: &str) -> String {
        let mut s = format!(
            "Shopping list for: {}\n\nDate: {}\n\n",
            self.owner,
            self.generated_at.format("%Y-%m-%d %H:%M")
        );

        s += &self
            .lines
            .iter()
            .map(|line| {
                format!(
                    "- {} ({}) - {}",
                    line.name, line.measurement_unit, line.amount
                )
            })
            .collect::<Vec<String>>()
            .join("\n");

        s += &format!("\n\n{title} ({})\n", self.generated_at.format("%Y"));
        s
    }
}

/// A rendered shopping list, ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ShoppingListFile {
    pub fn new(username: &str, body: String) -> Self {
        let username: String = username
            .chars()
            .map(|c| match c {
                '"' | '\\' | '/' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        Self {
            filename: format!("{username}{SHOPPING_LIST_SUFFIX}"),
            content_type: SHOPPING_LIST_CONTENT_TYPE,
            body,
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}
