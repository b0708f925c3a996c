//! Aggregates the ingredients of every recipe in a user's basket into one
//! plain-text shopping list.

use std::collections::BTreeMap;
use std::fmt::Write;

use sqlx::FromRow;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
pub const EMPTY_LIST_LINE: &str = "Shopping list is empty.";

/// One (ingredient, amount) occurrence pulled from a basket recipe.
#[derive(Debug, Clone, FromRow)]
pub struct ShoppingRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Renders the list, one line per distinct ingredient.
///
/// Ingredient identity is (name, measurement_unit), not the ingredient row
/// id: two rows named "salt" in grams are one line with a summed amount.
/// Lines are ordered lexicographically by (name, unit) — that ordering is
/// the contract, regardless of basket insertion order. An empty basket
/// yields the single sentinel line instead of an empty payload.
pub fn render(rows: &[ShoppingRow]) -> String {
    if rows.is_empty() {
        return format!("{EMPTY_LIST_LINE}\n");
    }

    let mut totals: BTreeMap<(&str, &str), i64> = BTreeMap::new();
    for row in rows {
        *totals
            .entry((row.name.as_str(), row.measurement_unit.as_str()))
            .or_insert(0) += i64::from(row.amount);
    }

    let mut out = String::new();
    for ((name, unit), total) in totals {
        // write! into a String cannot fail
        let _ = writeln!(out, "{name} ({unit}): {total}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> ShoppingRow {
        ShoppingRow {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn sums_amounts_per_ingredient_identity() {
        // Two recipes: [(A, g, 100), (B, g, 50)] and [(A, g, 30)]
        let rows = vec![row("A", "g", 100), row("B", "g", 50), row("A", "g", 30)];
        let text = render(&rows);
        assert_eq!(text, "A (g): 130\nB (g): 50\n");
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let rows = vec![row("milk", "ml", 200), row("milk", "l", 1)];
        let text = render(&rows);
        assert_eq!(text, "milk (l): 1\nmilk (ml): 200\n");
    }

    #[test]
    fn ordering_is_lexicographic_by_name() {
        let rows = vec![row("zucchini", "pc", 2), row("apple", "pc", 3)];
        let text = render(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["apple (pc): 3", "zucchini (pc): 2"]);
    }

    #[test]
    fn empty_basket_yields_sentinel_line() {
        let text = render(&[]);
        assert_eq!(text, format!("{EMPTY_LIST_LINE}\n"));
        assert!(!text.is_empty());
    }

    #[test]
    fn duplicate_rows_from_distinct_ingredient_ids_merge() {
        // The catalog can hold two distinct rows both named (salt, g);
        // grouping must still be by (name, unit).
        let rows = vec![row("salt", "g", 5), row("salt", "g", 7)];
        assert_eq!(render(&rows), "salt (g): 12\n");
    }
}
