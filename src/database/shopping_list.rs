use indexmap::IndexMap;

use crate::schema::{ShoppingListItem, Uuid};

struct ShoppingListEntry {
    name: String,
    measurement_unit: String,
    total: i64,
}

/// Groups the ingredient lines of a shopping cart by ingredient and sums their amounts.
///
/// Lines come out in the order each ingredient was first seen, one per ingredient, formatted
/// as `"<Name> (<unit>) -- <total>\n"` with the name title-cased. An empty cart yields nothing.
pub fn aggregate_shopping_list<I>(items: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = ShoppingListItem>,
{
    let mut entries: IndexMap<Uuid, ShoppingListEntry> = IndexMap::new();

    for item in items {
        let amount = i64::from(item.amount);
        entries
            .entry(item.ingredient_id)
            .and_modify(|entry| entry.total += amount)
            .or_insert_with(|| ShoppingListEntry {
                total: amount,
                name: item.name,
                measurement_unit: item.measurement_unit,
            });
    }

    entries.into_values().map(|entry| {
        format!(
            "{} ({}) -- {}\n",
            title_case(&entry.name),
            entry.measurement_unit,
            entry.total
        )
    })
}

/// Upper-cases the first cased letter of every run of cased letters and lower-cases the rest.
/// Letters without case, such as CJK ideographs, end a run like any other separator.
pub fn title_case(value: &str) -> String {
    let mut previous_is_cased = false;

    value
        .chars()
        .flat_map(|c| {
            let is_cased = c.is_lowercase() || c.is_uppercase();
            let mapped: Vec<char> = match (is_cased, previous_is_cased) {
                (true, false) => c.to_uppercase().collect(),
                (true, true) => c.to_lowercase().collect(),
                (false, _) => vec![c],
            };
            previous_is_cased = is_cased;
            mapped
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(ingredient_id: Uuid, name: &str, unit: &str, amount: i32) -> ShoppingListItem {
        ShoppingListItem {
            ingredient_id,
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    #[test]
    fn sums_amounts_per_ingredient_in_first_seen_order() {
        let lines: Vec<String> = aggregate_shopping_list(vec![
            item(1, "salt", "g", 10),
            item(2, "pepper", "g", 5),
            item(1, "salt", "g", 3),
        ])
        .collect();

        assert_eq!(lines, vec!["Salt (g) -- 13\n", "Pepper (g) -- 5\n"]);
    }

    #[test]
    fn empty_cart_yields_no_lines() {
        assert_eq!(aggregate_shopping_list(Vec::new()).count(), 0);
    }

    #[test]
    fn groups_by_identity_not_by_name() {
        let lines: Vec<String> = aggregate_shopping_list(vec![
            item(1, "milk", "ml", 200),
            item(2, "milk", "g", 50),
            item(1, "milk", "ml", 100),
        ])
        .collect();

        assert_eq!(lines, vec!["Milk (ml) -- 300\n", "Milk (g) -- 50\n"]);
    }

    #[test]
    fn totals_do_not_depend_on_input_order() {
        let forward = vec![
            item(1, "flour", "g", 500),
            item(2, "eggs", "pcs", 2),
            item(1, "flour", "g", 250),
            item(3, "sugar", "g", 100),
            item(2, "eggs", "pcs", 3),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let mut a: Vec<String> = aggregate_shopping_list(forward).collect();
        let mut b: Vec<String> = aggregate_shopping_list(backward).collect();
        a.sort();
        b.sort();

        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(a.contains(&"Flour (g) -- 750\n".to_owned()));
        assert!(a.contains(&"Eggs (pcs) -- 5\n".to_owned()));
    }

    #[test]
    fn large_totals_do_not_overflow() {
        let lines: Vec<String> = aggregate_shopping_list(vec![
            item(1, "water", "ml", i32::MAX),
            item(1, "water", "ml", i32::MAX),
        ])
        .collect();

        assert_eq!(lines, vec![format!("Water (ml) -- {}\n", 2 * i64::from(i32::MAX))]);
    }

    #[test]
    fn title_case_follows_word_boundaries() {
        assert_eq!(title_case("green onion"), "Green Onion");
        assert_eq!(title_case("SOY sauce"), "Soy Sauce");
        assert_eq!(title_case("o'neil-style 7up"), "O'Neil-Style 7Up");
        assert_eq!(title_case("сметана"), "Сметана");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn uncased_letters_break_words() {
        assert_eq!(title_case("中a"), "中A");
        assert_eq!(title_case("豆腐 tofu"), "豆腐 Tofu");
        assert_eq!(title_case("ñandú"), "Ñandú");
    }
}
