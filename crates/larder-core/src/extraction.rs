//! Defensive parsing of language-model responses.
//!
//! Model output is untrusted text that is *usually* JSON. The parsers here
//! strip Markdown code fences, accept an array or a single object, apply
//! defaults to missing fields, and drop elements that cannot be salvaged
//! instead of failing the whole batch. Only a response that contains no
//! JSON at all is an error ([`UpstreamError::Malformed`]).
//!
//! Defaults for extracted items: `quantity = 1`, `unit = "pieces"`,
//! `category = "other"`.

use serde_json::Value;

use crate::models::{Category, ExtractedItem, Ingredient, NewRecipe, RecipeSource, Substitution};
use crate::providers::{ExtractionKind, UpstreamError};

/// Product keywords that mark a receipt line as not food.
const NON_FOOD_KEYWORDS: &[&str] = &[
    // household and cleaning
    "toilet", "tissue", "tissues", "paper towel", "paper towels", "wipe", "wipes", "bleach",
    "cleaner", "detergent", "soap", "shampoo", "conditioner", "sponge", "dish brush", "mop",
    "broom", "trash bag", "garbage bag", "trash", "garbage", "plastic bag", "bin bag", "refuse",
    // personal care
    "lotion", "moisturizer", "sunscreen", "razor", "razors", "shave", "lipstick",
    "nail polish", "makeup", "perfume", "cologne", "deodorant", "antiperspirant", "sanitary",
    "tampon", "toothpaste", "toothbrush",
    // pets
    "pet food", "dog food", "cat food", "pet shampoo", "pet supplies",
    // household items
    "light bulb", "battery", "batteries", "candle", "matches", "lighter", "tape", "glue",
    "scissors", "pen", "pencil", "notebook", "ink", "aluminum foil", "plastic wrap", "saran",
    // other non-consumables
    "magazine", "newspaper", "book", "greeting card", "stamp", "postage", "phone card",
    "lottery", "ticket", "fuel", "clothing", "shirt", "pants", "shoes", "sock", "socks",
    "underwear", "towel", "towels", "sheet", "pillow", "blanket", "mattress", "furniture",
];

/// Category labels a model may assign to non-food receipt lines.
const NON_FOOD_CATEGORIES: &[&str] = &[
    "non-food",
    "nonfood",
    "household",
    "personal care",
    "pet",
    "pets",
    "other non-food",
];

/// Items salvaged from a model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedItems {
    pub items: Vec<ExtractedItem>,
    /// Elements dropped because they were malformed or labelled non-food.
    pub dropped: usize,
}

/// Return the payload inside the first Markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some((_, rest)) = text.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some((_, rest)) = text.split_once("```") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    text
}

/// Parse the JSON payload of a model response.
///
/// Falls back to the outermost `[...]` or `{...}` span when the model
/// wrapped the JSON in prose.
pub fn parse_json_payload(text: &str) -> Result<Value, UpstreamError> {
    let body = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Ok(value);
    }
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (body.find(open), body.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&body[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }
    Err(UpstreamError::Malformed(
        "AI response did not contain valid JSON".to_string(),
    ))
}

/// Normalize a payload into a list of element values. Objects that wrap
/// the list under `key` are unwrapped; any other object is one element.
fn elements(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert(key.to_string(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        _ => Vec::new(),
    }
}

/// Parse a quantity from a JSON number or a string such as `"2"`, `"0.5"`,
/// `"1/2"` or `"1 1/2"`. Non-positive and non-finite values are rejected.
pub fn parse_quantity(value: &Value) -> Option<f64> {
    let q = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_quantity_text(s)?,
        _ => return None,
    };
    (q.is_finite() && q > 0.0).then_some(q)
}

fn parse_quantity_text(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(q) = text.parse::<f64>() {
        return Some(q);
    }
    let mut total = 0.0;
    for part in text.split_whitespace() {
        total += match part.split_once('/') {
            Some((num, den)) => {
                let den: f64 = den.parse().ok()?;
                if den == 0.0 {
                    return None;
                }
                num.parse::<f64>().ok()? / den
            }
            None => part.parse::<f64>().ok()?,
        };
    }
    (total > 0.0).then_some(total)
}

fn text_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn extracted_item(value: &Value, kind: ExtractionKind) -> Option<ExtractedItem> {
    let obj = value.as_object()?;
    let name = text_field(obj, "name")?.to_lowercase();
    let category_label = text_field(obj, "category").unwrap_or("other").to_lowercase();
    if kind == ExtractionKind::Receipt && NON_FOOD_CATEGORIES.contains(&category_label.as_str()) {
        return None;
    }
    Some(ExtractedItem {
        name,
        quantity: obj.get("quantity").and_then(parse_quantity).unwrap_or(1.0),
        unit: text_field(obj, "unit")
            .map(str::to_lowercase)
            .unwrap_or_else(|| "pieces".to_string()),
        category: Category::from_label(&category_label),
    })
}

/// Parse food items from an extraction response.
///
/// Elements without a usable `name` are dropped. For receipts, elements
/// whose category label is a non-food label are dropped as well.
pub fn parse_extracted_items(
    text: &str,
    kind: ExtractionKind,
) -> Result<ParsedItems, UpstreamError> {
    let values = elements(parse_json_payload(text)?, "items");
    let total = values.len();
    let items: Vec<ExtractedItem> = values
        .iter()
        .filter_map(|v| extracted_item(v, kind))
        .collect();
    Ok(ParsedItems {
        dropped: total - items.len(),
        items,
    })
}

fn ingredient(value: &Value) -> Option<Ingredient> {
    let obj = value.as_object()?;
    Some(Ingredient {
        name: text_field(obj, "name")?.to_lowercase(),
        quantity: obj.get("quantity").and_then(parse_quantity).unwrap_or(1.0),
        unit: text_field(obj, "unit")
            .map(str::to_lowercase)
            .unwrap_or_else(|| "piece".to_string()),
    })
}

/// Parse a recipe draft from a recipe-extraction response.
///
/// Returns `Ok(None)` when the response is JSON but not a usable recipe:
/// no name, or no ingredient with a name.
pub fn parse_recipe_draft(
    text: &str,
    source_url: Option<&str>,
) -> Result<Option<NewRecipe>, UpstreamError> {
    let value = parse_json_payload(text)?;
    let value = match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    let Some(obj) = value.as_object() else {
        return Ok(None);
    };
    let Some(name) = text_field(obj, "name") else {
        return Ok(None);
    };
    let ingredients: Vec<Ingredient> = obj
        .get("ingredients")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(ingredient).collect())
        .unwrap_or_default();
    if ingredients.is_empty() {
        return Ok(None);
    }
    let tags = obj
        .get("tags")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(NewRecipe {
        name: name.to_string(),
        ingredients,
        instructions: text_field(obj, "instructions").unwrap_or_default().to_string(),
        tags,
        source: if source_url.is_some() {
            RecipeSource::Url
        } else {
            RecipeSource::Manual
        },
        source_url: source_url.map(str::to_string),
        notes: String::new(),
    }))
}

/// Parse ingredient substitution suggestions. Elements missing either the
/// `missing` or the `substitute` field are dropped.
pub fn parse_substitutions(text: &str) -> Result<Vec<Substitution>, UpstreamError> {
    let values = elements(parse_json_payload(text)?, "substitutions");
    Ok(values
        .iter()
        .filter_map(|v| {
            let obj = v.as_object()?;
            Some(Substitution {
                missing: text_field(obj, "missing")?.to_string(),
                substitute: text_field(obj, "substitute")?.to_string(),
                note: text_field(obj, "note").unwrap_or_default().to_string(),
            })
        })
        .collect())
}

/// Whether an item name looks like food. Non-food keywords are matched on
/// word boundaries so `"cardamom"` is not mistaken for `"card"`.
pub fn is_food_item(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    !NON_FOOD_KEYWORDS
        .iter()
        .any(|kw| crate::matching::contains_whole(&name, kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let text = "Here you go:\n```json\n[{\"name\": \"milk\"}]\n```\nEnjoy";
        assert_eq!(strip_code_fences(text), "[{\"name\": \"milk\"}]");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn applies_defaults_and_normalizes() {
        let parsed = parse_extracted_items(
            r#"[{"name": " Greek Yogurt ", "category": "Dairy"}, {"name": "Apples", "quantity": "6", "unit": "PIECES"}]"#,
            ExtractionKind::Transcription,
        )
        .unwrap();
        assert_eq!(parsed.dropped, 0);
        assert_eq!(
            parsed.items[0],
            ExtractedItem {
                name: "greek yogurt".into(),
                quantity: 1.0,
                unit: "pieces".into(),
                category: Category::Dairy,
            }
        );
        assert_eq!(parsed.items[1].quantity, 6.0);
        assert_eq!(parsed.items[1].unit, "pieces");
        assert_eq!(parsed.items[1].category, Category::Other);
    }

    #[test]
    fn drops_bad_elements_without_failing_batch() {
        let parsed = parse_extracted_items(
            r#"[{"name": "bread"}, {"quantity": 2}, "oops", {"name": "  "}, {"name": "eggs", "quantity": "a dozen"}]"#,
            ExtractionKind::Freeform,
        )
        .unwrap();
        let names: Vec<_> = parsed.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["bread", "eggs"]);
        assert_eq!(parsed.items[1].quantity, 1.0);
        assert_eq!(parsed.dropped, 3);
    }

    #[test]
    fn accepts_single_object_and_wrapped_list() {
        let single = parse_extracted_items(r#"{"name": "tea"}"#, ExtractionKind::Freeform).unwrap();
        assert_eq!(single.items.len(), 1);

        let wrapped = parse_extracted_items(
            r#"{"items": [{"name": "tea"}, {"name": "coffee"}]}"#,
            ExtractionKind::Freeform,
        )
        .unwrap();
        assert_eq!(wrapped.items.len(), 2);
    }

    #[test]
    fn recovers_json_embedded_in_prose() {
        let parsed = parse_extracted_items(
            "Sure! The items are [{\"name\": \"rice\"}] as requested.",
            ExtractionKind::Transcription,
        )
        .unwrap();
        assert_eq!(parsed.items[0].name, "rice");
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_extracted_items("I could not find any food.", ExtractionKind::Receipt)
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn receipt_drops_non_food_categories_only_for_receipts() {
        let text = r#"[{"name": "dish soap", "category": "household"}, {"name": "oats", "category": "pantry"}]"#;
        let receipt = parse_extracted_items(text, ExtractionKind::Receipt).unwrap();
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].name, "oats");

        let freeform = parse_extracted_items(text, ExtractionKind::Freeform).unwrap();
        assert_eq!(freeform.items.len(), 2);
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity(&Value::from(2)), Some(2.0));
        assert_eq!(parse_quantity(&Value::from("1/2")), Some(0.5));
        assert_eq!(parse_quantity(&Value::from("1 1/4")), Some(1.25));
        assert_eq!(parse_quantity(&Value::from("x")), None);
        assert_eq!(parse_quantity(&Value::from(0)), None);
        assert_eq!(parse_quantity(&Value::from("1/0")), None);
        assert_eq!(parse_quantity(&Value::Null), None);
    }

    #[test]
    fn recipe_draft_requires_name_and_ingredients() {
        let ok = parse_recipe_draft(
            r#"{"name": "Chickpea Masala", "ingredients": [{"name": "Chickpeas", "quantity": "1 1/2", "unit": "cups"}, {"unit": "tsp"}], "instructions": null}"#,
            Some("https://example.com/masala"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(ok.ingredients.len(), 1);
        assert_eq!(ok.ingredients[0].name, "chickpeas");
        assert_eq!(ok.ingredients[0].quantity, 1.5);
        assert_eq!(ok.instructions, "");
        assert_eq!(ok.source, RecipeSource::Url);
        assert_eq!(ok.source_url.as_deref(), Some("https://example.com/masala"));

        assert!(parse_recipe_draft(r#"{"name": "Empty", "ingredients": []}"#, None)
            .unwrap()
            .is_none());
        assert!(parse_recipe_draft(r#"{"ingredients": [{"name": "salt"}]}"#, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn substitutions_skip_incomplete_entries() {
        let subs = parse_substitutions(
            r#"{"substitutions": [{"missing": "buttermilk", "substitute": "milk + lemon juice", "note": "let it sit"}, {"missing": "saffron"}]}"#,
        )
        .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].substitute, "milk + lemon juice");
    }

    #[test]
    fn food_filter_uses_whole_words() {
        assert!(!is_food_item("Toilet Paper 12pk"));
        assert!(!is_food_item("AA batteries"));
        assert!(is_food_item("ground cardamom"));
        assert!(is_food_item("penne pasta"));
        assert!(is_food_item("bananas"));
    }
}
