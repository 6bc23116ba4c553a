use std::cmp::Ordering;

use mongodb::bson::{Bson, Document};
use regex::{Regex, RegexBuilder};

use crate::error::{StoreError, StoreResult};

/// Builds a pattern that matches any value containing the characters of `query`
/// in order, e.g. `piz` becomes `.*p.*i.*z.*`.
pub fn match_all_regex(query: &str) -> String {
    let mut pattern = String::from(".*");
    for ch in query.chars() {
        pattern.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4])));
        pattern.push_str(".*");
    }
    pattern
}

/// Evaluates a MongoDB-style filter against a document.
///
/// Supports field equality (including array membership), `$and`, `$or`, and the
/// `$in`, `$nin`, `$all`, `$ne`, `$exists`, `$regex`, `$gt`, `$gte`, `$lt`,
/// `$lte` operators on top-level fields. `$expr` accepts the comparison
/// operators with two operands, where `"$field"` reads a field of the document.
pub fn matches(document: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => all_clauses(document, condition, key)?,
            "$or" => any_clause(document, condition, key)?,
            "$expr" => expression_holds(document, condition)?,
            other if other.starts_with('$') => {
                return Err(StoreError::UnsupportedOperator(other.to_owned()))
            }
            field => field_matches(document.get(field), condition)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(condition: &'a Bson, operator: &str) -> StoreResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(StoreError::InvalidUpdate(format!("{operator} expects an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            _ => Err(StoreError::InvalidUpdate(format!(
                "{operator} expects an array of documents"
            ))),
        })
        .collect()
}

fn all_clauses(document: &Document, condition: &Bson, operator: &str) -> StoreResult<bool> {
    for clause in clauses(condition, operator)? {
        if !matches(document, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_clause(document: &Document, condition: &Bson, operator: &str) -> StoreResult<bool> {
    for clause in clauses(condition, operator)? {
        if matches(document, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn expression_holds(document: &Document, condition: &Bson) -> StoreResult<bool> {
    let Bson::Document(expression) = condition else {
        return Err(StoreError::InvalidUpdate("$expr expects a document".to_owned()));
    };
    for (operator, argument) in expression {
        let operands = match argument {
            Bson::Array(operands) if operands.len() == 2 => operands,
            _ => {
                return Err(StoreError::InvalidUpdate(format!(
                    "{operator} expects two operands"
                )))
            }
        };
        let accept: fn(Ordering) -> bool = match operator.as_str() {
            "$eq" => |ord| ord == Ordering::Equal,
            "$ne" => |ord| ord != Ordering::Equal,
            "$gt" => |ord| ord == Ordering::Greater,
            "$gte" => |ord| ord != Ordering::Less,
            "$lt" => |ord| ord == Ordering::Less,
            "$lte" => |ord| ord != Ordering::Greater,
            other => return Err(StoreError::UnsupportedOperator(other.to_owned())),
        };
        let left = operand(document, &operands[0]);
        let right = operand(document, &operands[1]);
        let satisfied = match (left, right) {
            (Some(left), Some(right)) => compare(left, right).map_or(false, accept),
            _ => false,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `"$quantity"` names a field; anything else is a literal.
fn operand<'a>(document: &'a Document, value: &'a Bson) -> Option<&'a Bson> {
    match value {
        Bson::String(path) if path.starts_with('$') => document.get(&path[1..]),
        literal => Some(literal),
    }
}

fn is_operator_document(condition: &Document) -> bool {
    !condition.is_empty() && condition.keys().all(|key| key.starts_with('$'))
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    match condition {
        Bson::Document(operators) if is_operator_document(operators) => {
            operators_match(value, operators)
        }
        Bson::RegularExpression(regex) => {
            let compiled = compile(&regex.pattern, &regex.options)?;
            Ok(value.map_or(false, |value| regex_matches(&compiled, value)))
        }
        expected => Ok(value.map_or(false, |value| equals_or_contains(value, expected))),
    }
}

fn operators_match(value: Option<&Bson>, operators: &Document) -> StoreResult<bool> {
    for (operator, argument) in operators {
        let satisfied = match operator.as_str() {
            "$in" => {
                let candidates = array_argument(operator, argument)?;
                value.map_or(false, |value| {
                    candidates
                        .iter()
                        .any(|candidate| equals_or_contains(value, candidate))
                })
            }
            "$nin" => {
                let candidates = array_argument(operator, argument)?;
                value.map_or(true, |value| {
                    !candidates
                        .iter()
                        .any(|candidate| equals_or_contains(value, candidate))
                })
            }
            "$all" => {
                let required = array_argument(operator, argument)?;
                value.map_or(false, |value| {
                    required
                        .iter()
                        .all(|candidate| equals_or_contains(value, candidate))
                })
            }
            "$ne" => value.map_or(true, |value| !equals_or_contains(value, argument)),
            "$exists" => {
                let wanted = matches!(argument, Bson::Boolean(true));
                value.is_some() == wanted
            }
            "$regex" => {
                let pattern = match argument {
                    Bson::String(pattern) => pattern.clone(),
                    Bson::RegularExpression(regex) => regex.pattern.clone(),
                    _ => return Err(StoreError::InvalidPattern(argument.to_string())),
                };
                let options = operators.get_str("$options").unwrap_or_default();
                let compiled = compile(&pattern, options)?;
                value.map_or(false, |value| regex_matches(&compiled, value))
            }
            "$options" => true,
            "$gt" => compares(value, argument, |ord| ord == Ordering::Greater),
            "$gte" => compares(value, argument, |ord| ord != Ordering::Less),
            "$lt" => compares(value, argument, |ord| ord == Ordering::Less),
            "$lte" => compares(value, argument, |ord| ord != Ordering::Greater),
            other => return Err(StoreError::UnsupportedOperator(other.to_owned())),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn array_argument<'a>(operator: &str, argument: &'a Bson) -> StoreResult<&'a Vec<Bson>> {
    match argument {
        Bson::Array(items) => Ok(items),
        _ => Err(StoreError::InvalidUpdate(format!("{operator} expects an array"))),
    }
}

fn compile(pattern: &str, options: &str) -> StoreResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .build()
        .map_err(|_| StoreError::InvalidPattern(pattern.to_owned()))
}

fn regex_matches(regex: &Regex, value: &Bson) -> bool {
    match value {
        Bson::String(text) => regex.is_match(text),
        Bson::Array(items) => items.iter().any(|item| regex_matches(regex, item)),
        _ => false,
    }
}

fn compares(value: Option<&Bson>, argument: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|value| compare(value, argument))
        .map_or(false, accept)
}

/// Equality with MongoDB's array semantics: a scalar condition matches an array
/// field that contains it.
pub(crate) fn equals_or_contains(value: &Bson, expected: &Bson) -> bool {
    if values_equal(value, expected) {
        return true;
    }
    match value {
        Bson::Array(items) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        _ => false,
    }
}

pub(crate) fn values_equal(left: &Bson, right: &Bson) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn compare(left: &Bson, right: &Bson) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.cmp(b)),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, DateTime};

    #[test]
    fn match_all_regex_interleaves_wildcards() {
        assert_eq!(match_all_regex("piz"), ".*p.*i.*z.*");
        assert_eq!(match_all_regex(""), ".*");
        assert_eq!(match_all_regex("a+"), ".*a.*\\+.*");
    }

    #[test]
    fn equality_matches_array_members() {
        let document = doc! { "roles": ["issue", "purchase"], "is_active": true };
        assert!(matches(&document, &doc! { "roles": "issue" }).unwrap());
        assert!(!matches(&document, &doc! { "roles": "view issue" }).unwrap());
        assert!(matches(&document, &doc! { "is_active": true }).unwrap());
    }

    #[test]
    fn numeric_equality_ignores_width() {
        let document = doc! { "price": 12_i32 };
        assert!(matches(&document, &doc! { "price": 12.0 }).unwrap());
        assert!(matches(&document, &doc! { "price": 12_i64 }).unwrap());
    }

    #[test]
    fn regex_operator_honours_case_option() {
        let document = doc! { "name": "Margherita Pizza" };
        let pattern = match_all_regex("pizza");
        assert!(matches(&document, &doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } }).unwrap());
        assert!(!matches(&document, &doc! { "name": { "$regex": pattern.as_str() } }).unwrap());
    }

    #[test]
    fn or_all_and_range_operators() {
        let now = DateTime::now();
        let document = doc! {
            "first_name": "abebe",
            "last_name": "kebede",
            "roles": ["issue", "purchase", "view issue"],
            "issued_at": now,
        };
        let or_filter = doc! { "$or": [ { "first_name": "nobody" }, { "last_name": "kebede" } ] };
        assert!(matches(&document, &or_filter).unwrap());

        assert!(matches(&document, &doc! { "roles": { "$all": ["issue", "purchase"] } }).unwrap());
        assert!(!matches(&document, &doc! { "roles": { "$all": ["issue", "manage kitchen"] } }).unwrap());

        let window = doc! { "issued_at": { "$gte": now, "$lte": now } };
        assert!(matches(&document, &window).unwrap());
        let later = DateTime::from_millis(now.timestamp_millis() + 1_000);
        assert!(!matches(&document, &doc! { "issued_at": { "$gt": later } }).unwrap());
    }

    #[test]
    fn expr_compares_two_fields_of_the_document() {
        let low = doc! { "quantity": 4.0, "minimum_quantity": 10_i32 };
        let stocked = doc! { "quantity": 50.0, "minimum_quantity": 10_i32 };
        let running_low = doc! { "$expr": { "$gte": ["$minimum_quantity", "$quantity"] } };
        assert!(matches(&low, &running_low).unwrap());
        assert!(!matches(&stocked, &running_low).unwrap());

        let literal = doc! { "$expr": { "$lt": ["$quantity", 5] } };
        assert!(matches(&low, &literal).unwrap());
        assert!(!matches(&doc! {}, &literal).unwrap());

        let err = matches(&low, &doc! { "$expr": { "$add": ["$quantity", 1] } }).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedOperator(op) if op == "$add"));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let document = doc! { "name": "x" };
        let err = matches(&document, &doc! { "name": { "$near": 1 } }).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedOperator(op) if op == "$near"));
    }
}
