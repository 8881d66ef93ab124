//! Condition evaluation against in-memory rows.

use accounts_core::Account;
use accounts_query::{Condition, Field, Operator, SortOrder, SortSpec, SqlValue};
use std::cmp::Ordering;

/// Read a field the way the SQL accessor exposes it.
pub fn field_value(account: &Account, field: Field) -> SqlValue {
    match field {
        Field::Id => SqlValue::Uuid(account.id),
        Field::Type => SqlValue::Text(account.account_type.as_str().to_string()),
        Field::Currency => SqlValue::Text(account.currency.as_str().to_string()),
        Field::Account => SqlValue::Text(account.account.as_str().to_string()),
        Field::CompanyId => SqlValue::Text(account.company_id.hyphenated().to_string()),
        Field::CompanyName => SqlValue::Text(account.company_name.clone()),
        Field::Archived => SqlValue::Boolean(account.archived),
        Field::Created => SqlValue::Timestamp(account.created),
        Field::Modified => SqlValue::Timestamp(account.modified),
    }
}

/// Whether `account` satisfies `condition`. Unknown counts as no match.
pub fn matches(condition: &Condition, account: &Account) -> bool {
    evaluate(condition, account) == Some(true)
}

/// Evaluate with SQL three-valued logic; `None` is unknown.
pub fn evaluate(condition: &Condition, account: &Account) -> Option<bool> {
    match condition {
        Condition::Simple { field, op, value } => {
            compare(*op, &field_value(account, *field), value)
        }
        Condition::In { field, values } => {
            let left = field_value(account, *field);
            let mut unknown = false;
            for candidate in values {
                match compare(Operator::Eq, &left, candidate) {
                    Some(true) => return Some(true),
                    Some(false) => {}
                    None => unknown = true,
                }
            }
            if unknown { None } else { Some(false) }
        }
        Condition::Or(children) => {
            let mut unknown = false;
            for child in children {
                match evaluate(child, account) {
                    Some(true) => return Some(true),
                    Some(false) => {}
                    None => unknown = true,
                }
            }
            if unknown { None } else { Some(false) }
        }
        Condition::And(children) => {
            let mut unknown = false;
            for child in children {
                match evaluate(child, account) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => unknown = true,
                }
            }
            if unknown { None } else { Some(true) }
        }
        Condition::Not(inner) => evaluate(inner, account).map(|b| !b),
        Condition::True => Some(true),
        Condition::False => Some(false),
    }
}

fn compare(op: Operator, left: &SqlValue, right: &SqlValue) -> Option<bool> {
    match op {
        Operator::IsNull => return Some(*left == SqlValue::Null),
        Operator::IsNotNull => return Some(*left != SqlValue::Null),
        Operator::Like | Operator::ILike => {
            return match (left, right) {
                (SqlValue::Text(text), SqlValue::Text(pattern)) => {
                    if op == Operator::ILike {
                        Some(like_match(&pattern.to_lowercase(), &text.to_lowercase()))
                    } else {
                        Some(like_match(pattern, text))
                    }
                }
                _ => None,
            };
        }
        _ => {}
    }

    let ordering = order_values(left, right)?;
    Some(match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        _ => return None,
    })
}

/// Ordering between two non-null values of the same type.
fn order_values(left: &SqlValue, right: &SqlValue) -> Option<Ordering> {
    match (left, right) {
        (SqlValue::Text(a), SqlValue::Text(b)) => Some(a.cmp(b)),
        (SqlValue::Uuid(a), SqlValue::Uuid(b)) => Some(a.cmp(b)),
        (SqlValue::Boolean(a), SqlValue::Boolean(b)) => Some(a.cmp(b)),
        (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Compare two rows by a list of sort specifications.
pub fn compare_rows(a: &Account, b: &Account, specs: &[SortSpec]) -> Ordering {
    for spec in specs {
        let left = field_value(a, spec.field);
        let right = field_value(b, spec.field);
        let ordering = match (left == SqlValue::Null, right == SqlValue::Null) {
            (true, true) => Ordering::Equal,
            (true, false) if spec.nulls_last => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, true) if spec.nulls_last => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                let ord = order_values(&left, &right).unwrap_or(Ordering::Equal);
                match spec.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[derive(Debug, PartialEq)]
enum Token {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::AnyRun,
            '_' => Token::AnyOne,
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        });
    }
    tokens
}

/// SQL `LIKE` matching: `%` is any run, `_` any one character, `\` escapes.
pub fn like_match(pattern: &str, text: &str) -> bool {
    let tokens = tokenize(pattern);
    let text: Vec<char> = text.chars().collect();

    // reachable[j]: the tokens seen so far can consume exactly text[..j]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in &tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::AnyRun => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            Token::AnyOne => {
                for j in 1..=text.len() {
                    next[j] = reachable[j - 1];
                }
            }
            Token::Literal(c) => {
                for j in 1..=text.len() {
                    next[j] = reachable[j - 1] && text[j - 1] == *c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}
