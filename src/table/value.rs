use std::cmp::Ordering;
use std::fmt;

/// Shown in place of null or absent values.
pub const PLACEHOLDER: &str = "—";

/// A single field value of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Nested or compound data. Never searched.
    Object,
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, or a number that is NaN. Both sort as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// String form used by the default search. Only text and numbers take part.
    pub fn searchable_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
            Value::Object => "[object]".to_string(),
            Value::Null => PLACEHOLDER.to_string(),
        }
    }

    /// Ascending order of two values.
    ///
    /// Missing values (nulls and NaN) sort first, numbers compare numerically
    /// and everything else falls back to a locale style comparison of the
    /// display strings. The order is total.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self.is_missing(), other.is_missing()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => match (self, other) {
                (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
                (a, b) => locale_cmp(&a.display(), &b.display()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

// Integral floats print without a trailing ".0", the way a JSON number would.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Case-insensitive comparison first; on ties lowercase sorts before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    primary.then_with(|| b.cmp(a))
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Identifier of a row, used by the selection set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
    Text(String),
    Number(i64),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Text(s) => f.write_str(s),
            RowId::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        RowId::Text(s.to_string())
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        RowId::Text(s)
    }
}

impl From<i64> for RowId {
    fn from(n: i64) -> Self {
        RowId::Number(n)
    }
}

impl From<usize> for RowId {
    fn from(n: usize) -> Self {
        RowId::Number(n as i64)
    }
}

/// One record of named fields, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Owned value of a field, `Value::Null` when absent.
    pub fn value(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_display_like_json() {
        assert_eq!(Value::from(42).display(), "42");
        assert_eq!(Value::from(2.5).display(), "2.5");
        assert_eq!(Value::Null.display(), PLACEHOLDER);
    }

    #[test]
    fn only_text_and_numbers_are_searchable() {
        assert_eq!(Value::from("Rick").searchable_text().as_deref(), Some("Rick"));
        assert_eq!(Value::from(7).searchable_text().as_deref(), Some("7"));
        assert_eq!(Value::Bool(true).searchable_text(), None);
        assert_eq!(Value::Object.searchable_text(), None);
        assert_eq!(Value::Null.searchable_text(), None);
    }

    #[test]
    fn compare_orders_nulls_first() {
        assert_eq!(Value::Null.compare(&Value::from(1)), Ordering::Less);
        assert_eq!(Value::from("a").compare(&Value::Null), Ordering::Greater);
        assert_eq!(Value::Null.compare(&Value::Null), Ordering::Equal);
    }

    #[test]
    fn compare_numbers_numerically() {
        assert_eq!(Value::from(9).compare(&Value::from(10)), Ordering::Less);
        // As strings "9" > "10"
        assert_eq!(Value::from("9").compare(&Value::from("10")), Ordering::Greater);
    }

    #[test]
    fn nan_sorts_with_nulls() {
        let nan = Value::from(f64::NAN);
        assert!(nan.is_missing());
        assert_eq!(nan.compare(&Value::from(-1e9)), Ordering::Less);
        assert_eq!(Value::from(0).compare(&nan), Ordering::Greater);
        assert_eq!(nan.compare(&Value::Null), Ordering::Equal);
        assert_eq!(nan.compare(&nan), Ordering::Equal);
    }

    #[test]
    fn locale_cmp_ignores_case_first() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn row_set_replaces_existing_field() {
        let mut row = Row::new().with("id", 1).with("name", "Morty");
        row.set("name", "Summer");
        assert_eq!(row.len(), 2);
        assert_eq!(row.value("name"), Value::from("Summer"));
        assert_eq!(row.value("missing"), Value::Null);
    }
}
