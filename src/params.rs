use crate::value::Value;

/// Append-only table of generated placeholders and their bound values.
///
/// [`issue`](Self::issue) is the only way in: every value gets a fresh name
/// from a monotonically increasing counter, so placeholders never collide.
/// Iteration yields entries in issue order.
///
/// # Examples
///
/// ```
/// use mql_lang::{ParameterTable, Value};
///
/// let mut params = ParameterTable::new();
/// assert_eq!(params.issue(Value::Integer(18)), "p1");
/// assert_eq!(params.issue(Value::String("a%".into())), "p2");
///
/// assert_eq!(params.get("p2"), Some(&Value::String("a%".into())));
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTable {
    entries: Vec<(String, Value)>,
    next: usize,
}

impl Default for ParameterTable {
    fn default() -> Self {
        ParameterTable {
            entries: Vec::new(),
            next: 1,
        }
    }
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to a new placeholder and returns the placeholder name.
    pub fn issue(&mut self, value: Value) -> String {
        let name = format!("p{}", self.next);
        self.next += 1;
        self.entries.push((name.clone(), value));
        name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl IntoIterator for ParameterTable {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
