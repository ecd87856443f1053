use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::Value;

/// One result row: column names mapped to values, in the order the
/// transport produced them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, replacing the value in place if the name repeats.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(col, _)| *col == name) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Builder form of [`Row::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns a value by exact column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, value)| value)
    }

    /// Returns an integer value by column name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns a text value by column name.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.push(name, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Row, Value};

    #[test]
    fn keeps_column_order_in_json() {
        let row = Row::new()
            .with("zeta", 1)
            .with("alpha", "a")
            .with("mid", Value::Null);

        let encoded = serde_json::to_string(&row).expect("must serialize");
        assert_eq!(encoded, r#"{"zeta":1,"alpha":"a","mid":null}"#);
    }

    #[test]
    fn repeated_column_overwrites_in_place() {
        let row: Row = [("a", 1), ("b", 2), ("a", 3)].into_iter().collect();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get_i64("a"), Some(3));
        let names: Vec<&str> = row.columns().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
