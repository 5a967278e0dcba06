use std::sync::Arc;
use wrangler_xpath::Document;

/// Non-text, non-document field contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

/// Contents of a row field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    /// An already-parsed XML document, shared between rows that carry it.
    Document(Arc<Document>),
    Other(Scalar),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Self::Document(Arc::new(value))
    }
}

impl From<Arc<Document>> for Value {
    fn from(value: Arc<Document>) -> Self {
        Self::Document(value)
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Self::Other(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Other(Scalar::Integer(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Other(Scalar::Boolean(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Other(Scalar::Float(value))
    }
}

/// One record: ordered fields addressed by exact name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Row::add_or_set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_or_set(name, value);
        self
    }

    /// Position of the field called `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name).map(|i| &self.fields[i].1)
    }

    /// Overwrites the field in place if present, otherwise appends it.
    pub fn add_or_set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.find(&name) {
            Some(i) => self.fields[i].1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.find(name).map(|i| self.fields.remove(i).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}
