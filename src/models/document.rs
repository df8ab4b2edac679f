use linked_hash_map::LinkedHashMap;

/// Generic YAML tree flowing through the build pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Document {
    #[default]
    Null,
    Bool(bool),
    /// Wide enough for every signed and unsigned 64-bit value
    Integer(i128),
    Float(f64),
    String(String),
    Sequence(Sequence),
    Mapping(Mapping),
}

/// Ordered list of documents with a rendering hint.
///
/// When `flow` is set the serializer renders the sequence inline
/// (`[a, b, c]`) instead of one item per line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub items: Vec<Document>,
    pub flow: bool,
}

/// Insertion-ordered string-keyed mapping.
///
/// Replacing the value of an existing key keeps the key where it was.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: LinkedHashMap<String, Document>,
}

impl Document {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    /// The string value trimmed, if it is a string with visible content.
    pub fn as_trimmed_str(&self) -> Option<&str> {
        self.as_str().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Document::Integer(i) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Document::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Document::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Document::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Document::Sequence(_))
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "bool",
            Document::Integer(_) => "int",
            Document::Float(_) => "float",
            Document::String(_) => "str",
            Document::Sequence(_) => "list",
            Document::Mapping(_) => "dict",
        }
    }

}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::String(value.to_string())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::String(value)
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Integer(value.into())
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Bool(value)
    }
}

impl From<Mapping> for Document {
    fn from(value: Mapping) -> Self {
        Document::Mapping(value)
    }
}

impl From<Sequence> for Document {
    fn from(value: Sequence) -> Self {
        Document::Sequence(value)
    }
}

impl From<Vec<Document>> for Document {
    fn from(value: Vec<Document>) -> Self {
        Document::Sequence(Sequence::new(value))
    }
}

impl Sequence {
    pub fn new(items: Vec<Document>) -> Self {
        Sequence { items, flow: false }
    }

    pub fn flow(items: Vec<Document>) -> Self {
        Sequence { items, flow: true }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.items.iter()
    }

    pub fn push(&mut self, value: impl Into<Document>) {
        self.items.push(value.into());
    }

    /// Whether any item is the string `value`.
    pub fn contains_str(&self, value: &str) -> bool {
        self.items.iter().any(|item| item.as_str() == Some(value))
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Mapping {
    pub fn new() -> Self {
        Mapping {
            entries: LinkedHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Document> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Set `key` to `value`, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Document>) -> Option<Document> {
        let key = key.into();
        let value = value.into();
        match self.entries.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.insert(key, value);
                None
            }
        }
    }

    /// Insert `value` only when `key` is absent.
    pub fn insert_if_absent(&mut self, key: &str, value: impl Into<Document>) {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.to_string(), value.into());
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Document> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Document)> {
        self.entries.iter()
    }

    /// Trimmed, non-empty string value of `key`.
    pub fn get_trimmed_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Document::as_trimmed_str)
    }

    /// First of `keys` that is present and not null.
    pub fn get_first(&self, keys: &[&str]) -> Option<&Document> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.is_null())
    }

    /// The value under `key` as a sequence, replacing anything else with an empty one.
    pub fn ensure_sequence(&mut self, key: &str) -> &mut Sequence {
        if !self.get(key).is_some_and(Document::is_sequence) {
            self.insert(key, Sequence::default());
        }
        match self.entries.get_mut(key) {
            Some(Document::Sequence(seq)) => seq,
            _ => unreachable!("sequence inserted above"),
        }
    }
}

impl FromIterator<(String, Document)> for Mapping {
    fn from_iter<T: IntoIterator<Item = (String, Document)>>(iter: T) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}
