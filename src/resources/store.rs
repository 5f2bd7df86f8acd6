//! In-memory document store
//!
//! Documents are JSON objects keyed by a generated 24-hex `_id`, kept in
//! insertion order per collection.

use std::cmp::Ordering;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::LazyLock;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::ResourceKind;

pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// Query keys that shape the result instead of filtering it
const RESERVED_KEYS: [&str; 4] = ["sort", "fields", "page", "limit"];

const DEFAULT_LIMIT: usize = 100;

static MACHINE_TAG: LazyLock<u64> = LazyLock::new(|| {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u32(std::process::id());
    hasher.finish() & 0xff_ffff_ffff
});

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// 4 bytes of seconds, 5 bytes of per-process tag, 3 bytes of counter
pub fn generate_id() -> String {
    let secs = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
    let counter = ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed) & 0x00ff_ffff;
    format!("{secs:08x}{:010x}{counter:06x}", *MACHINE_TAG)
}

/// Comparison operators accepted as `field[op]=value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone)]
enum Filter {
    /// Field equals any of the values
    AnyOf(String, Vec<String>),
    Compare(String, Comparison, String),
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::AnyOf(field, values) => doc
                .get(field)
                .is_some_and(|v| values.iter().any(|want| value_equals(v, want))),
            Self::Compare(field, op, operand) => doc
                .get(field)
                .and_then(|v| compare_to(v, operand))
                .is_some_and(|ordering| op.holds(ordering)),
        }
    }
}

/// Filtering, sorting, projection and paging for a list request
#[derive(Debug, Clone)]
pub struct ListQuery {
    filters: Vec<Filter>,
    /// Field name and descending flag
    sort: Vec<(String, bool)>,
    fields: Option<Vec<String>>,
    page: usize,
    limit: usize,
}

impl ListQuery {
    pub fn from_query(query: &Map<String, Value>) -> Self {
        let mut filters = Vec::new();
        for (key, value) in query {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            match value {
                Value::Object(ops) => {
                    for (op, operand) in ops {
                        if let (Some(cmp), Some(operand)) = (Comparison::parse(op), scalar(operand)) {
                            filters.push(Filter::Compare(key.clone(), cmp, operand));
                        }
                    }
                }
                Value::Array(items) => {
                    filters.push(Filter::AnyOf(key.clone(), items.iter().filter_map(scalar).collect()));
                }
                other => {
                    if let Some(v) = scalar(other) {
                        filters.push(Filter::AnyOf(key.clone(), vec![v]));
                    }
                }
            }
        }

        let sort = list_param(query, "sort")
            .map(|fields| {
                fields
                    .into_iter()
                    .map(|f| (f.trim_start_matches('-').to_string(), f.starts_with('-')))
                    .collect()
            })
            .unwrap_or_default();

        let page = number_param(query, "page").filter(|p| *p > 0).unwrap_or(1);
        let limit = number_param(query, "limit")
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT);

        Self {
            filters,
            sort,
            fields: list_param(query, "fields"),
            page,
            limit,
        }
    }

    fn project(&self, doc: &Document) -> Value {
        let Some(fields) = &self.fields else {
            return Value::Object(doc.clone());
        };
        let mut out = Map::new();
        if let Some(id) = doc.get(ID_FIELD) {
            out.insert(ID_FIELD.to_string(), id.clone());
        }
        for field in fields {
            if let Some(v) = doc.get(field) {
                out.insert(field.clone(), v.clone());
            }
        }
        Value::Object(out)
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, descending) in &self.sort {
            let ordering = order_values(a.get(field), b.get(field));
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Comma-separated list; the last value wins when the key was repeated
fn list_param(query: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let raw = match query.get(key)? {
        Value::Array(items) => items.last().and_then(scalar)?,
        other => scalar(other)?,
    };
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

fn number_param(query: &Map<String, Value>, key: &str) -> Option<usize> {
    list_param(query, key)?.first()?.parse().ok()
}

fn value_equals(value: &Value, want: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|v| value_equals(v, want)),
        other => scalar(other).is_some_and(|s| s == want),
    }
}

fn compare_to(value: &Value, operand: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => {
            let lhs = n.as_f64()?;
            let rhs: f64 = operand.parse().ok()?;
            lhs.partial_cmp(&rhs)
        }
        Value::String(s) => Some(s.as_str().cmp(operand)),
        _ => None,
    }
}

/// Missing values sort first, numbers before strings
fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .unwrap_or(Ordering::Equal),
        (Some(Value::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Number(_))) => Ordering::Greater,
        (Some(x), Some(y)) => scalar(x).cmp(&scalar(y)),
    }
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    collections: RwLock<HashMap<ResourceKind, Vec<Document>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Vec<Value> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&kind) else {
            return Vec::new();
        };

        let mut matched: Vec<&Document> = docs
            .iter()
            .filter(|doc| query.filters.iter().all(|f| f.matches(doc)))
            .collect();
        if !query.sort.is_empty() {
            matched.sort_by(|a, b| query.compare(a, b));
        }

        let skip = query.page.saturating_sub(1).saturating_mul(query.limit);
        matched
            .into_iter()
            .skip(skip)
            .take(query.limit)
            .map(|doc| query.project(doc))
            .collect()
    }

    pub async fn get(&self, kind: ResourceKind, id: &str) -> Option<Document> {
        let collections = self.collections.read().await;
        collections
            .get(&kind)?
            .iter()
            .find(|doc| has_id(doc, id))
            .cloned()
    }

    /// Store a new document; any client-supplied `_id` is replaced
    pub async fn create(&self, kind: ResourceKind, mut fields: Document) -> Document {
        fields.insert(ID_FIELD.to_string(), Value::String(generate_id()));
        self.collections
            .write()
            .await
            .entry(kind)
            .or_default()
            .push(fields.clone());
        fields
    }

    /// Shallow-merge `changes` into the document; `_id` cannot change
    pub async fn update(&self, kind: ResourceKind, id: &str, changes: Document) -> Option<Document> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(&kind)?
            .iter_mut()
            .find(|doc| has_id(doc, id))?;
        for (key, value) in changes {
            if key != ID_FIELD {
                doc.insert(key, value);
            }
        }
        Some(doc.clone())
    }

    pub async fn delete(&self, kind: ResourceKind, id: &str) -> bool {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&kind) else {
            return false;
        };
        let before = docs.len();
        docs.retain(|doc| !has_id(doc, id));
        docs.len() != before
    }

    pub async fn count(&self, kind: ResourceKind) -> usize {
        self.collections.read().await.get(&kind).map_or(0, Vec::len)
    }
}

fn has_id(doc: &Document, id: &str) -> bool {
    doc.get(ID_FIELD).and_then(Value::as_str) == Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::query;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test documents are objects"),
        }
    }

    async fn seeded() -> DocumentStore {
        let store = DocumentStore::new();
        for (name, price, color) in [("lamp", 5, "red"), ("desk", 120, "blue"), ("chair", 45, "red")] {
            store
                .create(
                    ResourceKind::Products,
                    doc(json!({"name": name, "price": price, "color": color})),
                )
                .await;
        }
        store
    }

    fn names(docs: &[Value]) -> Vec<&str> {
        docs.iter().filter_map(|d| d["name"].as_str()).collect()
    }

    #[test]
    fn test_generated_ids_are_24_hex_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_filters() {
        let store = seeded().await;
        let q = ListQuery::from_query(&query::parse("color=red"));
        assert_eq!(names(&store.list(ResourceKind::Products, &q).await), ["lamp", "chair"]);

        let q = ListQuery::from_query(&query::parse("price=5&price=120"));
        assert_eq!(names(&store.list(ResourceKind::Products, &q).await), ["lamp", "desk"]);

        let q = ListQuery::from_query(&query::parse("price[gte]=40&price[lt]=100"));
        assert_eq!(names(&store.list(ResourceKind::Products, &q).await), ["chair"]);
    }

    #[tokio::test]
    async fn test_reserved_keys_shape_results() {
        let store = seeded().await;
        let q = ListQuery::from_query(&query::parse("sort=-price&fields=name&limit=2&page=1"));
        let docs = store.list(ResourceKind::Products, &q).await;
        assert_eq!(names(&docs), ["desk", "chair"]);
        assert!(docs[0].get("price").is_none());
        assert!(docs[0].get("_id").is_some());

        let q = ListQuery::from_query(&query::parse("sort=price&limit=2&page=2"));
        assert_eq!(names(&store.list(ResourceKind::Products, &q).await), ["desk"]);
    }

    #[tokio::test]
    async fn test_crud() {
        let store = DocumentStore::new();
        let created = store
            .create(ResourceKind::Orders, doc(json!({"_id": "mine", "status": "Processed"})))
            .await;
        let id = created[ID_FIELD].as_str().unwrap().to_string();
        assert_ne!(id, "mine");

        let updated = store
            .update(ResourceKind::Orders, &id, doc(json!({"status": "Delivery", "_id": "x"})))
            .await
            .unwrap();
        assert_eq!(updated["status"], "Delivery");
        assert_eq!(updated[ID_FIELD], json!(id));

        assert!(store.get(ResourceKind::Users, &id).await.is_none());
        assert!(store.delete(ResourceKind::Orders, &id).await);
        assert!(!store.delete(ResourceKind::Orders, &id).await);
        assert_eq!(store.count(ResourceKind::Orders).await, 0);
    }
}
