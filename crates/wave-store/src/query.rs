//! Filtered, ordered queries over a single collection.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value.
    Eq(String, Value),
    /// Field is an array containing the value.
    ArrayContains(String, Value),
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => doc.fields.get(field) == Some(value),
            Filter::ArrayContains(field, value) => match doc.fields.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn array_contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::ArrayContains(field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if let Some((field, _)) = &self.order_by {
            // documents without the ordering field are not part of an ordered result
            if !doc.fields.contains_key(field) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Filter, order and truncate the documents of this query's collection.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some((field, direction)) = &self.order_by {
            out.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(field), b.fields.get(field))
                    .then_with(|| a.path.cmp(&b.path));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Total order used for `order_by`: null < booleans < numbers < strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> Document {
        let Value::Object(fields) = value else {
            panic!("object expected")
        };
        Document::new(format!("chats/{id}"), fields)
    }

    #[test]
    fn array_contains_and_descending_order() {
        let docs = vec![
            doc("c1", json!({"participants": ["a", "b"], "lastTimestamp": 10})),
            doc("c2", json!({"participants": ["a", "c"], "lastTimestamp": 30})),
            doc("c3", json!({"participants": ["b", "c"], "lastTimestamp": 20})),
            doc("c4", json!({"participants": ["a", "d"]})),
        ];
        let q = Query::collection("chats")
            .array_contains("participants", "a")
            .order_by("lastTimestamp", Direction::Descending);

        let ids: Vec<_> = q.apply(docs).iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }

    #[test]
    fn equality_filter_and_limit() {
        let docs = vec![
            doc("c1", json!({"status": "pending", "n": 1})),
            doc("c2", json!({"status": "accepted", "n": 2})),
            doc("c3", json!({"status": "pending", "n": 3})),
        ];
        let q = Query::collection("chats")
            .where_eq("status", "pending")
            .order_by("n", Direction::Ascending)
            .limit(1);
        let out = q.apply(docs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), "c1");
    }

    #[test]
    fn ties_break_on_path() {
        let docs = vec![
            doc("b", json!({"timestamp": 5})),
            doc("a", json!({"timestamp": 5})),
        ];
        let q = Query::collection("chats").order_by("timestamp", Direction::Ascending);
        let out = q.apply(docs);
        assert_eq!(out[0].id(), "a");
    }
}
