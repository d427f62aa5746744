//! Read queries and subscription scopes.
//!
//! The backend supports filtered, ordered, limited reads and push
//! subscriptions keyed by table + filter. Both are described here as
//! plain data so every backend (hosted or in-memory) interprets them the
//! same way.

use std::cmp::Ordering;

use edudash_protocol::ChangeEvent;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Filter / Order
// ---------------------------------------------------------------------------

/// An equality filter: `column = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// The filter in the backend's operator syntax: `column=eq.value`.
    pub fn to_filter_string(&self) -> String {
        format!("{}=eq.{}", self.column, self.value)
    }

    /// Returns `true` if `row[column]` equals the filter value.
    ///
    /// Strings compare directly; numbers and booleans compare by their
    /// JSON text, which is how they'd appear in a URL filter.
    pub fn matches(&self, row: &Value) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// A sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Compares two rows by this key. Missing and null cells sort last
    /// regardless of direction.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let (x, y) = (a.get(&self.column), b.get(&self.column));
        let x = x.filter(|v| !v.is_null());
        let y = y.filter(|v| !v.is_null());
        let ord = match (x, y) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(Value::Number(x)), Some(Value::Number(y))) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.total_cmp(&y)
            }
            (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
            (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        };
        if self.ascending { ord } else { ord.reverse() }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A one-shot read of a table.
///
/// ```rust
/// use edudash_realtime::Query;
///
/// let q = Query::table("messages")
///     .eq("conversation_id", "c-1")
///     .order_asc("created_at");
/// assert_eq!(
///     q.to_query_string(),
///     "select=*&conversation_id=eq.c-1&order=created_at.asc"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order::asc(column));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order::desc(column));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Query parameters as key/value pairs, ready for URL encoding.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for f in &self.filters {
            params.push((f.column.clone(), format!("eq.{}", f.value)));
        }
        if let Some(order) = &self.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{dir}", order.column)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Unencoded query string, for logs and tests.
    pub fn to_query_string(&self) -> String {
        self.params()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Applies this query to in-memory rows: filter, sort, then limit.
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut out: Vec<Value> = rows
            .iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect();
        if let Some(order) = &self.order {
            // Stable sort: equal keys keep insertion order.
            out.sort_by(|a, b| order.compare(a, b));
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// SubscriptionSpec
// ---------------------------------------------------------------------------

/// The scope of a change subscription: a table and an optional filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    pub table: String,
    pub filter: Option<Filter>,
}

impl SubscriptionSpec {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            filter: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The channel topic used by the hosted change feed.
    pub fn topic(&self) -> String {
        match &self.filter {
            Some(f) => format!("realtime:{}:{}", self.table, f.to_filter_string()),
            None => format!("realtime:{}", self.table),
        }
    }

    /// Returns `true` if `event` falls inside this scope.
    ///
    /// Deletes are matched against the old row, everything else against
    /// the new one.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        let Some(filter) = &self.filter else {
            return true;
        };
        event
            .record
            .as_ref()
            .or(event.old_record.as_ref())
            .is_some_and(|row| filter.matches(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_include_filters_order_and_limit() {
        let q = Query::table("leaderboard").order_asc("rank").limit(10);
        assert_eq!(q.to_query_string(), "select=*&order=rank.asc&limit=10");
    }

    #[test]
    fn test_filter_matches_numbers_by_text() {
        let f = Filter::eq("rank", "3");
        assert!(f.matches(&json!({ "rank": 3 })));
        assert!(!f.matches(&json!({ "rank": 4 })));
        assert!(!f.matches(&json!({ "rank": null })));
    }

    #[test]
    fn test_apply_filters_sorts_and_limits() {
        let rows = vec![
            json!({ "id": "a", "rank": 3 }),
            json!({ "id": "b", "rank": 1 }),
            json!({ "id": "c", "rank": 2 }),
        ];

        let out = Query::table("leaderboard").order_asc("rank").limit(2).apply(&rows);

        let ids: Vec<_> = out.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_order_desc_keeps_nulls_last() {
        let rows = vec![
            json!({ "id": "a", "score": null }),
            json!({ "id": "b", "score": 5 }),
            json!({ "id": "c", "score": 9 }),
        ];

        let out = Query::table("t").order_desc("score").apply(&rows);

        let ids: Vec<_> = out.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_subscription_topic_includes_filter() {
        let spec = SubscriptionSpec::table("messages").filter(Filter::eq("conversation_id", "c-1"));
        assert_eq!(spec.topic(), "realtime:messages:conversation_id=eq.c-1");
    }

    #[test]
    fn test_subscription_matches_scope() {
        let spec = SubscriptionSpec::table("messages").filter(Filter::eq("conversation_id", "c-1"));

        let inside = ChangeEvent::insert("messages", json!({ "conversation_id": "c-1" }));
        let other_conv = ChangeEvent::insert("messages", json!({ "conversation_id": "c-2" }));
        let other_table = ChangeEvent::insert("leaderboard", json!({ "conversation_id": "c-1" }));
        let deleted = ChangeEvent::delete("messages", json!({ "conversation_id": "c-1" }));

        assert!(spec.matches(&inside));
        assert!(!spec.matches(&other_conv));
        assert!(!spec.matches(&other_table));
        assert!(spec.matches(&deleted));
    }
}
