//! Filter/sort/paginate DSL for record collections.
//!
//! Conditions are conjunctive (AND-combined) and evaluated against the
//! record's serialized JSON form, so the same evaluator serves every
//! backend and every entity type, and pattern matching works uniformly on
//! structured fields (they are matched by their JSON text).
//!
//! # Example
//!
//! ```
//! use hydrolog_store::{Query, SortDirection};
//! use hydrolog_types::SensorReading;
//!
//! let query = Query::<SensorReading>::new()
//!     .where_eq("reservoirId", "res-1")
//!     .where_gte("measuredAt", 1_700_000_000_000.0)
//!     .sort_by("measuredAt", SortDirection::Desc)
//!     .take(50);
//! ```
//!
//! # Repeated conditions on one field
//!
//! Two `where_*` calls naming the same field do not intersect: the later
//! call replaces the earlier one. Range queries over a single field are the
//! one supported combination (`where_gte` + `where_lte` coexist). Anything
//! richer belongs in the caller.

use std::cmp::Ordering;
use std::marker::PhantomData;

use serde_json::Value;

use crate::error::Result;
use crate::record::Record;
use crate::store::RecordStore;

/// Sort order for the single sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending (newest first for timestamp keys).
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition {
    Eq(Value),
    NotEq(Value),
    OneOf(Vec<Value>),
    Gte(f64),
    Lte(f64),
    Like(String),
}

impl Condition {
    /// Whether two conditions on the same field may coexist.
    ///
    /// Only the two range bounds compose; everything else is last-wins.
    fn composes_with(&self, other: &Condition) -> bool {
        matches!(
            (self, other),
            (Condition::Gte(_), Condition::Lte(_)) | (Condition::Lte(_), Condition::Gte(_))
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Clause {
    pub(crate) field: String,
    pub(crate) condition: Condition,
}

/// A declarative query over one collection.
///
/// Built fluently, executed through [`RecordStore::fetch`] /
/// [`RecordStore::fetch_count`] or lazily through
/// [`RecordStoreExt::query`](crate::RecordStoreExt::query). Field names use
/// the record's serialized (camelCase) form.
#[derive(Debug, Clone)]
pub struct Query<R> {
    pub(crate) clauses: Vec<Clause>,
    pub(crate) sort: Option<(String, SortDirection)>,
    pub(crate) limit: Option<usize>,
    _entity: PhantomData<fn() -> R>,
}

impl<R> Default for Query<R> {
    fn default() -> Self {
        Self {
            clauses: Vec::new(),
            sort: None,
            limit: None,
            _entity: PhantomData,
        }
    }
}

impl<R> Query<R> {
    /// Create an empty query matching every record, unsorted, uncapped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep records whose `field` equals `value`.
    #[must_use]
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.push_clause(field, Condition::Eq(value.into()))
    }

    /// Keep records whose `field` differs from `value`.
    #[must_use]
    pub fn where_not_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.push_clause(field, Condition::NotEq(value.into()))
    }

    /// Keep records whose `field` is one of `values`.
    #[must_use]
    pub fn where_one_of<V: Into<Value>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_clause(field, Condition::OneOf(values))
    }

    /// Keep records whose numeric `field` is `>= bound`.
    #[must_use]
    pub fn where_gte(self, field: &str, bound: f64) -> Self {
        self.push_clause(field, Condition::Gte(bound))
    }

    /// Keep records whose numeric `field` is `<= bound`.
    #[must_use]
    pub fn where_lte(self, field: &str, bound: f64) -> Self {
        self.push_clause(field, Condition::Lte(bound))
    }

    /// Keep records whose `field`, in string form, matches a SQL-style
    /// pattern (`%` = any run, `_` = any one character), case-insensitively.
    /// Structured values are matched against their JSON text.
    #[must_use]
    pub fn where_like(self, field: &str, pattern: &str) -> Self {
        self.push_clause(field, Condition::Like(pattern.to_string()))
    }

    /// Sort by a single key. A later call replaces the earlier one.
    #[must_use]
    pub fn sort_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort = Some((field.to_string(), direction));
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn take(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn push_clause(mut self, field: &str, condition: Condition) -> Self {
        // Last-wins on a repeated field, except for the gte/lte pair which
        // forms a range.
        self.clauses
            .retain(|c| c.field != field || c.condition.composes_with(&condition));
        self.clauses.push(Clause {
            field: field.to_string(),
            condition,
        });
        self
    }

    /// Evaluate the conjunction against a record's JSON form.
    pub(crate) fn matches(&self, record: &Value) -> bool {
        self.clauses.iter().all(|clause| {
            let field = record.get(&clause.field).unwrap_or(&Value::Null);
            match &clause.condition {
                Condition::Eq(expected) => values_equal(field, expected),
                Condition::NotEq(expected) => !values_equal(field, expected),
                Condition::OneOf(options) => options.iter().any(|v| values_equal(field, v)),
                Condition::Gte(bound) => field.as_f64().is_some_and(|v| v >= *bound),
                Condition::Lte(bound) => field.as_f64().is_some_and(|v| v <= *bound),
                Condition::Like(pattern) => {
                    like_match(&pattern.to_lowercase(), &string_form(field).to_lowercase())
                }
            }
        })
    }

    /// Filter, sort, and cap pre-serialized rows.
    pub(crate) fn apply(&self, rows: Vec<(Value, R)>) -> Vec<R> {
        let mut matched: Vec<(Value, R)> = rows
            .into_iter()
            .filter(|(value, _)| self.matches(value))
            .collect();

        if let Some((field, direction)) = &self.sort {
            matched.sort_by(|(a, _), (b, _)| {
                let left = a.get(field).unwrap_or(&Value::Null);
                let right = b.get(field).unwrap_or(&Value::Null);
                let ordering = compare_values(left, right);
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        matched.into_iter().map(|(_, record)| record).collect()
    }
}

/// Lazily-evaluated query handle.
///
/// Nothing is read until [`fetch`](QueryHandle::fetch) or
/// [`fetch_count`](QueryHandle::fetch_count) is awaited; the same handle can
/// drive both without rebuilding the query.
pub struct QueryHandle<'a, R: Record> {
    store: &'a dyn RecordStore<R>,
    query: Query<R>,
}

impl<'a, R: Record> QueryHandle<'a, R> {
    pub(crate) fn new(store: &'a dyn RecordStore<R>, query: Query<R>) -> Self {
        Self { store, query }
    }

    /// Materialize the matching records.
    pub async fn fetch(&self) -> Result<Vec<R>> {
        self.store.fetch(&self.query).await
    }

    /// Materialize only the number of matches.
    pub async fn fetch_count(&self) -> Result<u64> {
        self.store.fetch_count(&self.query).await
    }
}

/// Equality with numeric widening so `1` and `1.0` compare equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// The string form a LIKE pattern is matched against.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// SQL LIKE over chars: `%` matches any run, `_` matches one character.
/// No escape syntax; literal `%`/`_` cannot be matched.
fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            // Backtrack: let the last % swallow one more character.
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

/// Total order over JSON values: null < bool < number < string < composite.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(_), Value::Number(_)) => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrolog_types::SensorReading;
    use serde_json::json;

    fn q() -> Query<SensorReading> {
        Query::new()
    }

    #[test]
    fn test_eq_and_not_eq() {
        let record = json!({"reservoirId": "res-1", "ph": 6.1});
        assert!(q().where_eq("reservoirId", "res-1").matches(&record));
        assert!(!q().where_eq("reservoirId", "res-2").matches(&record));
        assert!(q().where_not_eq("reservoirId", "res-2").matches(&record));
    }

    #[test]
    fn test_missing_field_is_null() {
        let record = json!({"ph": 6.1});
        assert!(!q().where_eq("reservoirId", "res-1").matches(&record));
        assert!(q().where_eq("reservoirId", Value::Null).matches(&record));
        assert!(q().where_not_eq("reservoirId", "res-1").matches(&record));
    }

    #[test]
    fn test_one_of() {
        let record = json!({"meterId": "m-2"});
        assert!(q().where_one_of("meterId", ["m-1", "m-2"]).matches(&record));
        assert!(!q().where_one_of("meterId", ["m-3"]).matches(&record));
    }

    #[test]
    fn test_numeric_range_composes() {
        let record = json!({"measuredAt": 1500});
        let range = q().where_gte("measuredAt", 1000.0).where_lte("measuredAt", 2000.0);
        assert_eq!(range.clauses.len(), 2);
        assert!(range.matches(&record));
        assert!(!range.matches(&json!({"measuredAt": 2500})));
        // Non-numeric fields never satisfy range bounds.
        assert!(!range.matches(&json!({"measuredAt": "soon"})));
    }

    #[test]
    fn test_repeated_field_is_last_wins() {
        let query = q().where_eq("reservoirId", "res-1").where_eq("reservoirId", "res-2");
        assert_eq!(query.clauses.len(), 1);
        assert!(query.matches(&json!({"reservoirId": "res-2"})));
        assert!(!query.matches(&json!({"reservoirId": "res-1"})));
    }

    #[test]
    fn test_numeric_widening_equality() {
        assert!(q().where_eq("ph", 6).matches(&json!({"ph": 6.0})));
    }

    #[test]
    fn test_like_wildcards() {
        let record = json!({"note": "Week 3 flush"});
        assert!(q().where_like("note", "week%").matches(&record));
        assert!(q().where_like("note", "%flush").matches(&record));
        assert!(q().where_like("note", "%eek_3%").matches(&record));
        assert!(!q().where_like("note", "week").matches(&record));
    }

    #[test]
    fn test_like_on_structured_field_uses_json_text() {
        let record = json!({"metadata": {"probeBatch": "b-42"}});
        assert!(q().where_like("metadata", "%\"probebatch\":\"b-42\"%").matches(&record));
    }

    #[test]
    fn test_like_match_edge_cases() {
        assert!(like_match("", ""));
        assert!(like_match("%", ""));
        assert!(like_match("%", "anything"));
        assert!(!like_match("_", ""));
        assert!(like_match("a%b%c", "axxbyyc"));
        assert!(!like_match("a%b", "acb x"));
    }

    #[test]
    fn test_apply_sorts_and_caps() {
        let rows: Vec<(Value, i64)> = [3, 1, 2]
            .into_iter()
            .map(|n| (json!({"measuredAt": n}), n))
            .collect();

        let query: Query<i64> = Query {
            sort: Some(("measuredAt".to_string(), SortDirection::Desc)),
            limit: Some(2),
            ..Query::default()
        };
        assert_eq!(query.apply(rows), vec![3, 2]);
    }

    #[test]
    fn test_compare_values_cross_type() {
        assert_eq!(compare_values(&Value::Null, &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!("a"), &json!(1)), Ordering::Greater);
        assert_eq!(compare_values(&json!(1.5), &json!(2)), Ordering::Less);
    }
}
