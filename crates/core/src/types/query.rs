//! Query descriptions
//!
//! A [`Query`] carries everything that determines its result set: the base
//! collection, filters, ordering and limit. The cache never executes queries;
//! it only needs a stable, canonical description to derive a cache key from.

use super::reference::validate_path;
use super::value::Value;
use crate::codec;
use crate::errors::{Error, Result};
use serde_json::json;
use std::fmt::{self, Display};

/// Comparison applied by a single filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Equal => "==",
            FilterOp::NotEqual => "!=",
            FilterOp::LessThan => "<",
            FilterOp::LessThanOrEqual => "<=",
            FilterOp::GreaterThan => ">",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
            FilterOp::In => "in",
            FilterOp::NotIn => "not-in",
        }
    }

    /// Operators whose operand must be a list
    fn takes_list(&self) -> bool {
        matches!(
            self,
            FilterOp::ArrayContainsAny | FilterOp::In | FilterOp::NotIn
        )
    }
}

impl Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub count: u32,
    /// Take the last `count` documents of the ordering instead of the first
    pub to_last: bool,
}

/// Query over a single collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<Filter>,
    order_by: Vec<OrderBy>,
    limit: Option<Limit>,
}

impl Query {
    /// Start a query over every document of `collection`
    pub fn collection(path: impl Into<String>) -> Result<Self> {
        let collection = path.into();
        validate_path(&collection)?;
        Ok(Self {
            collection,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        })
    }

    /// Add a filter; all filters are combined with AND
    pub fn where_field(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, count: u32) -> Self {
        self.limit = Some(Limit {
            count,
            to_last: false,
        });
        self
    }

    pub fn limit_to_last(mut self, count: u32) -> Self {
        self.limit = Some(Limit {
            count,
            to_last: true,
        });
        self
    }

    pub fn collection_path(&self) -> &str {
        &self.collection
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn orderings(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit_spec(&self) -> Option<Limit> {
        self.limit
    }

    /// True when the query selects the whole collection unchanged
    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty() && self.order_by.is_empty() && self.limit.is_none()
    }

    /// Check operand shapes and limit combinations
    pub fn validate(&self) -> Result<()> {
        for filter in &self.filters {
            if filter.field.is_empty() {
                return Err(Error::invalid_query(
                    &self.collection,
                    "filter field cannot be empty",
                ));
            }
            if filter.op.takes_list() && !matches!(filter.value, Value::Array(_)) {
                return Err(Error::invalid_query(
                    &self.collection,
                    format!(
                        "operator '{}' on '{}' requires a list operand, got {}",
                        filter.op,
                        filter.field,
                        filter.value.kind()
                    ),
                ));
            }
        }
        if matches!(self.limit, Some(Limit { to_last: true, .. })) && self.order_by.is_empty() {
            return Err(Error::invalid_query(
                &self.collection,
                "limit_to_last requires at least one order_by clause",
            ));
        }
        Ok(())
    }

    /// Canonical JSON description used for key derivation.
    ///
    /// Filters are sorted by their encoded form, so queries that differ only in
    /// the order their filters were added produce the same description. Order-by
    /// clauses keep their sequence since it changes the result.
    pub fn canonical_json(&self) -> Result<String> {
        let mut filters: Vec<String> = self
            .filters
            .iter()
            .map(|f| {
                serde_json::to_string(&json!([f.field, f.op.as_str(), codec::encode(&f.value)]))
            })
            .collect::<std::result::Result<_, _>>()?;
        filters.sort();

        let order_by: Vec<serde_json::Value> = self
            .order_by
            .iter()
            .map(|o| json!([o.field, o.direction.as_str()]))
            .collect();

        let description = json!({
            "collection": self.collection,
            "filters": filters,
            "orderBy": order_by,
            "limit": self.limit.map(|l| l.count),
            "limitToLast": self.limit.map(|l| l.to_last).unwrap_or(false),
        });
        Ok(serde_json::to_string(&description)?)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        for filter in &self.filters {
            write!(f, " where {} {} {:?}", filter.field, filter.op, filter.value)?;
        }
        for order in &self.order_by {
            write!(f, " order by {} {}", order.field, order.direction.as_str())?;
        }
        if let Some(limit) = self.limit {
            let kind = if limit.to_last { "limit to last" } else { "limit" };
            write!(f, " {kind} {}", limit.count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_order_is_not_significant() {
        let a = Query::collection("cities")
            .unwrap()
            .where_field("state", FilterOp::Equal, "CA")
            .where_field("population", FilterOp::GreaterThan, 100_000);
        let b = Query::collection("cities")
            .unwrap()
            .where_field("population", FilterOp::GreaterThan, 100_000)
            .where_field("state", FilterOp::Equal, "CA");
        assert_eq!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn test_order_by_sequence_is_significant() {
        let a = Query::collection("cities")
            .unwrap()
            .order_by("state", Direction::Ascending)
            .order_by("name", Direction::Ascending);
        let b = Query::collection("cities")
            .unwrap()
            .order_by("name", Direction::Ascending)
            .order_by("state", Direction::Ascending);
        assert_ne!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn test_limit_and_limit_to_last_differ() {
        let base = Query::collection("cities")
            .unwrap()
            .order_by("name", Direction::Ascending);
        let first = base.clone().limit(5);
        let last = base.limit_to_last(5);
        assert_ne!(
            first.canonical_json().unwrap(),
            last.canonical_json().unwrap()
        );
    }

    #[test]
    fn test_integer_and_double_operands_differ() {
        let a = Query::collection("c").unwrap().where_field("n", FilterOp::Equal, 1);
        let b = Query::collection("c").unwrap().where_field("n", FilterOp::Equal, 1.0);
        assert_ne!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn test_validate() {
        let q = Query::collection("c")
            .unwrap()
            .where_field("tags", FilterOp::In, "solo");
        assert!(q.validate().is_err());

        let q = Query::collection("c")
            .unwrap()
            .where_field("tags", FilterOp::In, vec!["a", "b"]);
        assert!(q.validate().is_ok());

        let q = Query::collection("c").unwrap().limit_to_last(3);
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_unfiltered() {
        assert!(Query::collection("a/b").unwrap().is_unfiltered());
        assert!(!Query::collection("a/b").unwrap().limit(1).is_unfiltered());
    }
}
