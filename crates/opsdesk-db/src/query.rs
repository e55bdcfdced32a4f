//! Backend-neutral query model.
//!
//! Handlers assemble a [`Filter`] by conditionally adding [`Condition`]s for
//! the request parameters that are present, then wrap it in
//! [`FindOptions`] with a [`Sort`] and skip/limit. Each backend evaluates
//! the same model: [`crate::memory`] in process, [`crate::postgres`] by
//! compiling it to SQL over the `JSONB` body.
//!
//! Field names are top-level document keys or dotted paths into embedded
//! objects (`address.city`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// How a field's value is interpreted for ordering and range comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Plain string ordering.
    Text,
    /// JSON integer.
    Integer,
    /// Decimal stored as a JSON string (or number).
    Decimal,
    /// RFC 3339 timestamp stored as a JSON string.
    Timestamp,
}

/// A typed value for range comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Integer bound.
    Integer(i64),
    /// Decimal bound.
    Decimal(Decimal),
    /// Timestamp bound.
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// The kind this bound compares as.
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Integer(_) => ScalarKind::Integer,
            Self::Decimal(_) => ScalarKind::Decimal,
            Self::Timestamp(_) => ScalarKind::Timestamp,
        }
    }
}

/// Range comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// SQL spelling of the operator.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    /// Whether `ordering` (left compared to right) satisfies the operator.
    pub const fn accepts(self, ordering: core::cmp::Ordering) -> bool {
        use core::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Lt => matches!(ordering, Less),
            Self::Lte => matches!(ordering, Less | Equal),
            Self::Gt => matches!(ordering, Greater),
            Self::Gte => matches!(ordering, Greater | Equal),
        }
    }
}

/// A single predicate over a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the JSON value. `Null` matches missing fields too.
    Eq {
        /// Field path.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// Field is a string equal to the value, ignoring case.
    EqIgnoreCase {
        /// Field path.
        field: String,
        /// Expected text.
        value: String,
    },
    /// Field differs from the JSON value (missing fields differ).
    Ne {
        /// Field path.
        field: String,
        /// Rejected value.
        value: Value,
    },
    /// Field equals one of the values.
    In {
        /// Field path.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Field equals none of the values.
    NotIn {
        /// Field path.
        field: String,
        /// Rejected values.
        values: Vec<Value>,
    },
    /// JSON containment, with the semantics of `PostgreSQL`'s `@>`.
    Contains {
        /// Field path.
        field: String,
        /// Contained fragment.
        value: Value,
    },
    /// Case-insensitive substring match against any of the fields.
    Search {
        /// Field paths searched.
        fields: Vec<String>,
        /// Substring to look for.
        needle: String,
    },
    /// Typed range comparison against a constant.
    Compare {
        /// Field path.
        field: String,
        /// Operator, field on the left.
        op: CompareOp,
        /// Bound on the right.
        value: Scalar,
    },
    /// Typed comparison between two fields of the same document.
    FieldCompare {
        /// Left field path.
        left: String,
        /// Operator.
        op: CompareOp,
        /// Right field path.
        right: String,
        /// How both sides are interpreted.
        kind: ScalarKind,
    },
    /// Field is missing or `null`.
    IsNull {
        /// Field path.
        field: String,
    },
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// An empty filter.
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// The conditions, in insertion order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether no condition has been added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Add an arbitrary condition.
    #[must_use]
    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Require `field == value`.
    #[must_use]
    pub fn eq(self, field: &str, value: impl Serialize) -> Self {
        self.with(Condition::Eq {
            field: field.to_owned(),
            value: to_json(value),
        })
    }

    /// Require `field == value` when `value` is present.
    #[must_use]
    pub fn eq_opt<T: Serialize>(self, field: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    /// Require the string at `field` to equal `value`, ignoring case.
    #[must_use]
    pub fn eq_ignore_case(self, field: &str, value: &str) -> Self {
        self.with(Condition::EqIgnoreCase {
            field: field.to_owned(),
            value: value.to_owned(),
        })
    }

    /// Require `field != value`.
    #[must_use]
    pub fn ne(self, field: &str, value: impl Serialize) -> Self {
        self.with(Condition::Ne {
            field: field.to_owned(),
            value: to_json(value),
        })
    }

    /// Require `field` to equal one of `values`.
    #[must_use]
    pub fn is_in<T: Serialize>(self, field: &str, values: impl IntoIterator<Item = T>) -> Self {
        self.with(Condition::In {
            field: field.to_owned(),
            values: values.into_iter().map(to_json).collect(),
        })
    }

    /// Require `field` to equal none of `values`.
    #[must_use]
    pub fn not_in<T: Serialize>(self, field: &str, values: impl IntoIterator<Item = T>) -> Self {
        self.with(Condition::NotIn {
            field: field.to_owned(),
            values: values.into_iter().map(to_json).collect(),
        })
    }

    /// Require the array at `field` to contain `element`.
    #[must_use]
    pub fn array_contains(self, field: &str, element: impl Serialize) -> Self {
        self.with(Condition::Contains {
            field: field.to_owned(),
            value: Value::Array(vec![to_json(element)]),
        })
    }

    /// Require `field` to contain the JSON fragment.
    #[must_use]
    pub fn contains(self, field: &str, fragment: Value) -> Self {
        self.with(Condition::Contains {
            field: field.to_owned(),
            value: fragment,
        })
    }

    /// Case-insensitive substring search over `fields`, skipped when the
    /// needle is absent or blank.
    #[must_use]
    pub fn search(self, fields: &[&str], needle: Option<&str>) -> Self {
        match needle.map(str::trim) {
            Some(needle) if !needle.is_empty() => self.with(Condition::Search {
                fields: fields.iter().map(|f| (*f).to_owned()).collect(),
                needle: needle.to_owned(),
            }),
            _ => self,
        }
    }

    /// Typed range comparison against a constant.
    #[must_use]
    pub fn compare(self, field: &str, op: CompareOp, value: Scalar) -> Self {
        self.with(Condition::Compare {
            field: field.to_owned(),
            op,
            value,
        })
    }

    /// Typed comparison between two fields.
    #[must_use]
    pub fn field_compare(self, left: &str, op: CompareOp, right: &str, kind: ScalarKind) -> Self {
        self.with(Condition::FieldCompare {
            left: left.to_owned(),
            op,
            right: right.to_owned(),
            kind,
        })
    }

    /// Require `field` to be missing or `null`.
    #[must_use]
    pub fn is_null(self, field: &str) -> Self {
        self.with(Condition::IsNull {
            field: field.to_owned(),
        })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// Ordering of a find. Missing values sort last in both directions; ties
/// are broken by document id in the same direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field path.
    pub field: String,
    /// How the field is compared.
    pub kind: ScalarKind,
    /// Direction.
    pub direction: Direction,
}

impl Sort {
    /// Ascending sort.
    pub fn asc(field: &str, kind: ScalarKind) -> Self {
        Self {
            field: field.to_owned(),
            kind,
            direction: Direction::Asc,
        }
    }

    /// Descending sort.
    pub fn desc(field: &str, kind: ScalarKind) -> Self {
        Self {
            field: field.to_owned(),
            kind,
            direction: Direction::Desc,
        }
    }

    /// Newest documents first.
    pub fn newest_first() -> Self {
        Self::desc("createdAt", ScalarKind::Timestamp)
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::newest_first()
    }
}

/// A complete find request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Which documents match.
    pub filter: Filter,
    /// How matches are ordered.
    pub sort: Sort,
    /// Number of matches to skip.
    pub skip: u64,
    /// Maximum number of documents returned (`None` = all).
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Find everything matching `filter`, newest first.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Replace the sort.
    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Skip the first `skip` matches.
    #[must_use]
    pub const fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Return at most `limit` documents.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One bucket of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    /// The field value as text (`None` for missing or `null`).
    pub key: Option<String>,
    /// Number of matching documents in the bucket.
    pub count: u64,
}

/// Resolve a dotted field path inside a document.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

/// Text form of a JSON value as `PostgreSQL`'s `#>>` operator renders it.
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Split a dotted path into the segments bound for `#>` / `#>>`.
pub fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_owned).collect()
}

fn to_json(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
