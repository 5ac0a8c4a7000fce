//! # Field Allow-Lists
//!
//! Partial-field inputs (create/update/filter) arrive from the boundary as
//! JSON maps. Instead of splicing whatever keys appear into SQL, every
//! entity declares an explicit field → column mapping here; keys outside the
//! mapping are rejected with an error naming the key, before any write
//! begins. This closes off both injection surface and silent schema drift.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Dynamic SQL, Allow-Listed                                  │
//! │                                                                         │
//! │  { "name": "Ravi", "phone": "98..." }      incoming JSON map            │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  [FieldSpec("name", Text), FieldSpec("phone", Text), ...]  allow-list   │
//! │            │                                                            │
//! │            ├── unknown key?      → ValidationError::UnknownField        │
//! │            ├── denied key?       → ValidationError::ImmutableField      │
//! │            ├── wrong value type? → ValidationError::InvalidValue        │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  QueryBuilder: column names from the allow-list (trusted),              │
//! │                values as bind parameters (never interpolated)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};

use crate::error::DbResult;
use khata_core::ValidationError;

/// A JSON object as received from the boundary.
pub type JsonMap = Map<String, Value>;

/// How a column binds and (for filters) how it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    /// TEXT column: filters use partial (substring) matching.
    Text,
    /// Numeric column: filters use exact matching.
    Numeric,
}

/// One allow-listed field. The key doubles as the column name; the public
/// field names ARE the schema names in this system.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSpec {
    pub key: &'static str,
    pub kind: FieldKind,
}

pub(crate) const fn text(key: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        kind: FieldKind::Text,
    }
}

pub(crate) const fn numeric(key: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        kind: FieldKind::Numeric,
    }
}

/// A JSON value coerced to its SQL bind form.
enum BindValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Coerces a JSON value for an allow-listed field, rejecting shapes that
/// don't fit the column.
fn coerce(entity: &str, spec: &FieldSpec, value: &Value) -> DbResult<BindValue> {
    match (spec.kind, value) {
        (FieldKind::Text, Value::String(s)) => Ok(BindValue::Text(s.clone())),
        // Numbers are acceptable for text columns (e.g. pincode sent as a
        // number); store their canonical string form
        (FieldKind::Text, Value::Number(n)) => Ok(BindValue::Text(n.to_string())),
        (FieldKind::Numeric, Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(BindValue::Int(i))
            } else {
                Ok(BindValue::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        _ => Err(ValidationError::InvalidValue {
            field: format!("{entity}.{}", spec.key),
            reason: match spec.kind {
                FieldKind::Text => "expected a string".to_string(),
                FieldKind::Numeric => "expected a number".to_string(),
            },
        }
        .into()),
    }
}

fn find_spec<'a>(
    entity: &str,
    allow: &'a [FieldSpec],
    key: &str,
) -> DbResult<&'a FieldSpec> {
    allow.iter().find(|spec| spec.key == key).ok_or_else(|| {
        ValidationError::UnknownField {
            entity: entity.to_string(),
            field: key.to_string(),
        }
        .into()
    })
}

/// Validates a map against an allow-list (plus an optional deny-list of
/// immutable fields) and returns the writable (key, bind) pairs. Null values
/// are skipped; the permissive contract treats them as absent.
fn collect(
    entity: &str,
    allow: &[FieldSpec],
    deny: &[&str],
    data: &JsonMap,
) -> DbResult<Vec<(&'static str, BindValue)>> {
    let mut out = Vec::with_capacity(data.len());

    for (key, value) in data {
        if deny.contains(&key.as_str()) {
            return Err(ValidationError::ImmutableField { field: key.clone() }.into());
        }

        let spec = find_spec(entity, allow, key)?;

        if value.is_null() {
            continue;
        }

        out.push((spec.key, coerce(entity, spec, value)?));
    }

    Ok(out)
}

fn push_bind(separated: &mut sqlx::query_builder::Separated<'_, '_, Sqlite, &str>, value: BindValue) {
    match value {
        BindValue::Int(i) => separated.push_bind_unseparated(i),
        BindValue::Float(f) => separated.push_bind_unseparated(f),
        BindValue::Text(s) => separated.push_bind_unseparated(s),
    };
}

// =============================================================================
// Statement Builders
// =============================================================================

/// Builds `INSERT INTO <table> (<provided columns>) VALUES (<binds>)` from
/// the provided fields only, leaving everything else to schema defaults.
pub(crate) fn build_insert(
    table: &str,
    entity: &str,
    allow: &[FieldSpec],
    data: &JsonMap,
) -> DbResult<QueryBuilder<'static, Sqlite>> {
    let fields = collect(entity, allow, &[], data)?;

    let mut qb = QueryBuilder::new(format!("INSERT INTO {table} ("));

    {
        let mut sep = qb.separated(", ");
        for (column, _) in &fields {
            sep.push(*column);
        }
    }

    qb.push(") VALUES (");

    {
        let mut sep = qb.separated(", ");
        for (_, value) in fields {
            match value {
                BindValue::Int(i) => sep.push_bind(i),
                BindValue::Float(f) => sep.push_bind(f),
                BindValue::Text(s) => sep.push_bind(s),
            };
        }
    }

    qb.push(")");

    Ok(qb)
}

/// Builds `UPDATE <table> SET <col> = <bind>, ...` (no WHERE; the caller
/// appends its own row predicate).
///
/// Rejects empty update sets, keys on the deny-list (immutable fields), and
/// keys outside the allow-list.
pub(crate) fn build_update(
    table: &str,
    entity: &str,
    allow: &[FieldSpec],
    deny: &[&str],
    data: &JsonMap,
) -> DbResult<QueryBuilder<'static, Sqlite>> {
    let fields = collect(entity, allow, deny, data)?;

    if fields.is_empty() {
        return Err(ValidationError::EmptyUpdate.into());
    }

    let mut qb = QueryBuilder::new(format!("UPDATE {table} SET "));

    let mut sep = qb.separated(", ");
    for (column, value) in fields {
        sep.push(format!("{column} = "));
        push_bind(&mut sep, value);
    }
    drop(sep);

    Ok(qb)
}

/// Appends a WHERE clause built from a filter map.
///
/// Text fields match partially (`LIKE '%value%'`), numeric fields exactly;
/// conditions are joined with `combinator` (customers AND, products OR).
/// Null values are skipped. Returns false (and appends nothing) when every
/// filter value was null, in which case the caller's query stays
/// unconditioned.
pub(crate) fn push_filter_clause(
    qb: &mut QueryBuilder<'static, Sqlite>,
    entity: &str,
    allow: &[FieldSpec],
    filters: &JsonMap,
    combinator: &str,
) -> DbResult<bool> {
    let mut conditions: Vec<(&FieldSpec, BindValue)> = Vec::with_capacity(filters.len());

    for (key, value) in filters {
        let spec = find_spec(entity, allow, key)?;

        if value.is_null() {
            continue;
        }

        conditions.push((spec, coerce(entity, spec, value)?));
    }

    if conditions.is_empty() {
        return Ok(false);
    }

    qb.push(" WHERE ");

    let mut sep = qb.separated(combinator);
    for (spec, value) in conditions {
        match spec.kind {
            FieldKind::Text => {
                let pattern = match value {
                    BindValue::Text(s) => format!("%{s}%"),
                    // coerce() never yields a numeric bind for a Text field
                    _ => unreachable!("text filter coerced to non-text bind"),
                };
                sep.push(format!("{} LIKE ", spec.key));
                sep.push_bind_unseparated(pattern);
            }
            FieldKind::Numeric => {
                sep.push(format!("{} = ", spec.key));
                push_bind(&mut sep, value);
            }
        }
    }

    Ok(true)
}

// =============================================================================
// Unit Tests
// =============================================================================
