//! Generic CRUD and index-query primitives over entity collections.
//!
//! Every primitive takes a `&Connection`, so it runs in SQLite's implicit
//! per-statement transaction on its own, or composes with other primitives
//! inside `Database::transaction`.

use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params_from_iter, Connection, Row, ToSql};
use hl_core::error::{HlError, HlResult};

use crate::schema::{self, Collection, IndexDef};

/// A typed entity stored in one collection, keyed by a text `id`.
pub trait Entity: Sized {
    /// Collection that holds this entity.
    const COLLECTION: Collection;

    /// Primary key.
    fn id(&self) -> &str;

    /// Construct the entity from a `SELECT *` row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Column names and values to persist, including `id`.
    fn to_columns(&self) -> HlResult<Vec<(&'static str, Value)>>;
}

/// One component of an index key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    Text(String),
    Integer(i64),
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Text(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Text(s)
    }
}

impl From<i64> for KeyPart {
    fn from(n: i64) -> Self {
        KeyPart::Integer(n)
    }
}

impl ToSql for KeyPart {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            KeyPart::Text(s) => s.to_sql(),
            KeyPart::Integer(n) => n.to_sql(),
        }
    }
}

/// An index key: one part per leading indexed column.
pub type Key = Vec<KeyPart>;

/// One end of a `KeyRange`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBound {
    pub key: Key,
    /// Exclude the bound itself.
    pub open: bool,
}

/// A range over an index's key space.
///
/// Keys may be shorter than the index: a key of length `n` is compared with
/// the index's first `n` columns, so `only(vec![user_id])` on a
/// `(user_id, created_at)` index selects every record of that user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Option<KeyBound>,
    pub upper: Option<KeyBound>,
}

impl KeyRange {
    /// The whole index.
    pub fn all() -> Self {
        Self::default()
    }

    /// Exactly `key`.
    pub fn only(key: Key) -> Self {
        Self::bound(key.clone(), key)
    }

    /// `lower <= k <= upper`.
    pub fn bound(lower: Key, upper: Key) -> Self {
        Self {
            lower: Some(KeyBound { key: lower, open: false }),
            upper: Some(KeyBound { key: upper, open: false }),
        }
    }

    /// `k >= lower`, or `k > lower` when `open`.
    pub fn lower_bound(key: Key, open: bool) -> Self {
        Self {
            lower: Some(KeyBound { key, open }),
            upper: None,
        }
    }

    /// `k <= upper`, or `k < upper` when `open`.
    pub fn upper_bound(key: Key, open: bool) -> Self {
        Self {
            lower: None,
            upper: Some(KeyBound { key, open }),
        }
    }
}

/// Fetch one entity by id.
pub fn get<E: Entity>(conn: &Connection, id: &str) -> HlResult<Option<E>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?1", E::COLLECTION.table());
    match conn.query_row(&sql, [id], E::from_row) {
        Ok(entity) => Ok(Some(entity)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(aborted(e)),
    }
}

/// Fetch every entity of a collection in insertion order, optionally filtered.
pub fn get_all<E: Entity>(conn: &Connection, filter: Option<&dyn Fn(&E) -> bool>) -> HlResult<Vec<E>> {
    let sql = format!("SELECT * FROM {} ORDER BY rowid", E::COLLECTION.table());
    let mut stmt = conn.prepare(&sql).map_err(aborted)?;
    let all = stmt
        .query_map([], E::from_row)
        .map_err(aborted)?
        .collect::<rusqlite::Result<Vec<E>>>()
        .map_err(aborted)?;

    Ok(match filter {
        Some(keep) => all.into_iter().filter(|e| keep(e)).collect(),
        None => all,
    })
}

/// Fetch the entities whose key in `index_name` falls within `range`,
/// ordered by that key.
pub fn query_by_index<E: Entity>(conn: &Connection, index_name: &str, range: &KeyRange) -> HlResult<Vec<E>> {
    let index = schema::find_index(index_name)
        .filter(|idx| idx.collection == E::COLLECTION)
        .ok_or_else(|| {
            HlError::Validation(format!("no index {index_name} on {}", E::COLLECTION))
        })?;

    let mut clauses = Vec::new();
    let mut params: Vec<&KeyPart> = Vec::new();
    if let Some(lower) = &range.lower {
        let op = if lower.open { ">" } else { ">=" };
        clauses.push(compare_clause(index, &lower.key, op, &mut params)?);
    }
    if let Some(upper) = &range.upper {
        let op = if upper.open { "<" } else { "<=" };
        clauses.push(compare_clause(index, &upper.key, op, &mut params)?);
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT * FROM {} {where_clause} ORDER BY {}, rowid",
        E::COLLECTION.table(),
        index.columns.join(", "),
    );

    let mut stmt = conn.prepare(&sql).map_err(aborted)?;
    let rows = stmt
        .query_map(params_from_iter(params), E::from_row)
        .map_err(aborted)?
        .collect::<rusqlite::Result<Vec<E>>>()
        .map_err(aborted)?;
    Ok(rows)
}

/// Row-value comparison of the index's leading columns against `key`.
fn compare_clause<'k>(
    index: &IndexDef,
    key: &'k [KeyPart],
    op: &str,
    params: &mut Vec<&'k KeyPart>,
) -> HlResult<String> {
    if key.is_empty() || key.len() > index.columns.len() {
        return Err(HlError::Validation(format!(
            "key of length {} does not fit index {} ({} columns)",
            key.len(),
            index.name,
            index.columns.len()
        )));
    }
    let start = params.len();
    let placeholders: Vec<String> = (start + 1..=start + key.len())
        .map(|i| format!("?{i}"))
        .collect();
    params.extend(key.iter());
    Ok(format!(
        "({}) {op} ({})",
        index.columns[..key.len()].join(", "),
        placeholders.join(", ")
    ))
}

/// Insert or replace an entity, returning it as stored.
///
/// Existing rows are updated in place, so insertion order is preserved.
pub fn put<E: Entity>(conn: &Connection, entity: E) -> HlResult<E> {
    let columns = entity.to_columns()?;
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    let updates: Vec<String> = names
        .iter()
        .filter(|name| **name != "id")
        .map(|name| format!("{name} = excluded.{name}"))
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        E::COLLECTION.table(),
        names.join(", "),
        placeholders.join(", "),
        updates.join(", "),
    );
    conn.execute(&sql, params_from_iter(columns.iter().map(|(_, value)| value)))
        .map_err(aborted)?;
    Ok(entity)
}

/// Delete an entity by id. Returns whether a row was removed; deleting a
/// missing id is not an error.
pub fn delete<E: Entity>(conn: &Connection, id: &str) -> HlResult<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", E::COLLECTION.table());
    let changed = conn.execute(&sql, [id]).map_err(aborted)?;
    Ok(changed > 0)
}

/// Number of entities in a collection.
pub fn count(conn: &Connection, collection: Collection) -> HlResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    conn.query_row(&sql, [], |row| row.get(0)).map_err(aborted)
}

/// Map an operation failure from the store.
pub(crate) fn aborted(e: rusqlite::Error) -> HlError {
    HlError::TransactionAborted(e.to_string())
}
