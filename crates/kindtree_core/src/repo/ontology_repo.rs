//! Ontology snapshot store contracts and implementations.
//!
//! # Responsibility
//! - Define the full-snapshot load/save contract used by the ontology service.
//! - Keep SQL details and row ordering inside the store boundary.
//!
//! # Invariants
//! - `save_ontology_graph` replaces the whole persisted tree atomically.
//! - `load_ontology_graph` returns `None` until a tree has been saved.
//! - A save followed by a load yields an equal tree, child order included.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::kind::{KindName, OntologyTree, PropertySet};
use log::debug;
use parking_lot::Mutex;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Result type used by ontology store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from ontology store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted rows do not describe a valid tree.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "ontology store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "ontology store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "ontology store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid ontology data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Full-snapshot persistence for the ontology tree.
pub trait OntologyStore {
    /// Loads the last saved tree, or `None` if nothing was ever saved.
    fn load_ontology_graph(&self) -> StoreResult<Option<OntologyTree>>;
    /// Atomically replaces the persisted tree.
    fn save_ontology_graph(&self, tree: &OntologyTree) -> StoreResult<()>;
}

impl<S: OntologyStore + ?Sized> OntologyStore for &S {
    fn load_ontology_graph(&self) -> StoreResult<Option<OntologyTree>> {
        (**self).load_ontology_graph()
    }

    fn save_ontology_graph(&self, tree: &OntologyTree) -> StoreResult<()> {
        (**self).save_ontology_graph(tree)
    }
}

/// SQLite-backed ontology store.
pub struct SqliteOntologyStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOntologyStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl OntologyStore for SqliteOntologyStore<'_> {
    fn load_ontology_graph(&self) -> StoreResult<Option<OntologyTree>> {
        let started_at = Instant::now();
        // Both tables are read under one snapshot so a concurrent save
        // cannot interleave between them.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;

        let records = load_kind_records(&tx)?;
        if records.is_empty() {
            tx.commit()?;
            debug!("event=ontology_load module=repo status=absent");
            return Ok(None);
        }

        let mut properties = load_properties(&tx)?;
        tx.commit()?;

        let tree = OntologyTree::from_preorder(records.into_iter().map(|(name, parent)| {
            let kind_properties = properties.remove(name.as_str()).unwrap_or_default();
            (name, parent, kind_properties)
        }))
        .map_err(|err| StoreError::InvalidData(err.to_string()))?;

        if let Some(orphan) = properties.keys().min() {
            return Err(StoreError::InvalidData(format!(
                "kind_properties references unknown kind `{orphan}`"
            )));
        }

        debug!(
            "event=ontology_load module=repo status=ok kinds={} duration_ms={}",
            tree.kind_count(),
            started_at.elapsed().as_millis()
        );
        Ok(Some(tree))
    }

    fn save_ontology_graph(&self, tree: &OntologyTree) -> StoreResult<()> {
        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM kind_properties;", [])?;
        tx.execute("DELETE FROM kinds;", [])?;
        {
            let mut insert_kind = tx.prepare(
                "INSERT INTO kinds (name, parent_name, position)
                 VALUES (?1, ?2, ?3);",
            )?;
            let mut insert_property = tx.prepare(
                "INSERT INTO kind_properties (kind_name, property)
                 VALUES (?1, ?2);",
            )?;
            for (position, node) in tree.iter_preorder().enumerate() {
                insert_kind.execute(params![
                    node.name().as_str(),
                    node.parent().map(KindName::as_str),
                    position as i64,
                ])?;
                for property in node.properties() {
                    insert_property.execute(params![node.name().as_str(), property])?;
                }
            }
        }
        tx.commit()?;

        debug!(
            "event=ontology_save module=repo status=ok kinds={} duration_ms={}",
            tree.kind_count(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

/// Process-local ontology store without durability.
#[derive(Debug, Default)]
pub struct MemoryOntologyStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Option<OntologyTree>,
    save_count: usize,
}

impl MemoryOntologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `tree`.
    pub fn with_snapshot(tree: OntologyTree) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snapshot: Some(tree),
                save_count: 0,
            }),
        }
    }

    /// Number of successful saves since creation.
    pub fn save_count(&self) -> usize {
        self.state.lock().save_count
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> Option<OntologyTree> {
        self.state.lock().snapshot.clone()
    }
}

impl OntologyStore for MemoryOntologyStore {
    fn load_ontology_graph(&self) -> StoreResult<Option<OntologyTree>> {
        Ok(self.state.lock().snapshot.clone())
    }

    fn save_ontology_graph(&self, tree: &OntologyTree) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.snapshot = Some(tree.clone());
        state.save_count += 1;
        Ok(())
    }
}

fn load_kind_records(conn: &Connection) -> StoreResult<Vec<(KindName, Option<KindName>)>> {
    let mut stmt = conn.prepare(
        "SELECT name, parent_name
         FROM kinds
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let name = parse_kind_name(row.get("name")?, "kinds.name")?;
        let parent = row
            .get::<_, Option<String>>("parent_name")?
            .map(|value| parse_kind_name(value, "kinds.parent_name"))
            .transpose()?;
        records.push((name, parent));
    }
    Ok(records)
}

fn load_properties(conn: &Connection) -> StoreResult<HashMap<String, PropertySet>> {
    let mut stmt = conn.prepare(
        "SELECT kind_name, property
         FROM kind_properties
         ORDER BY kind_name ASC, property ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut properties: HashMap<String, PropertySet> = HashMap::new();
    while let Some(row) = rows.next()? {
        let kind_name: String = row.get("kind_name")?;
        let property: String = row.get("property")?;
        properties.entry(kind_name).or_default().insert(property);
    }
    Ok(properties)
}

fn parse_kind_name(value: String, column: &'static str) -> StoreResult<KindName> {
    let name = KindName::new(&value)
        .map_err(|err| StoreError::InvalidData(format!("{err} in {column}")))?;
    if name.as_str() != value {
        return Err(StoreError::InvalidData(format!(
            "non-normalized kind name `{value}` in {column}"
        )));
    }
    Ok(name)
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 2] = [
        ("kinds", &["name", "parent_name", "position"]),
        ("kind_properties", &["kind_name", "property"]),
    ];
    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{MemoryOntologyStore, OntologyStore};
    use crate::model::kind::{KindName, OntologyTree, PropertySet};

    #[test]
    fn memory_store_starts_absent_and_counts_saves() {
        let store = MemoryOntologyStore::new();
        assert!(store.load_ontology_graph().unwrap().is_none());

        let mut tree = OntologyTree::with_root();
        tree.insert_child(
            &KindName::root(),
            KindName::new("person").unwrap(),
            PropertySet::new(),
        )
        .unwrap();
        store.save_ontology_graph(&tree).unwrap();

        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_ontology_graph().unwrap(), Some(tree));
    }
}
