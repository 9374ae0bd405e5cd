/// SlidingTable Table Implementation
///
/// A category table is a keyed two-dimensional dataset: an ordered list of row
/// keys, an ordered list of column keys, and an optional numeric value for every
/// (row, column) pair. `CategoryTable` is the access contract windows and other
/// views read through; `DefaultCategoryTable` is the in-memory implementation.

use crate::changeset::{ChangeEvent, ChangeListener, ListenerId, Listeners, SourceId, TableChange};
use crate::error::{Result, TableError};
use crate::snapshot::TableSnapshot;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to any table implementation.
pub type SharedTable = Rc<dyn CategoryTable>;

/// Read access, equality, duplication and change notification for a keyed
/// two-dimensional table.
///
/// Positions are zero-based. Key lookups return `None` when the key is absent.
pub trait CategoryTable {
    /// Identity used as the source of this table's change events.
    fn id(&self) -> SourceId;

    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    /// Returns the row key at `index`, or `IndexOutOfRange`.
    fn get_row_key(&self, index: usize) -> Result<String>;

    /// Returns the column key at `index`, or `IndexOutOfRange`.
    fn get_column_key(&self, index: usize) -> Result<String>;

    fn get_row_index(&self, key: &str) -> Option<usize>;

    fn get_column_index(&self, key: &str) -> Option<usize>;

    /// Returns the cell value for a pair of keys.
    ///
    /// Fails with `UnknownKey` if either key does not resolve.
    fn get_value(&self, row_key: &str, column_key: &str) -> Result<Option<f64>>;

    /// Returns the cell value at a pair of positions, or `IndexOutOfRange`.
    fn get_value_by_index(&self, row: usize, column: usize) -> Result<Option<f64>>;

    /// Returns an independent deep copy behind a new shared handle.
    ///
    /// The copy has a fresh `SourceId` and no listeners.
    fn duplicate(&self) -> Result<SharedTable>;

    fn add_listener(&self, listener: Rc<dyn ChangeListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Downcast support for recovering the concrete table behind a handle.
    fn as_any(&self) -> &dyn Any;

    fn get_row_keys(&self) -> Vec<String> {
        (0..self.row_count())
            .filter_map(|i| self.get_row_key(i).ok())
            .collect()
    }

    fn get_column_keys(&self) -> Vec<String> {
        (0..self.column_count())
            .filter_map(|i| self.get_column_key(i).ok())
            .collect()
    }

    /// Copy the current keys and values out into an owned snapshot.
    fn snapshot(&self) -> TableSnapshot {
        let row_keys = self.get_row_keys();
        let column_keys = self.get_column_keys();
        let values = (0..row_keys.len())
            .map(|row| {
                (0..column_keys.len())
                    .map(|col| self.get_value_by_index(row, col).ok().flatten())
                    .collect()
            })
            .collect();

        TableSnapshot {
            row_keys,
            column_keys,
            values,
        }
    }

    /// Structural equality: same row keys, same column keys (both in order)
    /// and the same value in every cell. Cells compare with `same_cell`, so a
    /// NaN cell equals a NaN cell.
    fn same_content(&self, other: &dyn CategoryTable) -> bool {
        let rows = self.row_count();
        let cols = self.column_count();
        if rows != other.row_count() || cols != other.column_count() {
            return false;
        }
        if self.get_row_keys() != other.get_row_keys()
            || self.get_column_keys() != other.get_column_keys()
        {
            return false;
        }

        for row in 0..rows {
            for col in 0..cols {
                let ours = self.get_value_by_index(row, col).ok().flatten();
                let theirs = other.get_value_by_index(row, col).ok().flatten();
                if !same_cell(ours, theirs) {
                    return false;
                }
            }
        }
        true
    }
}

/// Cell equality by value, with every NaN equal to every other NaN.
///
/// Unlike `==` on `f64` this is reflexive, and it keeps `0.0` and `-0.0`
/// apart.
pub fn same_cell(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for dyn CategoryTable {
    fn eq(&self, other: &Self) -> bool {
        self.same_content(other)
    }
}

impl fmt::Debug for dyn CategoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CategoryTable {{ id: {}, rows: {}, columns: {} }}",
            self.id(),
            self.row_count(),
            self.column_count()
        )
    }
}

/// Dense key/value storage behind `DefaultCategoryTable`.
///
/// `rows[r].len() == column_keys.len()` for every row.
#[derive(Debug, Clone, Default)]
struct KeyedValues {
    row_keys: Vec<String>,
    column_keys: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl KeyedValues {
    fn row_index(&self, key: &str) -> Option<usize> {
        self.row_keys.iter().position(|k| k == key)
    }

    fn column_index(&self, key: &str) -> Option<usize> {
        self.column_keys.iter().position(|k| k == key)
    }

    fn cell(&self, row: usize, col: usize) -> Result<Option<f64>> {
        let cells = self
            .rows
            .get(row)
            .ok_or_else(|| TableError::index_out_of_range(row, self.rows.len()))?;
        cells
            .get(col)
            .copied()
            .ok_or_else(|| TableError::index_out_of_range(col, self.column_keys.len()))
    }

    fn ensure_row(&mut self, key: &str) -> usize {
        if let Some(idx) = self.row_index(key) {
            return idx;
        }
        self.row_keys.push(key.to_string());
        self.rows.push(vec![None; self.column_keys.len()]);
        self.rows.len() - 1
    }

    fn ensure_column(&mut self, key: &str) -> usize {
        if let Some(idx) = self.column_index(key) {
            return idx;
        }
        self.column_keys.push(key.to_string());
        for row in self.rows.iter_mut() {
            row.push(None);
        }
        self.column_keys.len() - 1
    }

    fn set(&mut self, value: Option<f64>, row_key: &str, column_key: &str) {
        let col = self.ensure_column(column_key);
        let row = self.ensure_row(row_key);
        self.rows[row][col] = value;
    }

    fn remove_row_at(&mut self, index: usize) -> String {
        self.rows.remove(index);
        self.row_keys.remove(index)
    }

    fn remove_column_at(&mut self, index: usize) -> String {
        for row in self.rows.iter_mut() {
            row.remove(index);
        }
        self.column_keys.remove(index)
    }

    /// Drop the row and/or column at the given positions if every one of
    /// their cells is empty, returning the removed keys. The column check runs
    /// against the table left after any row removal.
    fn prune_empty(&mut self, row: usize, col: usize) -> (Option<String>, Option<String>) {
        let removed_row = if self.rows[row].iter().all(Option::is_none) {
            Some(self.remove_row_at(row))
        } else {
            None
        };
        let removed_column = if self.rows.iter().all(|cells| cells[col].is_none()) {
            Some(self.remove_column_at(col))
        } else {
            None
        };
        (removed_row, removed_column)
    }
}

/// In-memory category table with interior mutability.
///
/// All mutators take `&self`, so a table can be shared through `Rc` handles by
/// any number of windows while the owner keeps editing it. Every successful
/// mutation publishes one `ChangeEvent` after internal borrows are released, so
/// listeners are free to query the table from inside their callback. The one
/// exception is `remove_value`, which publishes a removal event for each key
/// it prunes.
///
/// Keys are kept in insertion order; writing to an unknown key appends it.
///
/// # Examples
///
/// ```
/// use slidingtable::{CategoryTable, DefaultCategoryTable};
///
/// let table = DefaultCategoryTable::new();
/// table.add_value(1.0, "R1", "C1");
/// table.add_value(2.0, "R1", "C2");
///
/// assert_eq!(table.column_count(), 2);
/// assert_eq!(table.get_column_index("C2"), Some(1));
/// assert_eq!(table.get_value("R1", "C2").unwrap(), Some(2.0));
/// ```
pub struct DefaultCategoryTable {
    id: SourceId,
    data: RefCell<KeyedValues>,
    listeners: Listeners,
}

impl DefaultCategoryTable {
    pub fn new() -> Self {
        DefaultCategoryTable {
            id: SourceId::next(),
            data: RefCell::new(KeyedValues::default()),
            listeners: Listeners::new(),
        }
    }

    /// Build a table from a persisted snapshot.
    pub fn from_snapshot(snapshot: TableSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let TableSnapshot {
            row_keys,
            column_keys,
            values,
        } = snapshot;

        Ok(DefaultCategoryTable {
            id: SourceId::next(),
            data: RefCell::new(KeyedValues {
                row_keys,
                column_keys,
                rows: values,
            }),
            listeners: Listeners::new(),
        })
    }

    /// Store a value, creating the row and column keys if needed.
    pub fn add_value(&self, value: f64, row_key: &str, column_key: &str) {
        self.set_value(Some(value), row_key, column_key);
    }

    /// Store an optional value, creating the row and column keys if needed.
    pub fn set_value(&self, value: Option<f64>, row_key: &str, column_key: &str) {
        self.data.borrow_mut().set(value, row_key, column_key);
        self.fire(TableChange::ValueChanged {
            row: row_key.to_string(),
            column: column_key.to_string(),
        });
    }

    /// Add `delta` to an existing cell. An empty cell counts as zero.
    pub fn increment_value(&self, delta: f64, row_key: &str, column_key: &str) -> Result<()> {
        let current = self.get_value(row_key, column_key)?;
        self.set_value(Some(current.unwrap_or(0.0) + delta), row_key, column_key);
        Ok(())
    }

    /// Clear a cell. A row or column left with only empty cells is removed.
    ///
    /// Publishes `ValueChanged` when nothing was pruned, otherwise `RowRemoved`
    /// and/or `ColumnRemoved` for the pruned keys (row first).
    pub fn remove_value(&self, row_key: &str, column_key: &str) -> Result<()> {
        let (removed_row, removed_column) = {
            let mut data = self.data.borrow_mut();
            let row = data
                .row_index(row_key)
                .ok_or_else(|| TableError::unknown_key(row_key))?;
            let col = data
                .column_index(column_key)
                .ok_or_else(|| TableError::unknown_key(column_key))?;
            data.rows[row][col] = None;
            data.prune_empty(row, col)
        };

        if removed_row.is_none() && removed_column.is_none() {
            self.fire(TableChange::ValueChanged {
                row: row_key.to_string(),
                column: column_key.to_string(),
            });
            return Ok(());
        }
        if let Some(row) = removed_row {
            log::debug!("table {} pruned empty row '{}'", self.id, row);
            self.fire(TableChange::RowRemoved { row });
        }
        if let Some(column) = removed_column {
            log::debug!("table {} pruned empty column '{}'", self.id, column);
            self.fire(TableChange::ColumnRemoved { column });
        }
        Ok(())
    }

    pub fn remove_row(&self, key: &str) -> Result<()> {
        let index = self
            .data
            .borrow()
            .row_index(key)
            .ok_or_else(|| TableError::unknown_key(key))?;
        self.remove_row_at(index)
    }

    pub fn remove_row_at(&self, index: usize) -> Result<()> {
        let removed = {
            let mut data = self.data.borrow_mut();
            if index >= data.row_keys.len() {
                return Err(TableError::index_out_of_range(index, data.row_keys.len()));
            }
            data.remove_row_at(index)
        };
        log::debug!("table {} removed row '{}'", self.id, removed);
        self.fire(TableChange::RowRemoved { row: removed });
        Ok(())
    }

    pub fn remove_column(&self, key: &str) -> Result<()> {
        let index = self
            .data
            .borrow()
            .column_index(key)
            .ok_or_else(|| TableError::unknown_key(key))?;
        self.remove_column_at(index)
    }

    pub fn remove_column_at(&self, index: usize) -> Result<()> {
        let removed = {
            let mut data = self.data.borrow_mut();
            if index >= data.column_keys.len() {
                return Err(TableError::index_out_of_range(
                    index,
                    data.column_keys.len(),
                ));
            }
            data.remove_column_at(index)
        };
        log::debug!("table {} removed column '{}'", self.id, removed);
        self.fire(TableChange::ColumnRemoved { column: removed });
        Ok(())
    }

    /// Remove every row, column and value.
    pub fn clear(&self) {
        *self.data.borrow_mut() = KeyedValues::default();
        log::debug!("table {} cleared", self.id);
        self.fire(TableChange::Cleared);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn fire(&self, change: TableChange) {
        self.listeners.notify(&ChangeEvent::new(self.id, change));
    }
}

impl Default for DefaultCategoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning copies keys and values only: the clone gets a fresh `SourceId`
/// and starts with no listeners.
impl Clone for DefaultCategoryTable {
    fn clone(&self) -> Self {
        DefaultCategoryTable {
            id: SourceId::next(),
            data: RefCell::new(self.data.borrow().clone()),
            listeners: Listeners::new(),
        }
    }
}

impl CategoryTable for DefaultCategoryTable {
    fn id(&self) -> SourceId {
        self.id
    }

    fn row_count(&self) -> usize {
        self.data.borrow().row_keys.len()
    }

    fn column_count(&self) -> usize {
        self.data.borrow().column_keys.len()
    }

    fn get_row_key(&self, index: usize) -> Result<String> {
        let data = self.data.borrow();
        data.row_keys
            .get(index)
            .cloned()
            .ok_or_else(|| TableError::index_out_of_range(index, data.row_keys.len()))
    }

    fn get_column_key(&self, index: usize) -> Result<String> {
        let data = self.data.borrow();
        data.column_keys
            .get(index)
            .cloned()
            .ok_or_else(|| TableError::index_out_of_range(index, data.column_keys.len()))
    }

    fn get_row_index(&self, key: &str) -> Option<usize> {
        self.data.borrow().row_index(key)
    }

    fn get_column_index(&self, key: &str) -> Option<usize> {
        self.data.borrow().column_index(key)
    }

    fn get_value(&self, row_key: &str, column_key: &str) -> Result<Option<f64>> {
        let data = self.data.borrow();
        let row = data
            .row_index(row_key)
            .ok_or_else(|| TableError::unknown_key(row_key))?;
        let col = data
            .column_index(column_key)
            .ok_or_else(|| TableError::unknown_key(column_key))?;
        data.cell(row, col)
    }

    fn get_value_by_index(&self, row: usize, column: usize) -> Result<Option<f64>> {
        self.data.borrow().cell(row, column)
    }

    fn duplicate(&self) -> Result<SharedTable> {
        Ok(Rc::new(self.clone()))
    }

    fn add_listener(&self, listener: Rc<dyn ChangeListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_row_keys(&self) -> Vec<String> {
        self.data.borrow().row_keys.clone()
    }

    fn get_column_keys(&self) -> Vec<String> {
        self.data.borrow().column_keys.clone()
    }

    fn snapshot(&self) -> TableSnapshot {
        let data = self.data.borrow();
        TableSnapshot {
            row_keys: data.row_keys.clone(),
            column_keys: data.column_keys.clone(),
            values: data.rows.clone(),
        }
    }
}

impl PartialEq for DefaultCategoryTable {
    fn eq(&self, other: &Self) -> bool {
        self.same_content(other)
    }
}

impl fmt::Debug for DefaultCategoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        write!(
            f,
            "DefaultCategoryTable {{ id: {}, rows: {}, columns: {} }}",
            self.id,
            data.row_keys.len(),
            data.column_keys.len()
        )
    }
}
