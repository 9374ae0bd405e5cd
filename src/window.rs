/// SlidingTable Window Implementation
///
/// A sliding window is a live view over a contiguous run of another table's
/// columns. Rows pass through unchanged. Nothing is cached: every query is
/// answered from the current window parameters and the current state of the
/// underlying table, so edits to the table are visible immediately.

use crate::changeset::{ChangeEvent, ChangeListener, ListenerId, Listeners, SourceId, TableChange};
use crate::config::WindowConfig;
use crate::error::{Result, TableError};
use crate::snapshot::WindowSnapshot;
use crate::table::{CategoryTable, DefaultCategoryTable, SharedTable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

/// Maximum width meaning "every column from the first index to the end".
pub const UNBOUNDED: usize = usize::MAX;

/// Effective underlying column range for a window.
///
/// The range is `[max(first_index, 0), min(column_count, first_index + max_width))`.
/// An empty or inverted range collapses to an empty range; it never fails.
///
/// ```
/// use slidingtable::{window_range, UNBOUNDED};
///
/// assert_eq!(window_range(1, 2, 4), 1..3);
/// assert_eq!(window_range(2, 5, 2).len(), 0);
/// assert_eq!(window_range(-1, 3, 4), 0..2);
/// assert_eq!(window_range(1, UNBOUNDED, 4), 1..4);
/// ```
pub fn window_range(first_index: i64, max_width: usize, column_count: usize) -> Range<usize> {
    let n = column_count as i128;
    let start = (first_index as i128).max(0);
    let end = if max_width == UNBOUNDED {
        n
    } else {
        (first_index as i128 + max_width as i128).min(n)
    };

    if start >= end {
        let empty_at = start.min(n) as usize;
        empty_at..empty_at
    } else {
        start as usize..end as usize
    }
}

/// A window over a contiguous range of an underlying table's columns.
///
/// The window shares the underlying table (it holds an `Rc` handle, never a
/// copy), re-publishes the table's change events under its own `SourceId`, and
/// publishes an event of its own whenever its parameters are set.
///
/// Column keys outside the window are invisible: `get_column_index` returns
/// `None` for them and `get_value` fails with `UnknownKey`, exactly as for a key
/// the underlying table has never seen.
///
/// # Examples
///
/// ```
/// use slidingtable::{DefaultCategoryTable, SlidingWindow};
/// use std::rc::Rc;
///
/// let table = Rc::new(DefaultCategoryTable::new());
/// for (i, column) in ["C1", "C2", "C3", "C4"].iter().enumerate() {
///     table.add_value((i + 1) as f64, "R1", column);
/// }
///
/// let window = SlidingWindow::new(table.clone(), 1, 2);
/// assert_eq!(window.column_count(), 2);
/// assert_eq!(window.get_column_keys(), vec!["C2", "C3"]);
/// assert_eq!(window.get_value("R1", "C3").unwrap(), Some(3.0));
/// assert!(window.get_value("R1", "C4").unwrap_err().is_unknown_key());
///
/// // Edits to the table show through immediately
/// table.add_value(5.0, "R2", "C2");
/// assert_eq!(window.row_count(), 2);
/// ```
pub struct SlidingWindow {
    id: SourceId,
    underlying: SharedTable,
    first_index: Cell<i64>,
    max_width: Cell<usize>,
    listeners: Rc<Listeners>,
    /// Registration of the relay on the underlying table
    relay: ListenerId,
}

impl SlidingWindow {
    /// Create a window over `underlying` starting at `first_index` and showing
    /// at most `max_width` columns (`UNBOUNDED` for no limit).
    pub fn new(underlying: SharedTable, first_index: i64, max_width: usize) -> Self {
        let id = SourceId::next();
        let listeners = Rc::new(Listeners::new());
        let relay = attach_relay(&underlying, id, &listeners);

        log::debug!(
            "window {} created over table {} (first_index={}, max_width={})",
            id,
            underlying.id(),
            first_index,
            max_width
        );

        SlidingWindow {
            id,
            underlying,
            first_index: Cell::new(first_index),
            max_width: Cell::new(max_width),
            listeners,
            relay,
        }
    }

    pub fn with_config(underlying: SharedTable, config: &WindowConfig) -> Self {
        Self::new(underlying, config.first_index, config.max_width_or_unbounded())
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    /// The shared handle to the wrapped table.
    pub fn underlying(&self) -> &SharedTable {
        &self.underlying
    }

    pub fn first_index(&self) -> i64 {
        self.first_index.get()
    }

    pub fn max_width(&self) -> usize {
        self.max_width.get()
    }

    pub fn config(&self) -> WindowConfig {
        WindowConfig::from_parameters(self.first_index(), self.max_width())
    }

    /// Set the first visible underlying column index.
    ///
    /// Always notifies listeners, even when the value does not change.
    pub fn set_first_index(&self, first_index: i64) {
        self.first_index.set(first_index);
        log::debug!("window {} first_index set to {}", self.id, first_index);
        self.fire_window_changed();
    }

    /// Set the maximum number of visible columns.
    ///
    /// Always notifies listeners, even when the value does not change.
    pub fn set_max_width(&self, max_width: usize) {
        self.max_width.set(max_width);
        log::debug!("window {} max_width set to {}", self.id, max_width);
        self.fire_window_changed();
    }

    /// Current effective range of underlying column indices.
    pub fn window_range(&self) -> Range<usize> {
        window_range(
            self.first_index(),
            self.max_width(),
            self.underlying.column_count(),
        )
    }

    pub fn column_count(&self) -> usize {
        self.window_range().len()
    }

    pub fn row_count(&self) -> usize {
        self.underlying.row_count()
    }

    /// Column key at window position `index`.
    pub fn get_column_key(&self, index: usize) -> Result<String> {
        let range = self.window_range();
        if index >= range.len() {
            return Err(TableError::index_out_of_range(index, range.len()));
        }
        self.underlying.get_column_key(range.start + index)
    }

    /// Window position of a column key, or `None` if the key is unknown or
    /// lies outside the window.
    pub fn get_column_index(&self, key: &str) -> Option<usize> {
        let range = self.window_range();
        self.underlying
            .get_column_index(key)
            .filter(|index| range.contains(index))
            .map(|index| index - range.start)
    }

    pub fn get_row_key(&self, index: usize) -> Result<String> {
        self.underlying.get_row_key(index)
    }

    pub fn get_row_index(&self, key: &str) -> Option<usize> {
        self.underlying.get_row_index(key)
    }

    pub fn get_row_keys(&self) -> Vec<String> {
        self.underlying.get_row_keys()
    }

    /// Visible column keys in underlying order.
    pub fn get_column_keys(&self) -> Vec<String> {
        self.window_range()
            .filter_map(|index| self.underlying.get_column_key(index).ok())
            .collect()
    }

    pub fn get_value(&self, row_key: &str, column_key: &str) -> Result<Option<f64>> {
        if self.get_column_index(column_key).is_none() {
            return Err(TableError::unknown_key(column_key));
        }
        self.underlying.get_value(row_key, column_key)
    }

    /// Value at an underlying row position and a window column position.
    pub fn get_value_by_index(&self, row: usize, column: usize) -> Result<Option<f64>> {
        let range = self.window_range();
        if column >= range.len() {
            return Err(TableError::index_out_of_range(column, range.len()));
        }
        self.underlying.get_value_by_index(row, range.start + column)
    }

    pub fn add_listener(&self, listener: Rc<dyn ChangeListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Independent copy: the underlying table is duplicated (recursively, for
    /// stacked windows) and the window parameters are copied. The copy starts
    /// with no listeners.
    pub fn duplicate(&self) -> Result<SlidingWindow> {
        let underlying = self.underlying.duplicate()?;
        log::debug!(
            "window {} duplicated table {} as {}",
            self.id,
            self.underlying.id(),
            underlying.id()
        );
        Ok(SlidingWindow::new(
            underlying,
            self.first_index(),
            self.max_width(),
        ))
    }

    /// Window parameters plus a snapshot of the underlying table's content.
    pub fn to_snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            first_index: self.first_index(),
            max_width: self.max_width(),
            table: self.underlying.snapshot(),
        }
    }

    /// Rebuild a window that owns a fresh `DefaultCategoryTable`.
    pub fn from_snapshot(snapshot: WindowSnapshot) -> Result<Self> {
        let table = DefaultCategoryTable::from_snapshot(snapshot.table)?;
        Ok(SlidingWindow::new(
            Rc::new(table),
            snapshot.first_index,
            snapshot.max_width,
        ))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = self.to_snapshot().to_bytes()?;
        log::debug!("window {} persisted ({} bytes)", self.id, bytes.len());
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_snapshot(WindowSnapshot::from_bytes(bytes)?)
    }

    fn fire_window_changed(&self) {
        let change = TableChange::WindowChanged {
            first_index: self.first_index(),
            max_width: self.max_width(),
        };
        self.listeners.notify(&ChangeEvent::new(self.id, change));
    }
}

/// Subscribe to `underlying` and re-publish its events through `listeners`
/// with `id` as the source.
fn attach_relay(underlying: &SharedTable, id: SourceId, listeners: &Rc<Listeners>) -> ListenerId {
    let target = Rc::downgrade(listeners);
    underlying.add_listener(Rc::new(move |event: &ChangeEvent| {
        if let Some(listeners) = target.upgrade() {
            if event.change().is_structural() {
                log::debug!("window {} relaying {:?} from {}", id, event.change(), event.source());
            }
            listeners.notify(&event.relayed_by(id));
        }
    }))
}

impl Drop for SlidingWindow {
    fn drop(&mut self) {
        self.underlying.remove_listener(self.relay);
    }
}

/// Windows are equal when their parameters match and their underlying tables
/// have the same content. Table identity is not compared.
impl PartialEq for SlidingWindow {
    fn eq(&self, other: &Self) -> bool {
        self.first_index() == other.first_index()
            && self.max_width() == other.max_width()
            && self.underlying.same_content(other.underlying.as_ref())
    }
}

impl fmt::Debug for SlidingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SlidingWindow {{ id: {}, first_index: {}, max_width: {}, columns: {}, rows: {} }}",
            self.id,
            self.first_index(),
            self.max_width(),
            self.column_count(),
            self.row_count()
        )
    }
}

impl Serialize for SlidingWindow {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SlidingWindow {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let snapshot = WindowSnapshot::deserialize(deserializer)?;
        SlidingWindow::from_snapshot(snapshot).map_err(serde::de::Error::custom)
    }
}

/// A window is itself a table, so windows can be stacked.
impl CategoryTable for SlidingWindow {
    fn id(&self) -> SourceId {
        self.id
    }

    fn row_count(&self) -> usize {
        self.underlying.row_count()
    }

    fn column_count(&self) -> usize {
        self.window_range().len()
    }

    fn get_row_key(&self, index: usize) -> Result<String> {
        self.underlying.get_row_key(index)
    }

    fn get_column_key(&self, index: usize) -> Result<String> {
        SlidingWindow::get_column_key(self, index)
    }

    fn get_row_index(&self, key: &str) -> Option<usize> {
        self.underlying.get_row_index(key)
    }

    fn get_column_index(&self, key: &str) -> Option<usize> {
        SlidingWindow::get_column_index(self, key)
    }

    fn get_value(&self, row_key: &str, column_key: &str) -> Result<Option<f64>> {
        SlidingWindow::get_value(self, row_key, column_key)
    }

    fn get_value_by_index(&self, row: usize, column: usize) -> Result<Option<f64>> {
        SlidingWindow::get_value_by_index(self, row, column)
    }

    fn duplicate(&self) -> Result<SharedTable> {
        let copy: SharedTable = Rc::new(SlidingWindow::duplicate(self)?);
        Ok(copy)
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
}
