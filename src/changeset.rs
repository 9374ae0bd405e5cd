/// Changeset - Change Notification for SlidingTable
///
/// This module defines the events tables and windows publish when they change,
/// and the listener registry that delivers them.
///
/// # Design Philosophy
///
/// Tables push changes to their listeners synchronously, in registration order.
/// A sliding window subscribes to its underlying table and re-publishes every
/// event under its own `SourceId`, so listeners attached to the window always
/// see the window as the origin.
///
/// # Change Types
///
/// - `ValueChanged`: A cell was written (the row/column may be new)
/// - `RowRemoved` / `ColumnRemoved`: A key and its cells were dropped
/// - `Cleared`: The table lost every key
/// - `WindowChanged`: A window's first index or maximum width was set

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an event source (a table or a window instance).
///
/// Ids are unique within the process; duplicates and reloaded copies get
/// fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Describes a single change to a table or window.
#[derive(Debug, Clone, PartialEq)]
pub enum TableChange {
    /// A cell value was set, added, incremented or cleared
    ValueChanged { row: String, column: String },

    /// A row and all of its cells were removed
    RowRemoved { row: String },

    /// A column and all of its cells were removed
    ColumnRemoved { column: String },

    /// Every row and column was removed
    Cleared,

    /// A sliding window's parameters were set (values after the change)
    WindowChanged { first_index: i64, max_width: usize },
}

impl TableChange {
    /// Returns true if this change may alter the set or order of keys
    pub fn is_structural(&self) -> bool {
        !matches!(self, TableChange::ValueChanged { .. })
    }
}

/// A change together with the instance that published it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    source: SourceId,
    change: TableChange,
}

impl ChangeEvent {
    pub fn new(source: SourceId, change: TableChange) -> Self {
        ChangeEvent { source, change }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn change(&self) -> &TableChange {
        &self.change
    }

    /// Re-attribute this event to another source, keeping the change.
    pub fn relayed_by(&self, source: SourceId) -> Self {
        ChangeEvent {
            source,
            change: self.change.clone(),
        }
    }
}

/// Receives change events from a table or window.
pub trait ChangeListener {
    fn table_changed(&self, event: &ChangeEvent);
}

impl<F> ChangeListener for F
where
    F: Fn(&ChangeEvent),
{
    fn table_changed(&self, event: &ChangeEvent) {
        self(event)
    }
}

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered listener registry.
///
/// All methods take `&self` so a registry can live inside a shared table.
#[derive(Default)]
pub struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Rc<dyn ChangeListener>)>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it will be called after all earlier registrations
    pub fn add(&self, listener: Rc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    /// Unregister a listener. Returns false if the id is not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Deliver an event to every listener in registration order.
    ///
    /// Dispatch iterates over a snapshot of the registry, so listeners may
    /// add or remove registrations while being notified.
    pub fn notify(&self, event: &ChangeEvent) {
        let snapshot: Vec<Rc<dyn ChangeListener>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        log::trace!(
            "dispatching {:?} from {} to {} listener(s)",
            event.change(),
            event.source(),
            snapshot.len()
        );

        for listener in snapshot {
            listener.table_changed(event);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listeners {{ count: {} }}", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Rc<dyn ChangeListener>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_for_factory = log.clone();
        let factory = move |tag: &str| -> Rc<dyn ChangeListener> {
            let log = log_for_factory.clone();
            let tag = tag.to_string();
            Rc::new(move |_event: &ChangeEvent| log.borrow_mut().push(tag.clone()))
        };
        (log, factory)
    }

    #[test]
    fn test_source_ids_are_unique() {
        let a = SourceId::next();
        let b = SourceId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_notify_in_registration_order() {
        let (log, make) = recorder();
        let listeners = Listeners::new();
        listeners.add(make("first"));
        listeners.add(make("second"));
        listeners.add(make("third"));

        listeners.notify(&ChangeEvent::new(SourceId::next(), TableChange::Cleared));

        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remove_listener() {
        let (log, make) = recorder();
        let listeners = Listeners::new();
        let a = listeners.add(make("a"));
        listeners.add(make("b"));
        assert_eq!(listeners.len(), 2);

        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        assert_eq!(listeners.len(), 1);

        listeners.notify(&ChangeEvent::new(SourceId::next(), TableChange::Cleared));
        assert_eq!(*log.borrow(), vec!["b"]);
    }

    #[test]
    fn test_listener_can_unregister_during_dispatch() {
        let listeners = Rc::new(Listeners::new());
        let calls = Rc::new(Cell::new(0));
        let own_id: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let registry = Rc::downgrade(&listeners);
        let counter = calls.clone();
        let id_slot = own_id.clone();
        let id = listeners.add(Rc::new(move |_event: &ChangeEvent| {
            counter.set(counter.get() + 1);
            if let (Some(registry), Some(id)) = (registry.upgrade(), id_slot.get()) {
                registry.remove(id);
            }
        }));
        own_id.set(Some(id));

        let event = ChangeEvent::new(SourceId::next(), TableChange::Cleared);
        listeners.notify(&event);
        listeners.notify(&event);

        assert_eq!(calls.get(), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_relayed_event_keeps_change() {
        let table = SourceId::next();
        let window = SourceId::next();
        let event = ChangeEvent::new(
            table,
            TableChange::ValueChanged {
                row: "R1".to_string(),
                column: "C1".to_string(),
            },
        );

        let relayed = event.relayed_by(window);
        assert_eq!(relayed.source(), window);
        assert_eq!(relayed.change(), event.change());
        assert!(!relayed.change().is_structural());
        assert!(TableChange::Cleared.is_structural());
    }
}
