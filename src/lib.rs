//! SlidingTable - Keyed Tables with Live Sliding Column Windows
//!
//! A keyed two-dimensional table (rows × columns of optional numbers) and a
//! sliding window view that exposes a contiguous range of its columns. Windows
//! never copy data: they translate indices on every query, relay the table's
//! change events under their own identity, and can be duplicated or persisted
//! into fully independent copies.

pub mod error;
pub mod changeset;
pub mod table;
pub mod window;
pub mod snapshot;
pub mod config;

pub use error::{Result, TableError};
pub use changeset::{ChangeEvent, ChangeListener, ListenerId, Listeners, SourceId, TableChange};
pub use table::{CategoryTable, DefaultCategoryTable, SharedTable};
pub use window::{window_range, SlidingWindow, UNBOUNDED};
pub use snapshot::{TableSnapshot, WindowSnapshot};
pub use config::WindowConfig;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn quarterly() -> Rc<DefaultCategoryTable> {
        let table = Rc::new(DefaultCategoryTable::new());
        table.add_value(1.0, "R1", "C1");
        table.add_value(2.0, "R1", "C2");
        table.add_value(3.0, "R1", "C3");
        table.add_value(4.0, "R1", "C4");
        table
    }

    fn underlying_of(window: &SlidingWindow) -> &DefaultCategoryTable {
        window
            .underlying()
            .as_any()
            .downcast_ref::<DefaultCategoryTable>()
            .unwrap()
    }

    #[test]
    fn test_complete_workflow() {
        let table = quarterly();
        let window = SlidingWindow::new(table.clone(), 1, 2);

        assert_eq!(window.column_count(), 2);
        assert_eq!(window.get_column_keys(), vec!["C2", "C3"]);
        assert_eq!(window.get_value("R1", "C2").unwrap(), Some(2.0));
        assert_eq!(window.get_value("R1", "C3").unwrap(), Some(3.0));
        assert!(window.get_value("R1", "C1").unwrap_err().is_unknown_key());
        assert!(window.get_value("R1", "C4").unwrap_err().is_unknown_key());

        // Slide right as a chart would when new data arrives
        table.add_value(5.0, "R1", "C5");
        window.set_first_index(window.first_index() + 1);
        assert_eq!(window.get_column_keys(), vec!["C3", "C4"]);

        window.set_first_index(3);
        assert_eq!(window.get_column_keys(), vec!["C4", "C5"]);
        assert_eq!(window.get_value_by_index(0, 1).unwrap(), Some(5.0));
    }

    #[test]
    fn test_window_sizing_examples() {
        let two = Rc::new(DefaultCategoryTable::new());
        two.add_value(1.0, "R1", "C1");
        two.add_value(2.0, "R1", "C2");

        assert_eq!(SlidingWindow::new(two.clone(), 0, 5).column_count(), 2);
        assert_eq!(SlidingWindow::new(two.clone(), 2, 5).column_count(), 0);
        assert_eq!(SlidingWindow::new(quarterly(), 1, 2).column_count(), 2);
    }

    #[test]
    fn test_rows_pass_through() {
        let table = quarterly();
        let window = SlidingWindow::new(table.clone(), 3, 1);
        table.add_value(1.0, "R2", "C1");
        table.add_value(1.0, "R3", "C2");

        for (first, width) in [(0, 0), (-4, 1), (2, UNBOUNDED), (100, 3)] {
            window.set_first_index(first);
            window.set_max_width(width);
            assert_eq!(window.row_count(), table.row_count());
            assert_eq!(window.get_row_keys(), table.get_row_keys());
        }
    }

    #[test]
    fn test_equality_follows_identical_mutations() {
        let d1 = SlidingWindow::new(quarterly(), 0, 3);
        let d2 = SlidingWindow::new(quarterly(), 0, 3);
        assert_eq!(d1, d2);

        underlying_of(&d1).remove_column("C2").unwrap();
        assert_ne!(d1, d2);
        underlying_of(&d2).remove_column("C2").unwrap();
        assert_eq!(d1, d2);

        underlying_of(&d1).increment_value(1.0, "R1", "C1").unwrap();
        assert_ne!(d1, d2);
        underlying_of(&d2).increment_value(1.0, "R1", "C1").unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_duplicate_and_persisted_copies_are_independent() {
        let table = quarterly();
        let original = SlidingWindow::new(table.clone(), 1, 2);
        let duplicate = original.duplicate().unwrap();
        let restored = SlidingWindow::from_bytes(&original.to_bytes().unwrap()).unwrap();

        for copy in [&duplicate, &restored] {
            assert_eq!(*copy, original);
            assert_ne!(copy.underlying().id(), table.id());
        }

        underlying_of(&duplicate).add_value(7.0, "R2", "C2");
        underlying_of(&restored).remove_row("R1").unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.get_value("R1", "C2").unwrap(), Some(2.0));
        assert_ne!(duplicate, original);
        assert_ne!(restored, original);

        table.add_value(7.0, "R2", "C2");
        assert_eq!(duplicate, original);
    }

    #[test]
    fn test_many_windows_share_one_table() {
        let table = quarterly();
        let left = SlidingWindow::new(table.clone(), 0, 2);
        let right = SlidingWindow::new(table.clone(), 2, 2);

        let seen = Rc::new(RefCell::new(Vec::new()));
        for window in [&left, &right] {
            let sink = seen.clone();
            window.add_listener(Rc::new(move |event: &ChangeEvent| {
                sink.borrow_mut().push(event.source())
            }));
        }

        table.set_value(None, "R1", "C3");
        assert_eq!(*seen.borrow(), vec![left.id(), right.id()]);
        assert_eq!(right.get_value("R1", "C3").unwrap(), None);
        assert!(left.get_value("R1", "C3").is_err());
    }
}
