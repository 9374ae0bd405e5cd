/// Sliding Window Example
///
/// This example demonstrates:
/// - Building a keyed table of monthly figures
/// - Viewing a three-month window over it
/// - Sliding the window as new months arrive
/// - Listening to changes through the window
/// - Duplicating and persisting a window
///
/// Run with `RUST_LOG=debug` to see the library's log output.

use slidingtable::{CategoryTable, ChangeEvent, DefaultCategoryTable, SlidingWindow, WindowConfig};
use std::rc::Rc;

const MONTHS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];

fn print_window(window: &SlidingWindow) {
    let columns = window.get_column_keys();
    println!("   columns: {:?}", columns);
    for row in window.get_row_keys() {
        let values: Vec<String> = columns
            .iter()
            .map(|col| match window.get_value(&row, col) {
                Ok(Some(v)) => format!("{:>7.1}", v),
                Ok(None) => format!("{:>7}", "-"),
                Err(e) => format!("<{}>", e),
            })
            .collect();
        println!("   {:<8}{}", row, values.join(""));
    }
    println!();
}

fn main() {
    env_logger::init();

    println!("=== SlidingTable Window Example ===\n");

    // 1. Build a table with the first four months
    println!("1. Creating sales table...");
    let table = Rc::new(DefaultCategoryTable::new());
    for (i, month) in MONTHS.iter().take(4).enumerate() {
        table.add_value(100.0 + 10.0 * i as f64, "North", month);
        table.add_value(80.0 + 5.0 * i as f64, "South", month);
    }
    println!("   {} rows x {} columns\n", table.row_count(), table.column_count());

    // 2. Three-month window, configured from JSON
    println!("2. Creating a three-month window...");
    let config = match WindowConfig::from_json(r#"{"first_index": 1, "max_width": 3}"#) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid window config: {}", e);
            return;
        }
    };
    let window = SlidingWindow::with_config(table.clone(), &config);
    print_window(&window);

    // 3. Listen through the window
    window.add_listener(Rc::new(|event: &ChangeEvent| {
        println!("   [event from {}] {:?}", event.source(), event.change());
    }));

    // 4. New months arrive; slide to keep the latest three visible
    println!("3. Appending months and sliding...");
    for (i, month) in MONTHS.iter().enumerate().skip(4) {
        table.add_value(100.0 + 10.0 * i as f64, "North", month);
        let latest_start = table.column_count() as i64 - 3;
        window.set_first_index(latest_start);
    }
    print_window(&window);

    // 5. Hidden months are not reachable through the window
    println!("4. Looking up a month outside the window...");
    match window.get_value("North", "Jan") {
        Ok(v) => println!("   unexpected value {:?}", v),
        Err(e) => println!("   {}", e),
    }
    println!();

    // 6. Independent copies
    println!("5. Duplicating and persisting...");
    let copy = match window.duplicate() {
        Ok(copy) => copy,
        Err(e) => {
            eprintln!("duplicate failed: {}", e);
            return;
        }
    };
    let bytes = match window.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("persist failed: {}", e);
            return;
        }
    };
    println!("   persisted window: {} bytes", bytes.len());

    table.set_value(None, "North", "Jun");
    println!("   original == duplicate after edit: {}", window == copy);

    match SlidingWindow::from_bytes(&bytes) {
        Ok(restored) => {
            println!("   restored == duplicate: {}", restored == copy);
            print_window(&restored);
        }
        Err(e) => eprintln!("reload failed: {}", e),
    }
}
