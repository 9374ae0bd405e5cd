/// Persisted forms of tables and sliding windows.
///
/// A snapshot is a plain, owned copy of a table's keys and cell values. It is
/// what gets written when a window is persisted, and reloading always builds a
/// fresh table from it, so a reloaded window never shares state with the
/// original.

use crate::error::{Result, TableError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keys and dense cell values of a table, in table order.
///
/// `values[r][c]` is the cell at row `row_keys[r]`, column `column_keys[c]`.
/// Non-finite cells are written as the strings `"NaN"`, `"inf"` and `"-inf"`
/// since JSON numbers cannot hold them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    #[serde(with = "cell_grid")]
    pub values: Vec<Vec<Option<f64>>>,
}

impl TableSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.row_keys.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_keys.len()
    }

    /// Check that keys are unique and the value grid matches the key counts.
    pub fn validate(&self) -> Result<()> {
        check_unique("row", &self.row_keys)?;
        check_unique("column", &self.column_keys)?;

        if self.values.len() != self.row_keys.len() {
            return Err(TableError::InvalidSnapshot {
                message: format!(
                    "{} value rows for {} row keys",
                    self.values.len(),
                    self.row_keys.len()
                ),
            });
        }

        for (row_idx, row) in self.values.iter().enumerate() {
            if row.len() != self.column_keys.len() {
                return Err(TableError::InvalidSnapshot {
                    message: format!(
                        "row {} has {} values, expected {}",
                        row_idx,
                        row.len(),
                        self.column_keys.len()
                    ),
                });
            }
        }

        Ok(())
    }
}

fn check_unique(kind: &str, keys: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(keys.len());
    for key in keys {
        if !seen.insert(key.as_str()) {
            return Err(TableError::InvalidSnapshot {
                message: format!("duplicate {} key '{}'", kind, key),
            });
        }
    }
    Ok(())
}

mod cell_grid {
    use serde::de::{self, Deserializer, Visitor};
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    const NAN: &str = "NaN";
    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";

    struct Cell(Option<f64>);

    impl Serialize for Cell {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self.0 {
                None => serializer.serialize_none(),
                Some(v) if v.is_finite() => serializer.serialize_f64(v),
                Some(v) if v.is_nan() => serializer.serialize_str(NAN),
                Some(v) if v > 0.0 => serializer.serialize_str(INFINITY),
                Some(_) => serializer.serialize_str(NEG_INFINITY),
            }
        }
    }

    struct CellVisitor;

    impl<'de> Visitor<'de> for CellVisitor {
        type Value = Cell;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a number, null, \"{}\", \"{}\" or \"{}\"", NAN, INFINITY, NEG_INFINITY)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Cell, E> {
            Ok(Cell(None))
        }

        fn visit_none<E: de::Error>(self) -> Result<Cell, E> {
            Ok(Cell(None))
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Cell, D::Error> {
            deserializer.deserialize_any(CellVisitor)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cell, E> {
            Ok(Cell(Some(v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cell, E> {
            Ok(Cell(Some(v as f64)))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cell, E> {
            Ok(Cell(Some(v as f64)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Cell, E> {
            match v {
                NAN => Ok(Cell(Some(f64::NAN))),
                INFINITY => Ok(Cell(Some(f64::INFINITY))),
                NEG_INFINITY => Ok(Cell(Some(f64::NEG_INFINITY))),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }

    impl<'de> Deserialize<'de> for Cell {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(CellVisitor)
        }
    }

    struct Row<'a>(&'a [Option<f64>]);

    impl Serialize for Row<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.0.iter().map(|v| Cell(*v)))
        }
    }

    pub fn serialize<S: Serializer>(
        grid: &[Vec<Option<f64>>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(grid.iter().map(|row| Row(row.as_slice())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<Option<f64>>>, D::Error> {
        let rows: Vec<Vec<Cell>> = Vec::deserialize(deserializer)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.0).collect())
            .collect())
    }
}

/// Window parameters plus a snapshot of the underlying table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub first_index: i64,
    pub max_width: usize,
    pub table: TableSnapshot,
}

impl WindowSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: WindowSnapshot = serde_json::from_slice(bytes)?;
        snapshot.table.validate()?;
        Ok(snapshot)
    }
}
