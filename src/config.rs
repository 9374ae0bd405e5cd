/// Window configuration.
///
/// Window parameters can be loaded from JSON so that charts and dashboards can
/// describe their visible column range declaratively.

use crate::error::Result;
use crate::window::UNBOUNDED;
use serde::{Deserialize, Serialize};

/// Parameters of a sliding window.
///
/// # Examples
///
/// ```
/// use slidingtable::WindowConfig;
///
/// let config = WindowConfig::from_json(r#"{"first_index": 3, "max_width": 12}"#).unwrap();
/// assert_eq!(config.first_index, 3);
/// assert_eq!(config.max_width, Some(12));
///
/// // Missing fields fall back to the defaults: start at 0, no width limit
/// let config = WindowConfig::from_json("{}").unwrap();
/// assert_eq!(config, WindowConfig::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Underlying column index shown at window position 0 (may be negative)
    pub first_index: i64,
    /// Maximum number of visible columns; `None` means unbounded
    pub max_width: Option<usize>,
}

impl WindowConfig {
    pub fn new(first_index: i64, max_width: Option<usize>) -> Self {
        WindowConfig {
            first_index,
            max_width,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Width as stored by a window, with `UNBOUNDED` standing in for `None`.
    pub fn max_width_or_unbounded(&self) -> usize {
        self.max_width.unwrap_or(UNBOUNDED)
    }

    pub(crate) fn from_parameters(first_index: i64, max_width: usize) -> Self {
        let max_width = if max_width == UNBOUNDED {
            None
        } else {
            Some(max_width)
        };
        WindowConfig {
            first_index,
            max_width,
        }
    }
}
