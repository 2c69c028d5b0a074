//! Human-readable labels for the three switches.
//!
//! Labels are only used for text (LCD lines, placeholder overlay); the
//! controller itself never reads them.

use crate::coord::{DIGITS, ImageCoordinate};
use crate::error::ArtboxError;

use log::{info, warn};
use serde_json::Value;
use std::path::Path;

/// Six labels for each of the three switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    groups: [Vec<String>; 3],
}

impl Default for Labels {
    /// Numeric labels `"0"` through `"5"` for every switch.
    fn default() -> Self {
        let digits: Vec<String> = (0..DIGITS).map(|d| d.to_string()).collect();
        Self {
            groups: [digits.clone(), digits.clone(), digits],
        }
    }
}

impl Labels {
    /// Build labels from three lists of six entries.
    pub fn new(first: Vec<String>, second: Vec<String>, third: Vec<String>) -> Result<Self, ArtboxError> {
        for (name, group) in [("first", &first), ("second", &second), ("third", &third)] {
            if group.len() != DIGITS as usize {
                return Err(ArtboxError::InvalidLabels(format!(
                    "{name} has {} entries, expected {DIGITS}",
                    group.len()
                )));
            }
        }
        Ok(Self {
            groups: [first, second, third],
        })
    }

    /// The label for `digit` (0-5) on switch `slot` (0-2).
    pub fn label(&self, slot: usize, digit: u8) -> &str {
        self.groups
            .get(slot)
            .and_then(|group| group.get(digit as usize))
            .map_or("", String::as_str)
    }

    /// The three labels describing `coord`.
    pub fn for_coordinate(&self, coord: ImageCoordinate) -> [&str; 3] {
        let [a, b, c] = coord.digits();
        [self.label(0, a), self.label(1, b), self.label(2, c)]
    }

    /// Parse labels text.
    ///
    /// Accepted forms:
    /// - `{"first": [..], "second": [..], "third": [..]}` (keys case-insensitive)
    /// - `{"0": [..], "1": [..], "2": [..]}`
    /// - `[[..], [..], [..]]`
    /// - any text wrapping such an array, e.g. `const slotOptions = [ ... ];`
    ///
    /// Each list holds six entries; non-string entries are stringified.
    pub fn parse(text: &str) -> Result<Self, ArtboxError> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                let start = text.find('[');
                let end = text.rfind(']');
                match (start, end) {
                    (Some(start), Some(end)) if end > start => serde_json::from_str(&text[start..=end])?,
                    _ => return Err(e.into()),
                }
            }
        };

        Self::from_value(&value)
            .ok_or_else(|| ArtboxError::InvalidLabels("not a recognized labels layout".to_string()))
    }

    /// Load labels from a file, falling back to numeric labels on any error.
    pub fn load_or_default(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to read labels file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&text) {
            Ok(labels) => {
                info!("loaded labels from {}", path.display());
                labels
            }
            Err(e) => {
                warn!("labels file {} unusable ({}), using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => {
                let lowered: std::collections::HashMap<String, &Value> =
                    map.iter().map(|(k, v)| (k.to_lowercase(), v)).collect();

                for keys in [["first", "second", "third"], ["0", "1", "2"]] {
                    let groups: Option<Vec<Vec<String>>> =
                        keys.iter().map(|k| lowered.get(*k).and_then(|v| string_list(v))).collect();
                    if let Some(groups) = groups {
                        return Self::from_groups(groups);
                    }
                }
                None
            }
            Value::Array(items) if items.len() == 3 => {
                let groups: Option<Vec<Vec<String>>> = items.iter().map(string_list).collect();
                Self::from_groups(groups?)
            }
            _ => None,
        }
    }

    fn from_groups(groups: Vec<Vec<String>>) -> Option<Self> {
        let mut groups = groups.into_iter();
        let (first, second, third) = (groups.next()?, groups.next()?, groups.next()?);
        Self::new(first, second, third).ok()
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    if items.len() != DIGITS as usize {
        return None;
    }
    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}
