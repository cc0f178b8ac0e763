//! Board geometry and dice rules, fixed at session creation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ActionError;

/// Seats are indexed by `u8`.
pub const MAX_SEATS: usize = 255;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Cells on the shared circular path (L).
    pub path_length: u16,

    /// Finish-lane slots (K). Reaching slot K means finished.
    pub finish_capacity: u16,

    pub max_die_face: u8,

    /// Consecutive max rolls allowed before the turn is forfeited.
    pub max_consecutive_max_rolls: u8,

    pub tokens_per_participant: u8,

    /// Absolute path cells immune to capture. `None` means the entry cells.
    pub safe_cells: Option<BTreeSet<u16>>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            path_length: 28,
            finish_capacity: 6,
            max_die_face: 6,
            max_consecutive_max_rolls: 2,
            tokens_per_participant: 4,
            safe_cells: None,
        }
    }
}

impl BoardConfig {
    #[must_use]
    pub fn with_path_length(mut self, length: u16) -> Self {
        self.path_length = length;
        self
    }

    #[must_use]
    pub fn with_finish_capacity(mut self, capacity: u16) -> Self {
        self.finish_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_tokens_per_participant(mut self, tokens: u8) -> Self {
        self.tokens_per_participant = tokens;
        self
    }

    #[must_use]
    pub fn with_safe_cells(mut self, cells: impl IntoIterator<Item = u16>) -> Self {
        self.safe_cells = Some(cells.into_iter().collect());
        self
    }

    /// Check the geometry is playable for `seat_count` seats.
    ///
    /// Configs arrive inside remote payloads, so every field is suspect.
    pub fn validate(&self, seat_count: usize) -> Result<(), ActionError> {
        let problem = if self.path_length == 0 {
            "path_length must be at least 1"
        } else if self.max_die_face == 0 {
            "max_die_face must be at least 1"
        } else if self.tokens_per_participant == 0 {
            "tokens_per_participant must be at least 1"
        } else if seat_count > MAX_SEATS {
            "more than 255 seats"
        } else {
            return Ok(());
        };
        Err(ActionError::InvalidBoard(problem.to_string()))
    }

    /// Entry cell for each seat, evenly spaced around the path.
    #[must_use]
    pub fn entry_offsets(&self, seat_count: usize) -> Vec<u16> {
        let n = seat_count.max(1) as u32;
        (0..n)
            .map(|seat| (seat * u32::from(self.path_length) / n) as u16)
            .collect()
    }

    /// Safe cells for a table of `seat_count`.
    #[must_use]
    pub fn resolve_safe_cells(&self, seat_count: usize) -> BTreeSet<u16> {
        match &self.safe_cells {
            Some(cells) => cells.clone(),
            None => self.entry_offsets(seat_count).into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.path_length, 28);
        assert_eq!(config.finish_capacity, 6);
        assert_eq!(config.max_die_face, 6);
        assert_eq!(config.max_consecutive_max_rolls, 2);
    }

    #[test]
    fn test_entry_offsets_evenly_spaced() {
        let config = BoardConfig::default();
        assert_eq!(config.entry_offsets(4), vec![0, 7, 14, 21]);
        assert_eq!(config.entry_offsets(2), vec![0, 14]);
        assert_eq!(config.entry_offsets(3), vec![0, 9, 18]);
    }

    #[test]
    fn test_safe_cells_default_to_entries() {
        let config = BoardConfig::default();
        let safe = config.resolve_safe_cells(2);
        assert_eq!(safe.into_iter().collect::<Vec<_>>(), vec![0, 14]);

        let custom = config.with_safe_cells([3, 5]);
        assert_eq!(custom.resolve_safe_cells(4).len(), 2);
    }

    #[test]
    fn test_validate_rejects_degenerate_geometry() {
        assert!(BoardConfig::default().validate(4).is_ok());

        let zero_path: BoardConfig = serde_json::from_str(r#"{"path_length":0}"#).unwrap();
        assert!(matches!(zero_path.validate(2), Err(ActionError::InvalidBoard(_))));

        let no_die = BoardConfig {
            max_die_face: 0,
            ..BoardConfig::default()
        };
        assert!(no_die.validate(2).is_err());

        let no_tokens = BoardConfig::default().with_tokens_per_participant(0);
        assert!(no_tokens.validate(2).is_err());

        assert!(BoardConfig::default().validate(MAX_SEATS + 1).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BoardConfig = serde_json::from_str(r#"{"path_length":40}"#).unwrap();
        assert_eq!(config.path_length, 40);
        assert_eq!(config.finish_capacity, 6);
        assert!(config.safe_cells.is_none());
    }
}
