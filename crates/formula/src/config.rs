//! Formula engine configuration

use serde::{Deserialize, Serialize};

/// Formula engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaConfig {
    /// Longest string literal accepted at construction time, in characters
    pub max_string_literal_length: usize,

    /// Upper bound on decimal places a computed number can carry
    /// (applied to division, averages, `round` and `tonumber`)
    pub number_max_decimal_places: u32,

    /// Guard stored field expressions with `error_to_null` (default: true)
    /// Turning this off surfaces runtime failures, which is only useful when debugging
    pub wrap_field_errors: bool,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            max_string_literal_length: 10_000,
            number_max_decimal_places: 5,
            wrap_field_errors: true,
        }
    }
}

impl FormulaConfig {
    /// Create config suited to tests (short literals make limit checks cheap to hit)
    pub fn for_testing() -> Self {
        Self {
            max_string_literal_length: 64,
            number_max_decimal_places: 5,
            wrap_field_errors: true,
        }
    }

    pub fn with_max_string_literal_length(mut self, length: usize) -> Self {
        self.max_string_literal_length = length;
        self
    }

    pub fn with_number_max_decimal_places(mut self, places: u32) -> Self {
        self.number_max_decimal_places = places;
        self
    }

    pub fn with_wrap_field_errors(mut self, wrap: bool) -> Self {
        self.wrap_field_errors = wrap;
        self
    }
}
