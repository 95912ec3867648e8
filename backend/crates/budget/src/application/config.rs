//! Application Configuration

/// Ledger configuration
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Commit deductions with a single conditional increment so the remote
    /// counter never passes the cap. `false` uses an unconditional
    /// increment after the local snapshot check.
    pub strict_cap: bool,
    /// Fraction of the cap at which a warning is logged, once per crossing
    pub warning_threshold: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            strict_cap: true,
            warning_threshold: 0.9,
        }
    }
}

impl BudgetConfig {
    /// Two-step check then increment, with bounded overshoot across instances
    pub fn optimistic() -> Self {
        Self {
            strict_cap: false,
            ..Default::default()
        }
    }
}
