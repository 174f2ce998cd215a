//! Two-feature input row for the ensemble.

use serde::{Deserialize, Serialize};

/// Lagged PM2.5 features fed to every ensemble member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagWindow {
    /// Most recent known or forecast value
    pub lag_1h: f64,
    /// Value 24 steps back, or a synthesized proxy at cold start
    pub lag_24h: f64,
}

impl LagWindow {
    /// Number of features in a window.
    pub const N_FEATURES: usize = 2;

    /// Create a new window.
    pub fn new(lag_1h: f64, lag_24h: f64) -> Self {
        Self { lag_1h, lag_24h }
    }

    /// Features in model column order: `[lag_1h, lag_24h]`.
    pub fn features(&self) -> [f64; 2] {
        [self.lag_1h, self.lag_24h]
    }

    /// Shift the window forward by one forecast step.
    pub fn advance(&mut self, next: f64) {
        self.lag_24h = self.lag_1h;
        self.lag_1h = next;
    }

    /// Both features are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lag_1h.is_finite() && self.lag_24h.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_order() {
        let window = LagWindow::new(40.0, 36.8);
        assert_eq!(window.features(), [40.0, 36.8]);
    }

    #[test]
    fn test_advance_shifts_lags() {
        let mut window = LagWindow::new(40.0, 36.8);
        window.advance(42.5);
        assert_eq!(window.lag_1h, 42.5);
        assert_eq!(window.lag_24h, 40.0);

        window.advance(39.0);
        assert_eq!(window.lag_1h, 39.0);
        assert_eq!(window.lag_24h, 42.5);
    }

    #[test]
    fn test_is_finite() {
        assert!(LagWindow::new(1.0, 2.0).is_finite());
        assert!(!LagWindow::new(f64::NAN, 2.0).is_finite());
        assert!(!LagWindow::new(1.0, f64::INFINITY).is_finite());
    }
}
