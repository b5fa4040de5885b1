//! Fixed three-sample lag window

/// Number of samples kept per history
pub const LAG_DEPTH: usize = 3;

/// The last three samples of a signal, oldest first
///
/// A fresh window is all zeros, which the response models treat as a cold
/// pump with no residual state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LagWindow([f64; LAG_DEPTH]);

impl LagWindow {
    /// Create an all-zero window
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the oldest sample and append `value` as the newest
    pub fn push(&mut self, value: f64) {
        self.0.rotate_left(1);
        self.0[LAG_DEPTH - 1] = value;
    }

    /// Zero every sample
    pub fn clear(&mut self) {
        self.0 = [0.0; LAG_DEPTH];
    }

    /// Whether any sample is still zero
    pub fn has_gap(&self) -> bool {
        self.0.iter().any(|&v| v == 0.0)
    }

    /// Whether every sample is zero
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    /// Most recent sample
    pub fn newest(&self) -> f64 {
        self.0[LAG_DEPTH - 1]
    }

    /// Samples, oldest first
    pub fn values(&self) -> [f64; LAG_DEPTH] {
        self.0
    }
}

impl std::ops::Index<usize> for LagWindow {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}
