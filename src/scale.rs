//! Element-wise scale functions

use std::rc::Rc;

/// Function applied to every element of a scaled array
pub trait Scale {
    fn apply(&self, x: f64) -> f64;

    /// Inverse mapping, `None` when the scale cannot invert `y`
    fn invert(&self, _y: f64) -> Option<f64> {
        None
    }

    fn can_invert(&self) -> bool {
        false
    }
}

impl<F: Fn(f64) -> f64> Scale for F {
    fn apply(&self, x: f64) -> f64 {
        self(x)
    }
}

pub type ScaleRef = Rc<dyn Scale>;

/// Linear map from `domain` onto `range`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
    /// Clamp inputs to the domain (and inverted outputs to the range's domain)
    pub clamp: bool,
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self {
            domain,
            range,
            clamp: false,
        }
    }

    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    fn map(&self, x: f64, from: [f64; 2], to: [f64; 2]) -> f64 {
        let span = from[1] - from[0];
        // Degenerate spans map everything to the midpoint
        let mut t = if span == 0.0 { 0.5 } else { (x - from[0]) / span };
        if self.clamp {
            t = t.clamp(0.0, 1.0);
        }
        to[0] + t * (to[1] - to[0])
    }
}

impl Default for LinearScale {
    fn default() -> Self {
        Self::new([0.0, 1.0], [0.0, 1.0])
    }
}

impl Scale for LinearScale {
    fn apply(&self, x: f64) -> f64 {
        self.map(x, self.domain, self.range)
    }

    fn invert(&self, y: f64) -> Option<f64> {
        Some(self.map(y, self.range, self.domain))
    }

    fn can_invert(&self) -> bool {
        true
    }
}
