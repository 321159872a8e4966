use std::ops::Mul;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Kmh(f64);

impl Kmh {
    pub fn new(value: f64) -> Self {
        Kmh(value)
    }

    pub fn meters_per_second(&self) -> f64 {
        self.0 / 3.6
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Meters(f64);

impl Meters {
    pub fn new(value: f64) -> Self {
        Meters(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Seconds(f64);

impl Seconds {
    pub fn new(value: f64) -> Self {
        Seconds(value)
    }
}

/// Whole meters travelled at a constant speed.
impl Mul<Kmh> for Seconds {
    type Output = Meters;

    fn mul(self, speed: Kmh) -> Meters {
        Meters((self.0 * speed.meters_per_second()).round())
    }
}
