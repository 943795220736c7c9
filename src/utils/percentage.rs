use std::{fmt::Display, ops::Deref};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `whole` taken by `value`. An empty whole gives 0%.
pub fn seconds_percentage(value: u64, whole: u64) -> Percentage {
    if whole == 0 {
        return Percentage(0.);
    }
    Percentage(value as f64 / whole as f64 * 100.)
}

#[cfg(test)]
mod tests {
    use super::seconds_percentage;

    #[test]
    fn share_of_total() {
        assert_eq!(*seconds_percentage(1, 4), 25.);
        assert_eq!(*seconds_percentage(5, 0), 0.);
    }
}
