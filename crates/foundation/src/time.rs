/// Engine time in seconds since the session started.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn after(self, dt_s: f64) -> Self {
        Time(self.0 + dt_s)
    }

    /// Seconds elapsed since `earlier`, never negative.
    pub fn since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn since_is_clamped_at_zero() {
        let t = Time(2.0);
        assert_eq!(t.after(0.5), Time(2.5));
        assert_eq!(t.since(Time(0.5)), 1.5);
        assert_eq!(Time(0.5).since(t), 0.0);
    }
}
