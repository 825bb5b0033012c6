use foundation::time::Time;

/// Metadata for one animation frame.
///
/// Real frame loops deliver a variable `dt`, so each frame carries the delta
/// it was produced with and the accumulated engine time at its start.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame.
    pub dt_s: f64,
    /// Engine time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn first() -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time: Time::ZERO,
        }
    }

    /// The following frame, `dt_s` seconds later. Negative or non-finite
    /// deltas are treated as zero.
    pub fn next(self, dt_s: f64) -> Self {
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };
        Self {
            index: self.index + 1,
            dt_s,
            time: self.time.after(dt_s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use foundation::time::Time;

    #[test]
    fn next_accumulates_variable_dt() {
        let f = Frame::first().next(0.016).next(0.034);
        assert_eq!(f.index, 2);
        assert_eq!(f.dt_s, 0.034);
        assert!((f.time.0 - 0.05).abs() < 1e-12);
    }

    #[test]
    fn bad_dt_does_not_move_time_backwards() {
        let f = Frame::first().next(-1.0).next(f64::NAN);
        assert_eq!(f.index, 2);
        assert_eq!(f.time, Time::ZERO);
    }
}
