// Path: crates/telemetry/src/time.rs
use std::time::Instant;

/// A RAII timer that reports the elapsed duration through a closure when
/// dropped, regardless of which return path the guarded scope takes.
pub struct Timer<F: FnMut(f64)> {
    start: Instant,
    on_drop: F,
}

impl<F: FnMut(f64)> Timer<F> {
    /// Starts the timer. `on_drop` is called once, with the elapsed seconds,
    /// when the timer goes out of scope.
    pub fn new(on_drop: F) -> Self {
        Self {
            start: Instant::now(),
            on_drop,
        }
    }
}

impl<F: FnMut(f64)> Drop for Timer<F> {
    fn drop(&mut self) {
        (self.on_drop)(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_elapsed_on_drop() {
        let mut observed = None;
        {
            let _timer = Timer::new(|secs| observed = Some(secs));
        }
        assert!(observed.is_some());
    }
}
