use std::time::Instant;

/// Monotonic time since the owner started, in the units the loops reason in.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    origin: Instant,
}

impl Stopwatch {
    pub fn start_new() -> Self {
        Stopwatch {
            origin: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    pub fn elapsed_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start_new()
    }
}
