//! Timing helpers for scenarios and command phases

use std::fmt;
use std::time::{Duration, Instant};

/// Wall-clock time of one scenario
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Elapsed milliseconds, logged at trace level
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::trace!("{} took {}ms", self.label, elapsed);
        elapsed
    }
}

/// Durations of the consecutive phases of a command
#[derive(Debug)]
pub struct PhaseTimings {
    started: Instant,
    mark: Instant,
    phases: Vec<(&'static str, Duration)>,
}

impl PhaseTimings {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            mark: now,
            phases: Vec::new(),
        }
    }

    /// Close the phase running since the previous call
    pub fn finish(&mut self, phase: &'static str) {
        let now = Instant::now();
        self.phases.push((phase, now - self.mark));
        self.mark = now;
    }

    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }
}

impl fmt::Display for PhaseTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (phase, duration) in &self.phases {
            write!(f, "{phase} {}ms, ", duration.as_millis())?;
        }
        write!(f, "total {}ms", self.total().as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer() {
        let timer = Timer::start("scenario");
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
        assert!(timer.stop() >= 10);
    }

    #[test]
    fn test_phases_are_not_cumulative() {
        let mut timings = PhaseTimings::start();
        sleep(Duration::from_millis(20));
        timings.finish("run");
        timings.finish("report");

        let phases = timings.phases();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].0, "run");
        assert!(phases[0].1 >= Duration::from_millis(20));
        assert!(phases[1].1 < phases[0].1);

        let line = timings.to_string();
        assert!(line.starts_with("run "));
        assert!(line.contains(", report "));
        assert!(line.contains("total "));
    }
}
