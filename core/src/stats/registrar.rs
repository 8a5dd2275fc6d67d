//! Statistics Registration

use super::StatsAccumulator;
use std::sync::{Mutex, OnceLock};

/// Return the global registrar for statistics.
pub fn stats_registrar() -> &'static Mutex<StatsRegistrar> {
    static DATA: OnceLock<Mutex<StatsRegistrar>> = OnceLock::new();
    DATA.get_or_init(|| Mutex::new(StatsRegistrar::new()))
}

/// Callback that reports thread local statistics to a `StatsAccumulator`.
pub type StatsFunc = fn(&mut StatsAccumulator);

/// Registers callback functions for statistics.
#[derive(Default)]
pub struct StatsRegistrar {
    /// Callback functions.
    stats_funcs: Vec<StatsFunc>,
}

impl StatsRegistrar {
    /// Create a new instance of `StatsRegistrar`.
    pub fn new() -> Self {
        Self { stats_funcs: vec![] }
    }

    /// Register a callback function for reporting statistics. Registering the
    /// same function twice has no effect.
    ///
    /// * `func` - A callback function that takes a `StatsAccumulator` to report statistics.
    pub fn register_stat_func(&mut self, func: StatsFunc) {
        if !self.stats_funcs.iter().any(|f| *f as usize == func as usize) {
            self.stats_funcs.push(func);
        }
    }

    /// Call all callback functions for reporting statistics.
    ///
    /// * `accum` - The accumulator receiving the thread's statistics.
    pub fn call_stat_funcs(&self, accum: &mut StatsAccumulator) {
        self.stats_funcs.iter().for_each(|func| {
            func(accum);
        });
    }

    /// Returns the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.stats_funcs.len()
    }

    /// Returns true if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.stats_funcs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_one(accum: &mut StatsAccumulator) {
        accum.report_counter("Test/One", 1);
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let mut sr = StatsRegistrar::new();
        sr.register_stat_func(report_one);
        sr.register_stat_func(report_one);
        assert_eq!(sr.len(), 1);

        let mut accum = StatsAccumulator::new();
        sr.call_stat_funcs(&mut accum);
        assert_eq!(accum.counter("Test/One"), Some(1));
    }
}
