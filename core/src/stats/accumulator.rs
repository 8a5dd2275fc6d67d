//! Statistics Accumulator

use crate::pbrt;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, OnceLock};

/// Return the global statistics accumulator.
pub fn stats_accumulator() -> &'static Mutex<StatsAccumulator> {
    static DATA: OnceLock<Mutex<StatsAccumulator>> = OnceLock::new();
    DATA.get_or_init(|| Mutex::new(StatsAccumulator::new()))
}

/// Integer distribution statistic.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StatsDistribution {
    /// Sum of all values.
    pub sum: i64,

    /// Count of all values.
    pub count: u64,

    /// Minimum value.
    pub min: Option<i64>,

    /// Maximum value.
    pub max: Option<i64>,
}

impl StatsDistribution {
    /// Accumulate stats from another distribution.
    ///
    /// * `distrib` - The other distribution.
    pub fn accumulate(&mut self, distrib: Self) {
        self.sum += distrib.sum;
        self.count += distrib.count;
        self.min = merge(self.min, distrib.min, pbrt::min);
        self.max = merge(self.max, distrib.max, pbrt::max);
    }

    /// Report a sample value.
    ///
    /// * `val` - Sample value.
    pub fn report(&mut self, val: i64) {
        self.accumulate(Self {
            sum: val,
            count: 1,
            min: Some(val),
            max: Some(val),
        });
    }

    /// Returns the mean of the samples.
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }

    /// Clear stats.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn merge(a: Option<i64>, b: Option<i64>, f: fn(i64, i64) -> i64) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Aggregate different types of statistics. Names use `/` to separate a
/// category from the title, e.g. "BVH/Interior nodes".
#[derive(Clone, Debug, Default)]
pub struct StatsAccumulator {
    /// Counters.
    counters: BTreeMap<String, i64>,

    /// Memory counters.
    memory_counters: BTreeMap<String, u64>,

    /// Integer distributions.
    int_distributions: BTreeMap<String, StatsDistribution>,

    /// Percentages.
    percentages: BTreeMap<String, (i64, i64)>,

    /// Ratios.
    ratios: BTreeMap<String, (i64, i64)>,
}

impl StatsAccumulator {
    /// Create a new instance of `StatsAccumulator`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates a counter value.
    ///
    /// * `name` - Statistic name.
    /// * `val`  - Counter value.
    pub fn report_counter(&mut self, name: &str, val: i64) {
        *self.counters.entry(name.to_string()).or_insert(0) += val;
    }

    /// Accumulates a memory counter value.
    ///
    /// * `name` - Statistic name.
    /// * `val`  - Memory counter value in bytes.
    pub fn report_memory_counter(&mut self, name: &str, val: u64) {
        *self.memory_counters.entry(name.to_string()).or_insert(0) += val;
    }

    /// Accumulates integer distribution samples.
    ///
    /// * `name`    - Statistic name.
    /// * `distrib` - Distribution.
    pub fn report_int_distribution(&mut self, name: &str, distrib: StatsDistribution) {
        self.int_distributions
            .entry(name.to_string())
            .or_default()
            .accumulate(distrib);
    }

    /// Accumulates a percentage value.
    ///
    /// * `name`  - Statistic name.
    /// * `num`   - Numerator (actual count).
    /// * `denom` - Denominator (total count).
    pub fn report_percentage(&mut self, name: &str, num: i64, denom: i64) {
        let v = self.percentages.entry(name.to_string()).or_insert((0, 0));
        v.0 += num;
        v.1 += denom;
    }

    /// Accumulates a ratio value.
    ///
    /// * `name`  - Statistic name.
    /// * `num`   - Numerator.
    /// * `denom` - Denominator.
    pub fn report_ratio(&mut self, name: &str, num: i64, denom: i64) {
        let v = self.ratios.entry(name.to_string()).or_insert((0, 0));
        v.0 += num;
        v.1 += denom;
    }

    /// Returns the accumulated value of a counter.
    ///
    /// * `name` - Statistic name.
    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }

    /// Returns the accumulated value of a memory counter in bytes.
    ///
    /// * `name` - Statistic name.
    pub fn memory_counter(&self, name: &str) -> Option<u64> {
        self.memory_counters.get(name).copied()
    }

    /// Returns an accumulated integer distribution.
    ///
    /// * `name` - Statistic name.
    pub fn int_distribution(&self, name: &str) -> Option<StatsDistribution> {
        self.int_distributions.get(name).copied()
    }

    /// Returns the accumulated numerator and denominator of a ratio.
    ///
    /// * `name` - Statistic name.
    pub fn ratio(&self, name: &str) -> Option<(i64, i64)> {
        self.ratios.get(name).copied()
    }

    /// Prints the report to stdout.
    pub fn print(&self) {
        print!("{self}");
    }

    /// Clear the accumulated statistics.
    pub fn clear(&mut self) {
        self.counters.clear();
        self.memory_counters.clear();
        self.int_distributions.clear();
        self.percentages.clear();
        self.ratios.clear();
    }
}

impl fmt::Display for StatsAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut to_print: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (k, &v) in self.counters.iter().filter(|(_, v)| **v != 0) {
            let (category, title) = get_category_and_title(k);
            let s = format!("{title:<42}               {v:12}");
            to_print.entry(category).or_default().push(s);
        }

        for (k, &v) in self.memory_counters.iter().filter(|(_, v)| **v != 0) {
            let (category, title) = get_category_and_title(k);
            let kb = v as f64 / 1024.0;
            let s = if kb < 1024.0 {
                format!("{title:<42}                  {kb:9.2} kB")
            } else if kb / 1024.0 < 1024.0 {
                format!("{title:<42}                  {:9.2} MiB", kb / 1024.0)
            } else {
                format!("{title:<42}                  {:9.2} GiB", kb / 1024.0 / 1024.0)
            };
            to_print.entry(category).or_default().push(s);
        }

        for (k, v) in self.int_distributions.iter() {
            if let (Some(avg), Some(mn), Some(mx)) = (v.average(), v.min, v.max) {
                let (category, title) = get_category_and_title(k);
                let s = format!("{title:<42}                      {avg:.3} avg [range {mn} - {mx}]");
                to_print.entry(category).or_default().push(s);
            }
        }

        for (k, &(num, denom)) in self.percentages.iter().filter(|(_, v)| v.1 != 0) {
            let (category, title) = get_category_and_title(k);
            let pct = (100.0 * num as f64) / denom as f64;
            let s = format!("{title:<42}{num:12} / {denom:12} ({pct:.2}%)");
            to_print.entry(category).or_default().push(s);
        }

        for (k, &(num, denom)) in self.ratios.iter().filter(|(_, v)| v.1 != 0) {
            let (category, title) = get_category_and_title(k);
            let ratio = num as f64 / denom as f64;
            let s = format!("{title:<42}{num:12} / {denom:12} ({ratio:.2}x)");
            to_print.entry(category).or_default().push(s);
        }

        writeln!(f, "Statistics:")?;
        for (category, items) in to_print {
            writeln!(f, "  {category}")?;
            for item in items {
                writeln!(f, "    {item}")?;
            }
        }
        Ok(())
    }
}

/// Splits a statistic name at the first `/` as the separator and returns category and title. If there is no `/`, then
/// category is the empty string.
///
/// * `s` - The statistic name to split.
fn get_category_and_title(s: &str) -> (String, &str) {
    match s.split_once('/') {
        Some((category, title)) => (category.to_string(), title),
        None => (String::new(), s),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
