//! Request arrival processes

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrivalProcess {
    /// Fixed spacing of `1000 / qps` milliseconds
    Constant { qps: f64 },
    /// Exponential inter-arrival times with the given mean
    Poisson { mean: Duration },
}

impl ArrivalProcess {
    /// Constant-rate process, or `None` when `qps` yields no representable
    /// spacing (zero, negative, NaN, or so small that `1 / qps` overflows).
    pub fn constant(qps: f64) -> Option<Self> {
        (qps > 0.0 && Duration::try_from_secs_f64(1.0 / qps).is_ok())
            .then_some(Self::Constant { qps })
    }

    /// Label written to the results file
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "ConstantRate",
            Self::Poisson { .. } => "PoissonRate",
        }
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Constant { qps } => {
                Duration::try_from_secs_f64(1.0 / qps).unwrap_or(Duration::ZERO)
            }
            Self::Poisson { mean } => {
                // u in [0, 1) keeps the logarithm finite
                let u: f64 = rng.random();
                Duration::try_from_secs_f64(-(1.0 - u).ln() * mean.as_secs_f64())
                    .unwrap_or(Duration::ZERO)
            }
        }
    }
}
