//! Ordered fallback combinator.
//!
//! A fallback ladder is a list of strategies tried front to back. The first
//! strategy that yields a value wins; every failure along the way is kept so
//! callers can log why a ladder degraded.

use crate::error::DecodeError;

/// Every strategy in a ladder failed.
#[derive(Debug)]
pub struct Exhausted<S> {
    pub failures: Vec<(S, DecodeError)>,
}

impl<S: std::fmt::Debug> std::fmt::Display for Exhausted<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "all {} strategies failed", self.failures.len())?;
        for (strategy, err) in &self.failures {
            write!(f, "; {strategy:?}: {err}")?;
        }
        Ok(())
    }
}

/// A successful ladder run.
#[derive(Debug)]
pub struct Resolved<S, T> {
    /// Strategy that produced the value
    pub strategy: S,
    /// The produced value
    pub value: T,
    /// Strategies that failed before it, in order
    pub failures: Vec<(S, DecodeError)>,
}

/// Run `strategies` in order through `run` and return the first success.
pub fn try_in_order<S, T, F>(strategies: &[S], mut run: F) -> Result<Resolved<S, T>, Exhausted<S>>
where
    S: Copy,
    F: FnMut(S) -> Result<T, DecodeError>,
{
    let mut failures = Vec::new();
    for &strategy in strategies {
        match run(strategy) {
            Ok(value) => {
                return Ok(Resolved {
                    strategy,
                    value,
                    failures,
                })
            }
            Err(e) => failures.push((strategy, e)),
        }
    }
    Err(Exhausted { failures })
}
