// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Reconnect delay computation with exponential growth, a ceiling and symmetric jitter.

use std::time::Duration;

use rand::Rng;

/// The smallest delay ever returned, regardless of configuration.
pub const MIN_RECONNECT_DELAY_SECS: f64 = 0.5;

/// The largest accepted jitter ratio.
pub const MAX_JITTER_RATIO: f64 = 0.5;

/// Exponential reconnect backoff.
///
/// For attempt `n` (1-based) the pre-jitter delay is `min(max_delay, base_delay * 2^(n-1))`.
/// Jitter then scales the delay by a factor drawn uniformly from
/// `[1 - jitter_ratio, 1 + jitter_ratio]`, and the result never drops below
/// [`MIN_RECONNECT_DELAY_SECS`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconnectBackoff {
    base_delay_secs: f64,
    max_delay_secs: f64,
    jitter_ratio: f64,
}

impl ReconnectBackoff {
    /// Creates a new [`ReconnectBackoff`].
    ///
    /// Negative or non-finite inputs are sanitized: the base delay is floored at zero, the
    /// ceiling is never below the base, and the jitter ratio is clamped to `[0, 0.5]`.
    #[must_use]
    pub fn new(base_delay_secs: f64, max_delay_secs: f64, jitter_ratio: f64) -> Self {
        let base_delay_secs = finite_or_zero(base_delay_secs).max(0.0);
        let max_delay_secs = finite_or_zero(max_delay_secs).max(base_delay_secs);
        let jitter_ratio = finite_or_zero(jitter_ratio).clamp(0.0, MAX_JITTER_RATIO);

        Self {
            base_delay_secs,
            max_delay_secs,
            jitter_ratio,
        }
    }

    #[must_use]
    pub const fn base_delay_secs(&self) -> f64 {
        self.base_delay_secs
    }

    #[must_use]
    pub const fn max_delay_secs(&self) -> f64 {
        self.max_delay_secs
    }

    #[must_use]
    pub const fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }

    /// Returns the delay in seconds for `attempt` before jitter is applied.
    ///
    /// Attempt `0` is treated the same as attempt `1`.
    #[must_use]
    pub fn nominal_delay_secs(&self, attempt: u32) -> f64 {
        let exponent = attempt.saturating_sub(1).min(62);
        let grown = self.base_delay_secs * 2f64.powi(exponent as i32);
        grown.min(self.max_delay_secs)
    }

    /// Returns the delay for `attempt` with the given jitter `sample` in `[-1.0, 1.0]`.
    ///
    /// Samples outside that range are clamped.
    #[must_use]
    pub fn delay_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let sample = finite_or_zero(sample).clamp(-1.0, 1.0);
        let nominal = self.nominal_delay_secs(attempt);
        let jittered = nominal * self.jitter_ratio.mul_add(sample, 1.0);
        Duration::from_secs_f64(jittered.max(MIN_RECONNECT_DELAY_SECS))
    }

    /// Returns the delay for `attempt` using a random jitter sample.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let sample = if self.jitter_ratio > 0.0 {
            rand::rng().random_range(-1.0..=1.0)
        } else {
            0.0
        };
        self.delay_with_sample(attempt, sample)
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(3.0, 60.0, 0.15)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
