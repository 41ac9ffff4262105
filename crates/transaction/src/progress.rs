//! Step progress to overall percentage

use crate::engine::ProgressKind;

/// Percentages to report for one accepted progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepProgress {
    pub sub: u32,
    pub overall: u32,
}

/// Converts `(step, count, percent)` triples into one overall percentage,
/// suppressing repeats of the last raw percent.
#[derive(Debug, Default)]
pub struct ProgressCalculator {
    /// Raw percent of the last reported step; `None` until one is reported
    last_percent: Option<i32>,
}

impl ProgressCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when the update is invalid, unknown or a repeat
    pub fn update(
        &mut self,
        kind: ProgressKind,
        target: &str,
        percent: i32,
        count: usize,
        current: usize,
    ) -> Option<StepProgress> {
        if let ProgressKind::Other(code) = kind {
            tracing::warn!(code, "unknown progress type");
            return None;
        }

        let mut current = current;
        // check phases report their index one step behind
        if kind.is_start_boundary() && current < count {
            current += 1;
        }

        if current < 1 || count < current {
            tracing::warn!(?kind, current, count, "progress step outside of range");
            return None;
        }
        if !(0..=100).contains(&percent) {
            tracing::warn!(?kind, percent, "progress percent outside of range");
            return None;
        }
        if kind.is_package_step() && target.is_empty() {
            tracing::warn!(?kind, "progress for a package step without a target");
            return None;
        }

        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);

        let percent = percent.unsigned_abs();
        let steps_done = u64::try_from(current - 1).unwrap_or(u64::MAX);
        let count_wide = u64::try_from(count).unwrap_or(u64::MAX);
        let overall = (u64::from(percent) + steps_done * 100) / count_wide;

        tracing::debug!(
            "{percent}% of {target} complete ({current} of {count})"
        );

        Some(StepProgress {
            sub: percent,
            overall: u32::try_from(overall).unwrap_or(100),
        })
    }
}
