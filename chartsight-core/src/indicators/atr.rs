//! True range and its simple average.
//!
//! TR[0] = high[0] - low[0] (no previous close).
//! TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).

use crate::domain::OhlcBar;

pub fn true_range(bars: &[OhlcBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high - bar.low;
            if i == 0 {
                return hl;
            }
            let pc = bars[i - 1].close;
            hl.max((bar.high - pc).abs()).max((bar.low - pc).abs())
        })
        .collect()
}

/// Mean true range of the last `period` bars. Zero when there are no bars.
///
/// The previous close of the first bar in the window is still used, so the
/// window's first TR can include an opening gap.
pub fn average_true_range(bars: &[OhlcBar], period: usize) -> f64 {
    if bars.is_empty() || period == 0 {
        return 0.0;
    }
    let tr = true_range(bars);
    let start = tr.len().saturating_sub(period);
    super::mean(&tr[start..])
}
