use arrayvec::ArrayVec;
use tracing::warn;

const MAX_WINDOW_SIZE: usize = 255;

/// Median over the last `window_size` values pushed.
///
/// Values are kept sorted together with their insertion index so the
/// oldest one can be evicted without re-sorting.
pub struct RollingMedianCalculator {
    window_size: usize,
    data: ArrayVec<(f32, usize), MAX_WINDOW_SIZE>,
    index: usize,
}

impl RollingMedianCalculator {
    pub fn new(window_size: usize) -> Self {
        let window_size = if window_size > MAX_WINDOW_SIZE {
            warn!(
                "Window size {} is larger than max size {}. Clamping to max size.",
                window_size, MAX_WINDOW_SIZE
            );
            MAX_WINDOW_SIZE
        } else {
            window_size.max(1)
        };
        Self {
            window_size,
            data: ArrayVec::new(),
            index: 0,
        }
    }

    pub fn add(&mut self, value: f32) {
        if self.data.len() == self.window_size {
            let min_index_keep = self.index + 1 - self.window_size;
            self.data.retain(|x| x.1 >= min_index_keep);
        }
        let pos = self.data.partition_point(|x| x.0 <= value);
        self.data.insert(pos, (value, self.index));
        self.index += 1;
    }

    /// `None` until the window is full.
    pub fn median(&self) -> Option<f32> {
        if self.data.len() < self.window_size {
            None
        } else {
            Some(self.data[self.data.len() / 2].0)
        }
    }
}

/// Median of all values, `None` for an empty slice.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

/// Centered rolling median of `values`.
///
/// Positions the window cannot be centered on take the closest computed
/// median. When the series is shorter than the window the global median
/// is used everywhere.
pub fn rolling_baseline(values: &[f32], window_size: usize) -> Vec<f32> {
    let window_size = window_size.clamp(1, MAX_WINDOW_SIZE);
    if values.len() < window_size {
        let global = median(values).unwrap_or(0.0);
        return vec![global; values.len()];
    }

    let offset = window_size / 2;
    let mut out = vec![0.0f32; values.len()];
    let mut calc = RollingMedianCalculator::new(window_size);
    let mut first_center = None;
    let mut last_center = 0;
    for (i, &v) in values.iter().enumerate() {
        calc.add(v);
        if let Some(m) = calc.median() {
            let center = i - (window_size - 1) + offset;
            out[center] = m;
            first_center.get_or_insert(center);
            last_center = center;
        }
    }

    let first = first_center.unwrap_or(0);
    let head = out[first];
    let tail = out[last_center];
    out[..first].fill(head);
    out[last_center + 1..].fill(tail);
    out
}
