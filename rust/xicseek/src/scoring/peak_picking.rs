use std::ops::Range;

/// Max number of samples a peak may extend on each side of its apex.
const MAX_HALF_WIDTH: u8 = 10;

/// Sample indices of a picked peak, `left <= apex <= right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakBoundary {
    pub apex: usize,
    pub left: usize,
    pub right: usize,
}

impl PeakBoundary {
    pub fn range(&self) -> Range<usize> {
        self.left..(self.right + 1)
    }
}

struct PeakPicker<'a> {
    scores: &'a [f32],
    exclusions: Vec<Range<usize>>,
}

impl<'a> PeakPicker<'a> {
    fn new(scores: &'a [f32]) -> Self {
        Self {
            scores,
            exclusions: Vec::new(),
        }
    }

    fn next_peak(&self) -> Option<(f32, usize)> {
        let mut best_val = f32::NEG_INFINITY;
        let mut best_idx = None;

        for (i, &val) in self.scores.iter().enumerate() {
            if val.is_nan() {
                continue;
            }
            if self.exclusions.iter().any(|r| r.contains(&i)) {
                continue;
            }
            if val > best_val {
                best_val = val;
                best_idx = Some(i);
            }
        }

        best_idx.map(|i| (best_val, i))
    }

    fn mask(&mut self, range: Range<usize>) {
        self.exclusions.push(range);
    }

    fn is_local_max(&self, idx: usize) -> bool {
        let val = self.scores[idx];
        let left_ok = idx == 0 || self.scores[idx - 1] <= val;
        let right_ok = idx + 1 >= self.scores.len() || self.scores[idx + 1] <= val;
        left_ok && right_ok
    }
}

/// Number of samples, starting at `start` (included), over which the
/// series keeps falling when walking in the `step` direction.
fn count_falling_steps(start: usize, step: i32, slc: &[f32]) -> u8 {
    let mut count = 0;
    let edge = slc.len() as i32;
    let mut last = slc[start];
    while count < MAX_HALF_WIDTH {
        let next = start as i32 + (step * count as i32);
        if next < 0 || next >= edge {
            break;
        }
        let score = slc[next as usize];
        if score > last {
            break;
        }
        last = score;
        count += 1;
    }
    count
}

/// Applies a 1D Gaussian blur in-place.
pub fn gaussblur_in_place(x: &mut [f32]) {
    let len = x.len();
    if len < 3 {
        return;
    }
    const W_SIDE: f32 = 0.5;
    const W_CENTER: f32 = 1.0;
    const NORM: f32 = 2.0;

    let mut prev_val = x[0];
    x[0] = (x[0] * 1.5 + x[1] * 0.5) / NORM;

    for i in 1..len - 1 {
        let current_val = x[i];
        x[i] = (prev_val * W_SIDE + current_val * W_CENTER + x[i + 1] * W_SIDE) / NORM;
        prev_val = current_val;
    }
    x[len - 1] = (x[len - 1] * 1.5 + prev_val * 0.5) / NORM;
}

/// Picks up to `max_peaks` non-overlapping peaks on a smoothed copy of
/// `summed`, most intense first.
///
/// Apexes are strictly positive local maxima; shoulders of an already
/// picked peak are skipped. A series without positive values has no
/// peak.
pub fn pick_peaks(summed: &[f32], max_peaks: usize) -> Vec<PeakBoundary> {
    let mut smoothed = summed.to_vec();
    gaussblur_in_place(&mut smoothed);

    let mut picker = PeakPicker::new(&smoothed);
    let mut out = Vec::with_capacity(max_peaks);
    while out.len() < max_peaks {
        let Some((val, apex)) = picker.next_peak() else {
            break;
        };
        if val <= 0.0 {
            break;
        }
        if !picker.is_local_max(apex) {
            picker.mask(apex..apex + 1);
            continue;
        }
        let raise = count_falling_steps(apex, -1, &smoothed) as usize;
        let fall = count_falling_steps(apex, 1, &smoothed) as usize;
        let left = apex + 1 - raise.max(1);
        let right = apex + fall.max(1) - 1;
        picker.mask(left..right + 1);
        out.push(PeakBoundary { apex, left, right });
    }
    out
}
