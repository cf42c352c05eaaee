//! Equal-width binning for the scatterplot-matrix diagonal.

/// One histogram bar covering `[lo, hi)` (the last bin also includes `hi`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Sturges' rule: `ceil(log2(n)) + 1`, at least one bin.
pub fn sturges_bins(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    (n as f64).log2().ceil() as usize + 1
}

/// Bin the finite `values` into `bins` equal-width bins over their range.
///
/// A constant sample gets a single unit-wide bin centred on the value.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let Some(lo) = finite.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let hi = finite.iter().copied().fold(lo, f64::max);

    if lo == hi || bins <= 1 {
        let (a, b) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
        return vec![Bin {
            lo: a,
            hi: b,
            count: finite.len(),
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lo: lo + width * i as f64,
            hi: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}
