//! 1D and 2D histogram types.
//!
//! Histograms are read-only inputs here: they are loaded from an archive
//! (or built by the synthetic generator) and never mutated by the fits.
//! Binning is uniform; per-bin statistical errors come from the optional
//! sum-of-weights-squared vector when stored, otherwise from the Poisson
//! approximation `sqrt(content)`.

/// A 1D histogram with uniform binning.
#[derive(Debug, Clone)]
pub struct Hist1D {
    /// Histogram name (the archive lookup key).
    pub name: String,
    /// Human-readable title used on plots.
    pub title: String,
    /// Number of bins.
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub x_min: f64,
    /// Upper edge of the last bin.
    pub x_max: f64,
    /// Bin contents (length `n_bins`).
    pub contents: Vec<f64>,
    /// Sum of weights squared per bin, if stored.
    pub sumw2: Option<Vec<f64>>,
    /// Total number of entries.
    pub entries: f64,
}

impl Hist1D {
    /// Width of one bin.
    pub fn bin_width(&self) -> f64 {
        (self.x_max - self.x_min) / self.n_bins as f64
    }

    /// Center of bin `i` (0-based).
    pub fn bin_center(&self, i: usize) -> f64 {
        self.x_min + (i as f64 + 0.5) * self.bin_width()
    }

    /// Centers of all bins.
    pub fn bin_centers(&self) -> Vec<f64> {
        (0..self.n_bins).map(|i| self.bin_center(i)).collect()
    }

    /// Statistical error on bin `i`.
    ///
    /// `sqrt(sumw2[i])` when sumw2 is stored, else `sqrt(content)` for
    /// positive content, else `0`. The chi-square evaluator applies the
    /// unit-error fallback for zero errors; this accessor reports the raw
    /// estimate.
    pub fn bin_error(&self, i: usize) -> f64 {
        match &self.sumw2 {
            Some(w2) => w2[i].max(0.0).sqrt(),
            None => {
                let y = self.contents[i];
                if y > 0.0 { y.sqrt() } else { 0.0 }
            }
        }
    }

    /// Sum of all bin contents.
    pub fn total(&self) -> f64 {
        self.contents.iter().sum()
    }
}

/// A 2D histogram with uniform binning on both axes.
///
/// `contents` is row-major over x: the value of bin `(ix, iy)` lives at
/// index `ix * ny + iy`. The archive codec and the projections share this
/// layout.
#[derive(Debug, Clone)]
pub struct Hist2D {
    /// Histogram name (the archive lookup key).
    pub name: String,
    /// Human-readable title used on plots.
    pub title: String,
    /// Number of bins on the x axis.
    pub nx: usize,
    /// Number of bins on the y axis.
    pub ny: usize,
    /// Lower edge of the first x bin.
    pub x_min: f64,
    /// Upper edge of the last x bin.
    pub x_max: f64,
    /// Lower edge of the first y bin.
    pub y_min: f64,
    /// Upper edge of the last y bin.
    pub y_max: f64,
    /// Bin contents (length `nx * ny`).
    pub contents: Vec<f64>,
    /// Sum of weights squared per bin, if stored.
    pub sumw2: Option<Vec<f64>>,
    /// Total number of entries.
    pub entries: f64,
}

impl Hist2D {
    /// Content of bin `(ix, iy)`.
    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.contents[ix * self.ny + iy]
    }

    /// Width of one x bin.
    pub fn x_width(&self) -> f64 {
        (self.x_max - self.x_min) / self.nx as f64
    }

    /// Width of one y bin.
    pub fn y_width(&self) -> f64 {
        (self.y_max - self.y_min) / self.ny as f64
    }

    /// Center of x bin `ix`.
    pub fn x_center(&self, ix: usize) -> f64 {
        self.x_min + (ix as f64 + 0.5) * self.x_width()
    }

    /// Center of y bin `iy`.
    pub fn y_center(&self, iy: usize) -> f64 {
        self.y_min + (iy as f64 + 0.5) * self.y_width()
    }

    /// Area of one bin.
    pub fn bin_area(&self) -> f64 {
        self.x_width() * self.y_width()
    }

    /// Collapse onto the x axis by summing over y.
    pub fn projection_x(&self) -> Hist1D {
        self.project(true)
    }

    /// Collapse onto the y axis by summing over x.
    pub fn projection_y(&self) -> Hist1D {
        self.project(false)
    }

    fn project(&self, onto_x: bool) -> Hist1D {
        let (n, min, max, axis) = if onto_x {
            (self.nx, self.x_min, self.x_max, "x")
        } else {
            (self.ny, self.y_min, self.y_max, "y")
        };

        let mut contents = vec![0.0; n];
        let mut sumw2 = self.sumw2.as_ref().map(|_| vec![0.0; n]);

        for ix in 0..self.nx {
            for iy in 0..self.ny {
                let k = ix * self.ny + iy;
                let out = if onto_x { ix } else { iy };
                contents[out] += self.contents[k];
                if let (Some(acc), Some(w2)) = (sumw2.as_mut(), self.sumw2.as_ref()) {
                    acc[out] += w2[k];
                }
            }
        }

        Hist1D {
            name: format!("{}_proj{}", self.name, axis),
            title: format!("{} ({} projection)", self.title, axis),
            n_bins: n,
            x_min: min,
            x_max: max,
            contents,
            sumw2,
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_2d() -> Hist2D {
        // 2x3 grid; contents[ix * ny + iy].
        Hist2D {
            name: "h".to_string(),
            title: "h".to_string(),
            nx: 2,
            ny: 3,
            x_min: 0.0,
            x_max: 2.0,
            y_min: 0.0,
            y_max: 3.0,
            contents: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            sumw2: Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            entries: 21.0,
        }
    }

    #[test]
    fn bin_centers_uniform() {
        let h = Hist1D {
            name: "d".to_string(),
            title: "d".to_string(),
            n_bins: 4,
            x_min: 0.0,
            x_max: 8.0,
            contents: vec![0.0; 4],
            sumw2: None,
            entries: 0.0,
        };
        assert!((h.bin_width() - 2.0).abs() < 1e-15);
        assert!((h.bin_center(0) - 1.0).abs() < 1e-15);
        assert!((h.bin_center(3) - 7.0).abs() < 1e-15);
    }

    #[test]
    fn bin_error_prefers_sumw2() {
        let h = Hist1D {
            name: "d".to_string(),
            title: "d".to_string(),
            n_bins: 2,
            x_min: 0.0,
            x_max: 2.0,
            contents: vec![4.0, 0.0],
            sumw2: Some(vec![9.0, 0.0]),
            entries: 4.0,
        };
        assert!((h.bin_error(0) - 3.0).abs() < 1e-15);
        assert!(h.bin_error(1).abs() < 1e-15);

        let h_poisson = Hist1D { sumw2: None, ..h };
        assert!((h_poisson.bin_error(0) - 2.0).abs() < 1e-15);
        assert!(h_poisson.bin_error(1).abs() < 1e-15);
    }

    #[test]
    fn projection_x_sums_over_y() {
        let h = small_2d();
        let px = h.projection_x();
        assert_eq!(px.n_bins, 2);
        assert!((px.contents[0] - 6.0).abs() < 1e-15);
        assert!((px.contents[1] - 15.0).abs() < 1e-15);
        assert!((px.x_min - 0.0).abs() < 1e-15);
        assert!((px.x_max - 2.0).abs() < 1e-15);
        let w2 = px.sumw2.unwrap();
        assert!((w2[0] - 6.0).abs() < 1e-15);
        assert!((w2[1] - 15.0).abs() < 1e-15);
    }

    #[test]
    fn projection_y_sums_over_x() {
        let h = small_2d();
        let py = h.projection_y();
        assert_eq!(py.n_bins, 3);
        assert!((py.contents[0] - 5.0).abs() < 1e-15);
        assert!((py.contents[1] - 7.0).abs() < 1e-15);
        assert!((py.contents[2] - 9.0).abs() < 1e-15);
        assert!((py.x_max - 3.0).abs() < 1e-15);
    }

    #[test]
    fn projections_preserve_total() {
        let h = small_2d();
        let total: f64 = h.contents.iter().sum();
        assert!((h.projection_x().total() - total).abs() < 1e-12);
        assert!((h.projection_y().total() - total).abs() < 1e-12);
    }
}
