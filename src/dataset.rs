use anyhow::{anyhow, Result};
use csv::ReaderBuilder;
use ndarray::{s, Array2};
use rand::prelude::*;
use std::fs::File;
use std::ops::Range;
use std::path::Path;

use crate::error::Error;
use crate::point::Point;

/// The points being clustered. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    points: Vec<Point>,
}

impl Dataset {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Sample `n` points uniformly from `x_range` × `y_range`.
    pub fn generate<R: Rng + ?Sized>(
        n: usize,
        x_range: Range<f64>,
        y_range: Range<f64>,
        rng: &mut R,
    ) -> Self {
        let points = (0..n)
            .map(|_| Point::new(sample(rng, &x_range), sample(rng, &y_range)))
            .collect();
        Self { points }
    }

    /// Read a TSV file with a header line; the first two columns are x and y.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| anyhow!("Failed to open {:?}: {}", path.as_ref(), e))?;

        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(file);

        let mut records: Vec<Vec<f64>> = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| anyhow!("Error reading record {}: {}", i, e))?;
            let row = record
                .iter()
                .map(|x| match x.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    _ => Err(anyhow!("Record {}: '{}' is not a finite number", i, x)),
                })
                .collect::<Result<Vec<f64>>>()?;
            records.push(row);
        }

        if records.is_empty() {
            return Err(anyhow!("No data lines found in {:?}", path.as_ref()));
        }

        let nrows = records.len();
        let ncols = records[0].len();
        let flat: Vec<f64> = records.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((nrows, ncols), flat)?;

        Self::from_array(&data).map_err(|e| anyhow!("{:?}: {}", path.as_ref(), e))
    }

    /// Take the first two columns of `data` as x and y.
    pub fn from_array(data: &Array2<f64>) -> Result<Self> {
        if data.ncols() < 2 {
            return Err(anyhow!("needs at least two columns, found {}", data.ncols()));
        }
        let points = data
            .slice(s![.., 0..2])
            .outer_iter()
            .map(|row| Point::new(row[0], row[1]))
            .collect();
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn sample<R: Rng + ?Sized>(rng: &mut R, range: &Range<f64>) -> f64 {
    if range.is_empty() {
        range.start
    } else {
        rng.gen_range(range.clone())
    }
}

/// Manually picked centroids in click order, capped at `k`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentroidSet {
    points: Vec<Point>,
}

impl CentroidSet {
    /// Append `p` unless `cap` picks were already made.
    pub fn push_capped(&mut self, p: Point, cap: usize) -> Result<usize, Error> {
        if self.points.len() >= cap {
            return Err(Error::CentroidLimitReached { k: cap });
        }
        self.points.push(p);
        Ok(self.points.len())
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
