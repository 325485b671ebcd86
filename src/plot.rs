//! Render sinks for a terminal.

use serde::Serialize;
use std::io::Write;
use tracing::warn;

use crate::point::Point;
use crate::render::{Frame, Notice, RenderSink};

const GLYPHS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// ASCII scatter plot. Unlabelled points are `.`, labelled points show
/// their cluster glyph, centroids are `X`.
pub struct TerminalPlot<W: Write + Send> {
    out: W,
    width: usize,
    height: usize,
}

impl<W: Write + Send> TerminalPlot<W> {
    pub fn new(out: W) -> Self {
        Self::with_size(out, 60, 20)
    }

    pub fn with_size(out: W, width: usize, height: usize) -> Self {
        Self {
            out,
            width: width.max(2),
            height: height.max(2),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Lay the frame out on a character grid, top row first.
    pub fn grid(&self, frame: &Frame<'_>) -> Vec<String> {
        let all = frame.points.iter().chain(frame.centroids.iter());
        let Some(bounds) = Bounds::of(all) else {
            return Vec::new();
        };

        let mut cells = vec![vec![b' '; self.width]; self.height];
        for (i, p) in frame.points.iter().enumerate() {
            let glyph = frame
                .labels
                .get(i)
                .map(|&l| GLYPHS[l % GLYPHS.len()])
                .unwrap_or(b'.');
            let (row, col) = bounds.cell(p, self.width, self.height);
            cells[row][col] = glyph;
        }
        for c in frame.centroids {
            let (row, col) = bounds.cell(c, self.width, self.height);
            cells[row][col] = b'X';
        }

        cells
            .into_iter()
            .map(|row| String::from_utf8_lossy(&row).into_owned())
            .collect()
    }

    fn draw(&mut self, frame: &Frame<'_>) -> std::io::Result<()> {
        let rows = self.grid(frame);
        if rows.is_empty() {
            writeln!(self.out, "(empty plot)")?;
            return self.out.flush();
        }
        let border = "-".repeat(self.width);
        writeln!(self.out, "+{}+", border)?;
        for row in rows {
            writeln!(self.out, "|{}|", row)?;
        }
        writeln!(self.out, "+{}+", border)?;
        writeln!(
            self.out,
            "{} points, {} centroids{}",
            frame.points.len(),
            frame.centroids.len(),
            if frame.labels.is_empty() { "" } else { ", labelled" }
        )?;
        self.out.flush()
    }
}

impl<W: Write + Send> RenderSink for TerminalPlot<W> {
    fn render(&mut self, frame: Frame<'_>) {
        if let Err(e) = self.draw(&frame) {
            warn!(error = %e, "could not draw plot");
        }
    }

    fn notify(&mut self, notice: &Notice) {
        if let Err(e) = writeln!(self.out, ">> {}", notice).and_then(|_| self.out.flush()) {
            warn!(error = %e, "could not write notice");
        }
    }
}

struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn of<'a>(points: impl Iterator<Item = &'a Point>) -> Option<Self> {
        points.fold(None, |acc, p| {
            Some(match acc {
                None => Bounds { min_x: p.x, max_x: p.x, min_y: p.y, max_y: p.y },
                Some(b) => Bounds {
                    min_x: b.min_x.min(p.x),
                    max_x: b.max_x.max(p.x),
                    min_y: b.min_y.min(p.y),
                    max_y: b.max_y.max(p.y),
                },
            })
        })
    }

    fn cell(&self, p: &Point, width: usize, height: usize) -> (usize, usize) {
        let col = scale(p.x, self.min_x, self.max_x, width);
        let row = height - 1 - scale(p.y, self.min_y, self.max_y, height);
        (row, col)
    }
}

fn scale(v: f64, min: f64, max: f64, cells: usize) -> usize {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return 0;
    }
    let pos = ((v - min) / span * (cells - 1) as f64).round();
    (pos.max(0.0) as usize).min(cells - 1)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Line<'a> {
    Frame {
        points: &'a [Point],
        centroids: &'a [Point],
        labels: &'a [usize],
    },
    Notice { message: String },
}

/// One JSON object per line, for piping into a plotting tool.
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &Line<'_>) {
        let result = serde_json::to_writer(&mut self.out, line)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "could not write json line");
        }
    }
}

impl<W: Write + Send> RenderSink for JsonLinesSink<W> {
    fn render(&mut self, frame: Frame<'_>) {
        self.emit(&Line::Frame {
            points: frame.points,
            centroids: frame.centroids,
            labels: frame.labels,
        });
    }

    fn notify(&mut self, notice: &Notice) {
        self.emit(&Line::Notice {
            message: notice.to_string(),
        });
    }
}
