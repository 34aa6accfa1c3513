//! Batch identification of scene files.
//!
//! Input files hold one scene per line (comma-separated `x, y, magnitude`
//! triples); blank lines are skipped. Output files hold one line per scene:
//! the catalog id or `-1` for each detection, in detection order.

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use rayon::prelude::*;
use tracing::info;

use crate::solver::{IdentifyResult, Nvida};
use crate::Scene;

/// Totals over one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub scenes: usize,
    pub matches: usize,
    /// Triangles evaluated over all scenes.
    pub triangles: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[IdentifyResult]) -> Self {
        Self {
            scenes: results.len(),
            matches: results.iter().filter(|r| r.is_match()).count(),
            triangles: results.iter().map(|r| r.num_triangles).sum(),
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scenes, {} matched, {} triangles tried",
            self.scenes, self.matches, self.triangles
        )
    }
}

/// Parse scene lines, skipping blank ones. Fails on the first malformed line
/// with its 1-based line number.
pub fn parse_scenes<'l, I>(nvida: &Nvida<'_>, lines: I) -> anyhow::Result<Vec<Scene>>
where
    I: IntoIterator<Item = &'l str>,
{
    lines
        .into_iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            Scene::parse(line, nvida.camera).with_context(|| format!("line {}", idx + 1))
        })
        .collect()
}

/// Identify scenes in parallel. Results are in input order.
pub fn identify_scenes(nvida: &Nvida<'_>, scenes: &[Scene]) -> Vec<IdentifyResult> {
    scenes
        .par_iter()
        .map(|scene| nvida.identify_stars(scene))
        .collect()
}

/// Parse and identify scene lines in parallel. Nothing is identified if any
/// line is malformed.
pub fn identify_lines<'l, I>(nvida: &Nvida<'_>, lines: I) -> anyhow::Result<Vec<IdentifyResult>>
where
    I: IntoIterator<Item = &'l str>,
{
    let scenes = parse_scenes(nvida, lines)?;
    Ok(identify_scenes(nvida, &scenes))
}

/// Identify every scene of `input` and write the results to `output`.
///
/// A malformed line aborts the batch before `output` is created.
pub fn run_batch<P: AsRef<Path>, Q: AsRef<Path>>(
    nvida: &Nvida<'_>,
    input: P,
    output: Q,
) -> anyhow::Result<BatchSummary> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let t0 = Instant::now();

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading scenes from {}", input.display()))?;
    let scenes = parse_scenes(nvida, text.lines())
        .with_context(|| format!("malformed scene in {}", input.display()))?;
    info!("Identifying {} scenes from {}", scenes.len(), input.display());

    let results = identify_scenes(nvida, &scenes);

    let file = std::fs::File::create(output)
        .with_context(|| format!("creating {}", output.display()))?;
    let mut out = BufWriter::new(file);
    for r in &results {
        writeln!(out, "{}", r.to_csv_line())?;
    }
    out.flush()?;

    let summary = BatchSummary::from_results(&results);
    info!(
        "Batch complete in {:.1} s: {}",
        t0.elapsed().as_secs_f64(),
        summary
    );
    Ok(summary)
}
