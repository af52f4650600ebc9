//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Stochastic resampling of loads to estimate voltage-drop risk."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
//! Trial `i` draws from its own generator seeded with `seed + i`, so the sample set
//! does not depend on how rayon schedules the trials.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::info;

use crate::{
    model::{Catalogs, NetworkPoint, ScenarioParams},
    settings::EngineConstants,
    topology::Topology,
    warnings::WarningLog,
    Engine,
};

pub const HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub iterations: usize,
    pub failures: usize,
    pub limit_percent: f64,
    pub stability_index: f64,
    pub failure_risk: f64,
    pub mean_max_drop_percent: f64,
    pub p95_max_drop_percent: f64,
    pub min_max_drop_percent: f64,
    pub max_max_drop_percent: f64,
    pub histogram: Vec<HistogramBin>,
}

pub(crate) fn simulate(
    engine: &Engine,
    points: &[NetworkPoint],
    topology: &Topology,
    params: &ScenarioParams,
    catalogs: &Catalogs,
    iterations: usize,
) -> RiskSummary {
    let settings = engine.settings();
    let constants = &settings.constants;
    let seed = constants.monte_carlo_seed;

    let samples: Vec<f64> = (0..iterations)
        .into_par_iter()
        .map(|trial| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(trial as u64));
            let perturbed = perturb(points, &mut rng, constants);
            let mut log = WarningLog::quiet(&settings.warnings);
            let (_, physics) = engine.run_passes(&perturbed, topology, params, catalogs, &mut log);
            physics.max_voltage_drop_percent
        })
        .collect();

    let summary = summarize(samples, params.profile.max_voltage_drop_percent);
    info!(
        iterations,
        failures = summary.failures,
        stability = summary.stability_index,
        p95 = summary.p95_max_drop_percent,
        "monte carlo finished"
    );
    summary
}

/// Copy of `points` with every load scaled by an independent uniform draw.
pub fn perturb(
    points: &[NetworkPoint],
    rng: &mut impl Rng,
    constants: &EngineConstants,
) -> Vec<NetworkPoint> {
    points
        .iter()
        .map(|point| {
            let mut point = point.clone();
            let residences = draw(rng, constants.residence_spread);
            let point_load = draw(rng, constants.point_load_spread);
            let solar = draw(rng, constants.solar_spread);

            let counts = &mut point.load.residences;
            counts.mono = scale_count(counts.mono, residences);
            counts.bi = scale_count(counts.bi, residences);
            counts.tri = scale_count(counts.tri, residences);
            point.load.point_load_kva *= point_load;
            if let Some(installation) = point.load.solar.as_mut() {
                installation.kva *= solar;
            }
            point
        })
        .collect()
}

fn draw(rng: &mut impl Rng, (a, b): (f64, f64)) -> f64 {
    rng.gen_range(a.min(b)..=a.max(b))
}

fn scale_count(count: u32, factor: f64) -> u32 {
    (count as f64 * factor).round().max(0.0) as u32
}

/// Sorts the per-trial maxima and derives the risk statistics.
pub fn summarize(mut samples: Vec<f64>, limit_percent: f64) -> RiskSummary {
    samples.sort_by(|a, b| a.total_cmp(b));
    let n = samples.len();
    if n == 0 {
        return RiskSummary {
            iterations: 0,
            failures: 0,
            limit_percent,
            stability_index: 100.0,
            failure_risk: 0.0,
            mean_max_drop_percent: 0.0,
            p95_max_drop_percent: 0.0,
            min_max_drop_percent: 0.0,
            max_max_drop_percent: 0.0,
            histogram: Vec::new(),
        };
    }

    let failures = samples.iter().filter(|&&v| v > limit_percent).count();
    let stability_index = 100.0 * (n - failures) as f64 / n as f64;
    let failure_risk = 100.0 - stability_index;
    let p95_index = ((0.95 * n as f64).floor() as usize).min(n - 1);
    let min = samples[0];
    let max = samples[n - 1];

    RiskSummary {
        iterations: n,
        failures,
        limit_percent,
        stability_index,
        failure_risk,
        mean_max_drop_percent: samples.iter().mean(),
        p95_max_drop_percent: samples[p95_index],
        min_max_drop_percent: min,
        max_max_drop_percent: max,
        histogram: histogram(&samples, min, max),
    }
}

fn histogram(samples: &[f64], min: f64, max: f64) -> Vec<HistogramBin> {
    let width = (max - min) / HISTOGRAM_BINS as f64;
    let mut bins: Vec<HistogramBin> = (0..HISTOGRAM_BINS)
        .map(|i| HistogramBin {
            lower: min + i as f64 * width,
            upper: if i + 1 == HISTOGRAM_BINS {
                max
            } else {
                min + (i + 1) as f64 * width
            },
            count: 0,
        })
        .collect();
    for &value in samples {
        let slot = if width > 0.0 {
            (((value - min) / width).floor() as usize).min(HISTOGRAM_BINS - 1)
        } else {
            0
        };
        bins[slot].count += 1;
    }
    bins
}
