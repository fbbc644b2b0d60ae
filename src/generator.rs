//! Random order batches for load testing.
//!
//! Orders get ids `1..=n`, a fair coin for the side, and normally
//! distributed prices and quantities. A configurable share of them are
//! icebergs whose peak is drawn uniformly and capped at half the quantity.
//! All drawn values are clamped to at least 10 and rounded to a multiple of
//! 10, so generated batches always decode into valid orders.

use crate::config::GeneratorConfig;
use crate::order::wire::WireOrder;
use crate::order::{Id, Kind, Side, Volume};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};
use thiserror::Error;

const MIN_VALUE: f64 = 10.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("iceberg probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),
    #[error("invalid normal distribution for {field}: {reason}")]
    InvalidDistribution { field: &'static str, reason: String },
    #[error("invalid peak range: {min}..={max}")]
    InvalidPeakRange { min: f64, max: f64 },
}

/// Seeded source of random orders.
pub struct Generator {
    rng: ChaCha8Rng,
    iceberg_probability: f64,
    price: Normal<f64>,
    quantity: Normal<f64>,
    peak: Uniform<f64>,
}

impl Generator {
    pub fn new(cfg: &GeneratorConfig) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&cfg.iceberg_probability) {
            return Err(Error::InvalidProbability(cfg.iceberg_probability));
        }
        if !(cfg.peak_min.is_finite() && cfg.peak_max.is_finite() && cfg.peak_min <= cfg.peak_max)
        {
            return Err(Error::InvalidPeakRange {
                min: cfg.peak_min,
                max: cfg.peak_max,
            });
        }

        let price = normal("price", cfg.price_mean, cfg.price_deviation)?;
        let quantity = normal("quantity", cfg.quantity_mean, cfg.quantity_deviation)?;

        let rng = match cfg.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            rng,
            iceberg_probability: cfg.iceberg_probability,
            price,
            quantity,
            peak: Uniform::new_inclusive(cfg.peak_min, cfg.peak_max),
        })
    }

    /// Draw one order in wire form. The quantity is the total volume.
    pub fn order(&mut self, id: Id) -> WireOrder {
        let side = if self.rng.gen_bool(0.5) {
            Side::Bid
        } else {
            Side::Ask
        };

        let quantity = round_to_tens(self.quantity.sample(&mut self.rng));
        let (kind, peak) = if self.rng.gen_bool(self.iceberg_probability) {
            let peak = round_to_tens(self.peak.sample(&mut self.rng)).min(quantity / 2);
            (Kind::Iceberg, peak)
        } else {
            (Kind::Limit, 0)
        };
        let price = round_to_tens(self.price.sample(&mut self.rng));

        WireOrder::new(id, kind, side, price, quantity, peak)
    }

    /// Draw `count` orders with ids `1..=count`.
    pub fn orders(&mut self, count: usize) -> Vec<WireOrder> {
        (1..=count as Id).map(|id| self.order(id)).collect()
    }
}

/// Normal distribution with a finite, non-negative deviation. `Normal::new`
/// accepts negative ones.
fn normal(field: &'static str, mean: f64, deviation: f64) -> Result<Normal<f64>, Error> {
    if !(deviation.is_finite() && deviation >= 0.0) {
        return Err(Error::InvalidDistribution {
            field,
            reason: format!("deviation must be finite and non-negative, got {deviation}"),
        });
    }

    Normal::new(mean, deviation).map_err(|e| Error::InvalidDistribution {
        field,
        reason: e.to_string(),
    })
}

fn round_to_tens(value: f64) -> Volume {
    ((value.max(MIN_VALUE) / 10.0).round() * 10.0) as Volume
}
