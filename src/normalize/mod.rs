//! Metric normalizer
//!
//! Converts a raw test payload into derived physical quantities, an optional
//! status label and a fixed-cutoff [`Performance`]. Every function here is pure;
//! a record's derived state is only ever produced by [`MetricNormalizer::normalize`].

mod functional;
mod health;
mod mental;
mod power;
mod readiness;
mod reflex;
mod speed;

pub use health::cooper_category;
pub use mental::{RESPONSE_TIMEOUT_MS, TARGET_REACTION_MS};

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;
use crate::hrf::HrfCatalog;
use crate::inputs::RawInputs;
use crate::models::{DerivedFields, Gender, Performance, TestType};
use crate::thresholds::{ThresholdEntry, ThresholdTable};

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.81;

/// Output of a single normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub derived: DerivedFields,
    pub status: Option<String>,
    pub performance: Performance,
}

/// What a test family computes before rating
#[derive(Debug, Default)]
pub(crate) struct Computed {
    pub derived: DerivedFields,
    pub status: Option<String>,
}

impl Computed {
    fn new(derived: DerivedFields) -> Self {
        Self {
            derived,
            status: None,
        }
    }

    fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Normalizer configured with a threshold table and assessment definitions
#[derive(Debug, Clone, Default)]
pub struct MetricNormalizer {
    thresholds: ThresholdTable,
    hrf_catalog: HrfCatalog,
}

impl MetricNormalizer {
    /// Normalizer using the built-in ladders and assessment definitions
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: ThresholdTable) -> Self {
        Self {
            thresholds,
            hrf_catalog: HrfCatalog::default(),
        }
    }

    pub fn with_hrf_catalog(mut self, hrf_catalog: HrfCatalog) -> Self {
        self.hrf_catalog = hrf_catalog;
        self
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn hrf_catalog(&self) -> &HrfCatalog {
        &self.hrf_catalog
    }

    /// Compute derived fields, status and performance for one payload
    pub fn normalize(
        &self,
        test_type: TestType,
        inputs: &RawInputs,
    ) -> Result<Normalized, InvalidInputError> {
        let _span = tracing::debug_span!("normalize", test_type = test_type.slug()).entered();

        let computed = match test_type {
            TestType::DailyReadiness => readiness::daily_readiness(inputs),
            TestType::CustomObstacleCircuit => functional::obstacle_circuit(inputs),
            TestType::Ioct => functional::ioct(inputs),
            TestType::SimpleReactionTime => reflex::simple_reaction_time(inputs),
            TestType::VestibuloOcularReflex => reflex::vestibulo_ocular(inputs),
            TestType::HReflex => reflex::h_reflex(inputs),
            TestType::DeepTendonReflex => reflex::deep_tendon(inputs),
            TestType::MaxRunupSpeed => speed::max_runup_speed(inputs),
            TestType::YoYoIntermittentRecovery => speed::yo_yo(inputs),
            TestType::IllinoisAgilityTest => speed::illinois(inputs),
            TestType::Agility505 => speed::agility_505(inputs),
            TestType::TTest => speed::t_test(inputs),
            TestType::TimingGates => speed::timing_gates(inputs),
            TestType::VerticalJump => power::vertical_jump(inputs),
            TestType::BroadJump => power::broad_jump(inputs),
            TestType::TimeToPeakForce => power::time_to_peak_force(inputs),
            TestType::WingateAnaerobicTest => power::wingate(inputs),
            TestType::FlightTest => power::flight_test(inputs),
            TestType::MentalNeuralSession => mental::session(inputs),
            TestType::CooperTest => health::cooper(inputs),
            TestType::HrfAssessment => health::assessment(inputs, &self.hrf_catalog),
        }?;

        let gender = inputs.gender()?;
        let performance = self.rate(test_type, gender, &computed.derived, inputs);

        tracing::debug!(
            derived = computed.derived.len(),
            rating = %performance.rating,
            "Normalized test inputs"
        );

        Ok(Normalized {
            derived: computed.derived,
            status: computed.status,
            performance,
        })
    }

    /// Ladder for the test, if any, together with the value it reads
    pub fn ladder_value<'a>(
        &'a self,
        test_type: TestType,
        gender: Option<Gender>,
        derived: &DerivedFields,
        inputs: &RawInputs,
    ) -> Option<(&'a ThresholdEntry, f64)> {
        let entry = self.thresholds.lookup(test_type, gender)?;
        let value = derived
            .get(&entry.metric)
            .or_else(|| inputs.number(&entry.metric))?;
        Some((entry, value))
    }

    fn rate(
        &self,
        test_type: TestType,
        gender: Option<Gender>,
        derived: &DerivedFields,
        inputs: &RawInputs,
    ) -> Performance {
        match self.ladder_value(test_type, gender, derived, inputs) {
            Some((entry, value)) => entry.performance(value),
            None => Performance::default(),
        }
    }
}

/// Population standard deviation; zero for fewer than two samples
pub(crate) fn population_std_dev(values: &[f64]) -> f64 {
    use statrs::statistics::Statistics;

    if values.len() < 2 {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Arithmetic mean; `None` for an empty slice
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    use statrs::statistics::Statistics;

    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}
