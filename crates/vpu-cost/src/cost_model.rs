//! The cost-model façade.
//!
//! [`VPUCostModel`] owns the loaded predictor, the preprocessor registry,
//! the LRU cache, the sanitizer, the power-factor tables, and the SHAVE
//! catalog, and orchestrates them: sanitize → preprocess → cache → predict
//! → range-check, with analytic fallbacks when no predictor is loaded.
//!
//! One instance serializes all operations; for parallelism construct one
//! façade per thread.

use crate::cache::LruCache;
use crate::cycles::{Cycles, CyclesInterfaceType, SanityReport};
use crate::error::{CostModelError, Result};
use crate::performance;
use crate::power::{agnostic_activity_factor_formula, VPUPowerFactorLUT};
use crate::preprocessing::{PreprocessingFactory, LATEST_VERSION};
use crate::shave::ShaveCatalog;
use crate::types::{
    DMAWorkload, DPUInfoPack, DPUWorkload, MemoryLocation, SHAVEWorkload, SWOperation, VPUDevice,
    VPUTensor,
};
use crate::validation::DpuSanitizer;
use std::path::Path;
use vpu_models::PredictorModel;

/// Output interface versions this build knows how to interpret.
const SUPPORTED_OUTPUT_VERSIONS: &[u32] = &[1];

/// Predictor outputs at or above this are not representable as cycles.
const HIGH_THRESHOLD: f32 = 4_000_000_000.0;
/// Predictor outputs below this are meaningless; zero itself is allowed.
const LOW_THRESHOLD: f32 = 0.0;
/// Stand-in output when the predictor cannot answer; lands outside the
/// valid interval so it surfaces as a range error.
const DEFAULT_NN_OUTPUT: f32 = -1.0;

/// Default LRU capacity.
const DEFAULT_CACHE_SIZE: usize = 16_384;

/// The VPU cost model.
///
/// Estimates DPU cycle counts through a learned predictor when one is
/// loaded, and through analytic formulas otherwise. DMA and SHAVE costs
/// are always analytic.
#[derive(Debug)]
pub struct VPUCostModel {
    predictor: Option<PredictorModel>,
    factory: PreprocessingFactory,
    active_version: u32,
    cache: LruCache,
    sanitizer: DpuSanitizer,
    power_lut: VPUPowerFactorLUT,
    shave_catalog: ShaveCatalog,
    results_buffer: Vec<f32>,
}

impl VPUCostModel {
    /// Load a cost model from a serialized predictor file.
    ///
    /// A missing or unreadable file logs a warning and yields a model in
    /// the analytic-fallback state, matching the behavior of an empty
    /// path.
    ///
    /// # Errors
    ///
    /// Returns an error only for construction-time contract violations:
    /// the predictor declares an input interface version with no known
    /// preprocessor, or an unsupported output interface version.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        if path.as_os_str().is_empty() {
            return Self::assemble(None);
        }
        match PredictorModel::from_file(path) {
            Ok(model) => Self::assemble(Some(model)),
            Err(e) => {
                tracing::warn!(
                    "Could not load predictor from {}: {e}; using analytic fallback",
                    path.display()
                );
                Self::assemble(None)
            }
        }
    }

    /// Load a cost model from in-memory predictor bytes.
    ///
    /// # Errors
    ///
    /// Same contract as [`VPUCostModel::new`].
    pub fn from_bytes(model_data: &[u8]) -> Result<Self> {
        match PredictorModel::from_bytes(model_data) {
            Ok(model) => Self::assemble(Some(model)),
            Err(e) => {
                tracing::warn!("Could not parse predictor bytes: {e}; using analytic fallback");
                Self::assemble(None)
            }
        }
    }

    /// A cost model with no predictor: every DPU estimate falls back to
    /// the analytic theoretical cycles.
    #[must_use]
    pub fn unloaded() -> Self {
        Self {
            predictor: None,
            factory: PreprocessingFactory::new(),
            active_version: LATEST_VERSION,
            cache: LruCache::new(DEFAULT_CACHE_SIZE),
            sanitizer: DpuSanitizer::new(),
            power_lut: VPUPowerFactorLUT::new(),
            shave_catalog: ShaveCatalog::new(),
            results_buffer: Vec::new(),
        }
    }

    fn assemble(predictor: Option<PredictorModel>) -> Result<Self> {
        let Some(predictor) = predictor else {
            return Ok(Self::unloaded());
        };

        let output_version = predictor.output_interface_version();
        if !SUPPORTED_OUTPUT_VERSIONS.contains(&output_version) {
            tracing::error!("Cannot handle predictor output interface version {output_version}");
            return Err(CostModelError::UnsupportedOutputVersion {
                version: output_version,
            });
        }

        let factory = PreprocessingFactory::new();
        let input_version = predictor.input_interface_version();
        if !factory.exists(input_version) {
            tracing::error!(
                "Cannot create preprocessing stage for interface version {input_version}"
            );
            return Err(CostModelError::UnsupportedInputVersion {
                version: input_version,
            });
        }

        let mut model = Self {
            predictor: Some(predictor),
            factory,
            active_version: input_version,
            cache: LruCache::new(DEFAULT_CACHE_SIZE),
            sanitizer: DpuSanitizer::new(),
            power_lut: VPUPowerFactorLUT::new(),
            shave_catalog: ShaveCatalog::new(),
            results_buffer: Vec::new(),
        };
        model.correlate_preprocessor_with_model_inputs();
        Ok(model)
    }

    /// Align the preprocessor output width with the predictor's declared
    /// input width, resizing (zero-pad or truncate) on mismatch.
    fn correlate_preprocessor_with_model_inputs(&mut self) {
        let Some(model) = self.predictor.as_ref() else {
            return;
        };
        let (_, model_width) = model.input_shape();
        let Some(pre) = self.factory.get_mut(self.active_version) else {
            return;
        };
        if pre.output_size() != model_width {
            tracing::warn!(
                "Changing preprocessing output size ({}) to the model input size ({})",
                pre.output_size(),
                model_width
            );
            pre.set_size(model_width);
        }
    }

    /// True when a predictor is loaded and serving estimates.
    #[must_use]
    pub fn nn_initialized(&self) -> bool {
        self.predictor.is_some()
    }

    /// The half-open interval `[low, high)` of raw predictor outputs that
    /// are converted to cycle counts. Zero is accepted; the high bound is
    /// not.
    #[must_use]
    pub fn nn_valid_interval(&self) -> (f32, f32) {
        (LOW_THRESHOLD, HIGH_THRESHOLD)
    }

    fn is_nn_value_invalid(value: f32) -> bool {
        value >= HIGH_THRESHOLD || value < LOW_THRESHOLD
    }

    fn sanitize_workload(&self, wl: &mut DPUWorkload, report: &mut SanityReport) -> bool {
        self.sanitizer.check_and_sanitize(wl, report);
        report.is_usable()
    }

    /// Raw predictor output for one workload, through the cache.
    fn run_nn(&mut self, wl: &DPUWorkload) -> f32 {
        let Some(pre) = self.factory.get_mut(self.active_version) else {
            return DEFAULT_NN_OUTPUT;
        };
        let descriptor = pre.transform(wl);

        if let Some(cached) = self.cache.get(descriptor) {
            return cached;
        }
        let Some(model) = self.predictor.as_ref() else {
            return DEFAULT_NN_OUTPUT;
        };
        let value = model.predict(descriptor).unwrap_or_else(|e| {
            tracing::warn!("Predictor failed on descriptor: {e}");
            DEFAULT_NN_OUTPUT
        });
        self.cache.add(descriptor, value);
        value
    }

    /// Raw predictor outputs for a batch into `results_buffer`, bypassing
    /// the cache. Results stay in input order.
    fn run_nn_batch(&mut self, workloads: &[DPUWorkload]) {
        self.results_buffer.clear();
        self.results_buffer.resize(workloads.len(), DEFAULT_NN_OUTPUT);

        let Some(model) = self.predictor.as_ref() else {
            return;
        };
        let (batch_size, _) = model.input_shape();
        let batch_size = batch_size.max(1);
        let Some(pre) = self.factory.get_mut(self.active_version) else {
            return;
        };

        let width = pre.output_size();
        let flat = pre.transform_batch(workloads, batch_size);

        for start in (0..workloads.len()).step_by(batch_size) {
            let slice = &flat[start * width..(start + batch_size) * width];
            match model.predict_batch(slice, batch_size) {
                Ok(values) => {
                    let end = (start + batch_size).min(workloads.len());
                    self.results_buffer[start..end].copy_from_slice(&values[..end - start]);
                }
                Err(e) => {
                    tracing::warn!("Batched prediction failed at offset {start}: {e}");
                }
            }
        }
    }

    /// Sanitize, predict, range-check. `wl` is left in its sanitized form
    /// so callers can compute follow-up metrics on what was actually
    /// estimated.
    fn dpu_and_sanitize(&mut self, wl: &mut DPUWorkload, info: &mut String) -> CyclesInterfaceType {
        let inference_possible = self.nn_initialized();
        let mut problems = SanityReport::new();
        let inference_relevant = self.sanitize_workload(wl, &mut problems);
        info.clone_from(&problems.info);

        let mut cycles = problems.value();
        if inference_relevant {
            if inference_possible {
                let raw = self.run_nn(wl);
                if Self::is_nn_value_invalid(raw) {
                    cycles = Cycles::ERROR_INVALID_OUTPUT_RANGE;
                } else {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    {
                        cycles = raw.ceil() as CyclesInterfaceType;
                    }
                }
            } else {
                cycles = Cycles::saturate(performance::dpu_theoretical_cycles(wl));
            }
        }
        cycles
    }

    /// Estimated execution cycles for one workload, or a sentinel error.
    ///
    /// With no predictor loaded this transparently returns the analytic
    /// theoretical cycles.
    pub fn dpu(&mut self, wl: DPUWorkload) -> CyclesInterfaceType {
        let mut info = String::new();
        let mut wl = wl;
        self.dpu_and_sanitize(&mut wl, &mut info)
    }

    /// Like [`VPUCostModel::dpu`] but also returns the validation
    /// findings.
    pub fn dpu_msg(&mut self, wl: DPUWorkload) -> (CyclesInterfaceType, String) {
        let mut info = String::new();
        let mut wl = wl;
        let cycles = self.dpu_and_sanitize(&mut wl, &mut info);
        (cycles, info)
    }

    /// Estimated cycles for a batch of workloads, in input order.
    ///
    /// The predictor is invoked in model-batch-sized slices; the LRU cache
    /// is not consulted on this path.
    pub fn dpu_batch(&mut self, workloads: Vec<DPUWorkload>) -> Vec<CyclesInterfaceType> {
        let mut workloads = workloads;
        let count = workloads.len();
        let inference_possible = self.nn_initialized();

        struct Outcome {
            relevant: bool,
            problems: SanityReport,
        }
        let mut outcomes = Vec::with_capacity(count);
        for wl in &mut workloads {
            let mut problems = SanityReport::new();
            let relevant = self.sanitize_workload(wl, &mut problems);
            outcomes.push(Outcome { relevant, problems });
        }

        if inference_possible {
            self.run_nn_batch(&workloads);
        }

        let mut cycles_vector = Vec::with_capacity(count);
        for (idx, wl) in workloads.iter().enumerate() {
            let outcome = &outcomes[idx];
            let mut cycles = outcome.problems.value();
            if outcome.relevant {
                if inference_possible {
                    let raw = self.results_buffer[idx];
                    if Self::is_nn_value_invalid(raw) {
                        cycles = Cycles::ERROR_INVALID_OUTPUT_RANGE;
                    } else {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        {
                            cycles = raw.ceil() as CyclesInterfaceType;
                        }
                    }
                } else {
                    cycles = Cycles::saturate(performance::dpu_theoretical_cycles(wl));
                }
            }
            cycles_vector.push(cycles);
        }
        cycles_vector
    }

    fn relative_mac_hw_utilization(real: CyclesInterfaceType, ideal: u64) -> f32 {
        if Cycles::is_error_code(real) || real == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            ideal as f32 / real as f32
        }
    }

    fn mac_hw_utilization(
        &mut self,
        wl: &DPUWorkload,
        ideal_cycles: fn(&DPUWorkload) -> u64,
    ) -> f32 {
        let mut w = wl.clone();
        let mut info = String::new();
        let estimated = self.dpu_and_sanitize(&mut w, &mut info);
        Self::relative_mac_hw_utilization(estimated, ideal_cycles(&w))
    }

    /// MAC utilization `[0, 1+]` of the workload: sparse-aware ideal
    /// cycles over estimated cycles. Zero signals problems.
    pub fn hw_utilization(&mut self, wl: &DPUWorkload) -> f32 {
        self.power_mac_hw_utilization(wl)
    }

    /// Utilization against the sparse-adjusted ideal (power reference).
    pub fn power_mac_hw_utilization(&mut self, wl: &DPUWorkload) -> f32 {
        self.mac_hw_utilization(wl, performance::dpu_power_ideal_cycles)
    }

    /// Utilization against the dense ideal; can exceed 1 when sparsity
    /// pays off.
    pub fn efficiency_mac_hw_utilization(&mut self, wl: &DPUWorkload) -> f32 {
        self.mac_hw_utilization(wl, performance::dpu_efficiency_ideal_cycles)
    }

    fn agnostic_activity_factor(&self, wl: &DPUWorkload, reference_hw_utilization: f32) -> f32 {
        let power_factor = self.power_lut.operation_adjustment_factor(wl);
        agnostic_activity_factor_formula(power_factor, reference_hw_utilization, 1.0)
    }

    /// Proxy for [`VPUCostModel::dpu_power_activity_factor`].
    pub fn dpu_activity_factor(&mut self, wl: &DPUWorkload) -> f32 {
        self.dpu_power_activity_factor(wl)
    }

    /// Activity factor relative to the reference power virus, clamped to
    /// the device ceiling.
    pub fn dpu_power_activity_factor(&mut self, wl: &DPUWorkload) -> f32 {
        let utilization = self.power_mac_hw_utilization(wl);
        let rough = self.agnostic_activity_factor(wl, utilization);
        rough.min(self.power_lut.power_virus_exceed_factor(wl.device))
    }

    /// Efficiency activity factor; unclamped.
    pub fn dpu_efficiency_activity_factor(&mut self, wl: &DPUWorkload) -> f32 {
        let utilization = self.efficiency_mac_hw_utilization(wl);
        self.agnostic_activity_factor(wl, utilization)
    }

    fn energy_from_ideal_cycles(&self, wl: &DPUWorkload, reference_ideal_cycles: u64) -> f32 {
        let power_factor = self.power_lut.operation_adjustment_factor(wl);
        #[allow(clippy::cast_precision_loss)]
        {
            reference_ideal_cycles as f32 * power_factor
        }
    }

    /// Relative energy in power-virus-cycles: time and rate cancel, so
    /// this is the sparse-aware ideal cycle count times the power factor.
    #[must_use]
    pub fn dpu_energy(&self, wl: &DPUWorkload) -> f32 {
        self.energy_from_ideal_cycles(wl, performance::dpu_power_ideal_cycles(wl))
    }

    /// Relative energy of a software kernel: constant activity factor 0.5
    /// at 5% of DPU peak power.
    #[must_use]
    pub fn shave_energy(&self, swl: &SWOperation) -> f32 {
        const SHAVE_ACTIVITY_FACTOR: f32 = 0.5;
        const MAX_POWER_RATIO_TO_DPU: f32 = 0.05;
        #[allow(clippy::cast_precision_loss)]
        {
            SHAVE_ACTIVITY_FACTOR * MAX_POWER_RATIO_TO_DPU * self.shave(swl) as f32
        }
    }

    /// Cycles for a DMA transfer described field by field.
    #[must_use]
    pub fn dma(
        &self,
        device: VPUDevice,
        input: &VPUTensor,
        output: &VPUTensor,
        input_location: MemoryLocation,
        output_location: MemoryLocation,
        output_write_tiles: u32,
    ) -> u32 {
        self.dma_workload(&DMAWorkload {
            device,
            input: *input,
            output: *output,
            input_location,
            output_location,
            output_write_tiles,
        })
    }

    /// Cycles for a DMA transfer.
    #[must_use]
    pub fn dma_workload(&self, wl: &DMAWorkload) -> u32 {
        performance::dma_theoretical_cycles(wl)
    }

    /// Cycles for a self-describing software kernel (legacy path: no
    /// catalog lookup, never errors).
    #[must_use]
    pub fn shave(&self, swl: &SWOperation) -> u32 {
        performance::shave_theoretical_cycles(swl)
    }

    /// Cycles for a catalog-resolved SHAVE kernel. Unknown kernels return
    /// `ERROR_INVALID_INPUT_CONFIGURATION` and explain via `info`.
    pub fn shave_2(&self, swl: &SHAVEWorkload, info: &mut String) -> CyclesInterfaceType {
        self.shave_catalog.compute_cycles(swl, info)
    }

    /// Names of the SHAVE kernels modeled for a device.
    #[must_use]
    pub fn shave_supported_operations(&self, device: VPUDevice) -> Vec<String> {
        self.shave_catalog.supported_operations(device)
    }

    /// Analytic hardware lower bound for a workload (no sanitization).
    #[must_use]
    pub fn dpu_theoretical_cycles(&self, wl: &DPUWorkload) -> u64 {
        performance::dpu_theoretical_cycles(wl)
    }

    /// Everything about one workload in a single pass: cycles, energy,
    /// both activity factors and utilizations, MAC counts, and the
    /// analytic bound. The workload is cloned and sanitized once.
    pub fn dpu_info(&mut self, workload: &DPUWorkload) -> DPUInfoPack {
        let mut pack = DPUInfoPack::default();
        let mut w = workload.clone();

        // first: may rewrite w, everything after keys off the sanitized form
        pack.dpu_cycles = self.dpu_and_sanitize(&mut w, &mut pack.err_info);

        pack.sparse_mac_operations = performance::sparse_mac_count(&w);
        pack.power_ideal_cycles = performance::dpu_power_ideal_cycles(&w);
        pack.power_mac_utilization =
            Self::relative_mac_hw_utilization(pack.dpu_cycles, pack.power_ideal_cycles);
        {
            let rough = self.agnostic_activity_factor(&w, pack.power_mac_utilization);
            let ceiling = self.power_lut.power_virus_exceed_factor(w.device);
            pack.power_activity_factor = rough.min(ceiling);
        }
        pack.energy = self.energy_from_ideal_cycles(&w, pack.power_ideal_cycles);

        pack.dense_mac_operations = performance::dense_mac_count(&w);
        pack.efficiency_ideal_cycles = performance::dpu_efficiency_ideal_cycles(&w);
        pack.efficiency_mac_utilization =
            Self::relative_mac_hw_utilization(pack.dpu_cycles, pack.efficiency_ideal_cycles);
        pack.efficiency_activity_factor =
            self.agnostic_activity_factor(&w, pack.efficiency_mac_utilization);

        pack.hw_theoretical_cycles = performance::dpu_theoretical_cycles(&w);
        pack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, ExecutionMode, Operation};

    fn v20_conv() -> DPUWorkload {
        DPUWorkload::dense(
            VPUDevice::V20,
            Operation::Convolution,
            VPUTensor::new(56, 56, 16, 1, DataType::UInt8),
            VPUTensor::new(56, 56, 16, 1, DataType::UInt8),
            [3, 3],
            [1, 1],
            [1, 1, 1, 1],
            ExecutionMode::Vector,
        )
    }

    #[test]
    fn unloaded_model_falls_back_to_theoretical() {
        let mut model = VPUCostModel::unloaded();
        assert!(!model.nn_initialized());
        let wl = v20_conv();
        let expected = model.dpu_theoretical_cycles(&wl);
        assert_eq!(u64::from(model.dpu(wl)), expected);
    }

    #[test]
    fn valid_interval_is_documented_shape() {
        let model = VPUCostModel::unloaded();
        let (low, high) = model.nn_valid_interval();
        assert!((low - 0.0).abs() < f32::EPSILON);
        assert!((high - 4e9).abs() < 1.0);
    }

    #[test]
    fn range_check_edges() {
        assert!(!VPUCostModel::is_nn_value_invalid(0.0));
        // below the threshold by a whole f32 step (ulp at 4e9 is 256)
        assert!(!VPUCostModel::is_nn_value_invalid(HIGH_THRESHOLD - 512.0));
        assert!(VPUCostModel::is_nn_value_invalid(HIGH_THRESHOLD));
        assert!(VPUCostModel::is_nn_value_invalid(-0.001));
    }

    #[test]
    fn utilization_zero_on_error() {
        assert!(
            (VPUCostModel::relative_mac_hw_utilization(Cycles::ERROR_INPUT_TOO_BIG, 1000) - 0.0)
                .abs()
                < f32::EPSILON
        );
        assert!((VPUCostModel::relative_mac_hw_utilization(0, 1000) - 0.0).abs() < f32::EPSILON);
        assert!(
            (VPUCostModel::relative_mac_hw_utilization(2000, 1000) - 0.5).abs() < f32::EPSILON
        );
    }

    #[test]
    fn determinism_on_the_analytic_path() {
        let mut model = VPUCostModel::unloaded();
        assert_eq!(model.dpu(v20_conv()), model.dpu(v20_conv()));
    }
}
