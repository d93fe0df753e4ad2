//! End-to-end façade tests: sanitization scenarios, predictor-driven
//! estimation against synthesized containers, and batch/single agreement.

use vpu_cost::prelude::*;
use vpu_cost::validation::DpuSanitizer;
use vpu_cost::{CostModelError, IsiStrategy};

/// Build a predictor container with a single dense layer: mostly-zero
/// weights (overridable per index) and a bias on the scalar head.
fn predictor_bytes(input_version: u32, width: u32, weights: &[(usize, f32)], bias: f32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"VPNN");
    for v in [1u32, input_version, 1, 2, width, 1] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    let mut row = vec![0.0f32; width as usize];
    for &(idx, w) in weights {
        row[idx] = w;
    }
    for w in row {
        buf.extend_from_slice(&w.to_le_bytes());
    }
    buf.extend_from_slice(&bias.to_le_bytes());
    buf
}

fn constant_model(output: f32) -> VPUCostModel {
    VPUCostModel::from_bytes(&predictor_bytes(11, 61, &[], output)).unwrap()
}

fn v20_conv_56x56() -> DPUWorkload {
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

fn v27_conv(ic: u32, oc: u32) -> DPUWorkload {
    DPUWorkload::dense(
        VPUDevice::V27,
        Operation::Convolution,
        VPUTensor::new(16, 16, ic, 1, DataType::UInt8),
        VPUTensor::new(16, 16, oc, 1, DataType::UInt8),
        [1, 1],
        [1, 1],
        [0, 0, 0, 0],
        ExecutionMode::Cuboid16x16,
    )
}

// --- scenario suite -------------------------------------------------------

#[test]
fn v20_conv_theoretical_cycles_and_fallback() {
    let mut model = VPUCostModel::unloaded();
    let wl = v20_conv_56x56();

    let (cycles, info) = model.dpu_msg(wl.clone());
    assert!(!Cycles::is_error_code(cycles), "{info}");
    assert!(cycles > 0);
    // 56·56·16·16·3·3 MACs over the 256-wide V20 vector array
    assert_eq!(u64::from(cycles), 56 * 56 * 16 * 16 * 3 * 3 / 256);
    assert_eq!(u64::from(cycles), model.dpu_theoretical_cycles(&wl));
}

#[test]
fn v27_small_ic_conv_sanitizes_to_compressed() {
    let sanitizer = DpuSanitizer::new();
    let mut wl = v27_conv(8, 64);
    let mut report = SanityReport::new();
    sanitizer.check_and_sanitize(&mut wl, &mut report);
    assert!(report.is_usable(), "{}", report.info);
    assert_eq!(wl.op, Operation::CmConvolution);
}

#[test]
fn v27_avgpool_sanitizes_to_depthwise() {
    let sanitizer = DpuSanitizer::new();
    let mut wl = DPUWorkload::dense(
        VPUDevice::V27,
        Operation::AvePool,
        VPUTensor::new(14, 14, 256, 1, DataType::UInt8),
        VPUTensor::new(8, 8, 256, 1, DataType::UInt8),
        [7, 7],
        [1, 1],
        [0, 0, 0, 0],
        ExecutionMode::Cuboid16x16,
    );
    let mut report = SanityReport::new();
    sanitizer.check_and_sanitize(&mut wl, &mut report);
    assert!(report.is_usable(), "{}", report.info);
    assert_eq!(wl.op, Operation::DwConvolution);
}

#[test]
fn oversized_eltwise_reports_input_too_big() {
    let mut model = VPUCostModel::unloaded();
    let wl = DPUWorkload::dense(
        VPUDevice::V27,
        Operation::Eltwise,
        VPUTensor::new(1600, 1600, 64, 1, DataType::UInt8),
        VPUTensor::new(1600, 1600, 64, 1, DataType::UInt8),
        [1, 1],
        [1, 1],
        [0, 0, 0, 0],
        ExecutionMode::Cuboid16x16,
    );
    assert_eq!(model.dpu(wl), Cycles::ERROR_INPUT_TOO_BIG);
}

#[test]
fn invalid_operation_reports_invalid_operation() {
    let mut model = VPUCostModel::unloaded();
    let mut wl = v27_conv(64, 64);
    wl.op = Operation::Invalid;
    assert_eq!(model.dpu(wl), Cycles::ERROR_INVALID_INPUT_OPERATION);
}

#[test]
fn mixed_float_workload_passes_after_canonicalization() {
    let mut model = VPUCostModel::unloaded();
    let mut wl = v27_conv(64, 64);
    wl.inputs[0] = VPUTensor::new(16, 16, 64, 1, DataType::BFloat16);
    wl.outputs[0] = VPUTensor::new(16, 16, 64, 1, DataType::Float16);
    let (cycles, info) = model.dpu_msg(wl);
    assert!(!Cycles::is_error_code(cycles), "{info}");
}

// --- predictor-driven paths ----------------------------------------------

#[test]
fn constant_predictor_output_becomes_ceiled_cycles() {
    let mut model = constant_model(1000.5);
    assert!(model.nn_initialized());
    assert_eq!(model.dpu(v27_conv(64, 64)), 1001);
}

#[test]
fn negative_predictor_output_is_a_range_error() {
    let mut model = constant_model(-5.0);
    assert_eq!(model.dpu(v27_conv(64, 64)), Cycles::ERROR_INVALID_OUTPUT_RANGE);
}

#[test]
fn zero_predictor_output_is_accepted() {
    let mut model = constant_model(0.0);
    assert_eq!(model.dpu(v27_conv(64, 64)), 0);
}

#[test]
fn high_threshold_is_rejected_inclusive() {
    // exactly 4e9 is outside the half-open valid interval
    let mut at_threshold = constant_model(4_000_000_000.0);
    assert_eq!(
        at_threshold.dpu(v27_conv(64, 64)),
        Cycles::ERROR_INVALID_OUTPUT_RANGE
    );

    let mut below = constant_model(3_999_999_744.0);
    assert!(!Cycles::is_error_code(below.dpu(v27_conv(64, 64))));
}

#[test]
fn sanitizer_errors_win_over_the_predictor() {
    let mut model = constant_model(1000.0);
    let mut wl = v27_conv(64, 64);
    wl.op = Operation::Invalid;
    assert_eq!(model.dpu(wl), Cycles::ERROR_INVALID_INPUT_OPERATION);
}

#[test]
fn repeated_estimation_is_deterministic() {
    let mut model = constant_model(1234.0);
    let first = model.dpu(v27_conv(64, 64));
    let second = model.dpu(v27_conv(64, 64)); // served from cache
    let third = model.dpu(v27_conv(64, 64));
    assert_eq!(first, 1234);
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn predictor_sees_the_descriptor() {
    // weight 1.0 on the input-channel field (index 13 of the v11 layout):
    // predicted cycles equal the input channel count
    let mut model =
        VPUCostModel::from_bytes(&predictor_bytes(11, 61, &[(13, 1.0)], 0.0)).unwrap();
    assert_eq!(model.dpu(v27_conv(64, 64)), 64);
    assert_eq!(model.dpu(v27_conv(32, 32)), 32);
}

#[test]
fn batch_agrees_with_single_and_preserves_order() {
    let workloads = vec![v27_conv(64, 64), v27_conv(32, 32), v27_conv(128, 128)];

    let mut batch_model =
        VPUCostModel::from_bytes(&predictor_bytes(11, 61, &[(13, 1.0)], 0.0)).unwrap();
    let batched = batch_model.dpu_batch(workloads.clone());
    assert_eq!(batched, vec![64, 32, 128]);

    let mut single_model =
        VPUCostModel::from_bytes(&predictor_bytes(11, 61, &[(13, 1.0)], 0.0)).unwrap();
    let singles: Vec<_> = workloads
        .into_iter()
        .map(|wl| single_model.dpu(wl))
        .collect();
    assert_eq!(batched, singles);
}

#[test]
fn batch_mixes_errors_and_estimates_in_order() {
    let mut model = constant_model(500.0);
    let mut invalid = v27_conv(64, 64);
    invalid.op = Operation::Invalid;
    let too_big = DPUWorkload::dense(
        VPUDevice::V27,
        Operation::Eltwise,
        VPUTensor::new(1600, 1600, 64, 1, DataType::UInt8),
        VPUTensor::new(1600, 1600, 64, 1, DataType::UInt8),
        [1, 1],
        [1, 1],
        [0, 0, 0, 0],
        ExecutionMode::Cuboid16x16,
    );

    let results = model.dpu_batch(vec![v27_conv(64, 64), invalid, too_big, v27_conv(32, 32)]);
    assert_eq!(
        results,
        vec![
            500,
            Cycles::ERROR_INVALID_INPUT_OPERATION,
            Cycles::ERROR_INPUT_TOO_BIG,
            500,
        ]
    );
}

#[test]
fn descriptor_width_mismatch_is_correlated_away() {
    // the container claims width 64; the v11 layout natively produces 61
    // and must be zero-padded to match
    let mut model = VPUCostModel::from_bytes(&predictor_bytes(11, 64, &[], 77.0)).unwrap();
    assert_eq!(model.dpu(v27_conv(64, 64)), 77);
}

// --- construction contract ------------------------------------------------

#[test]
fn unsupported_output_version_fails_construction() {
    let mut bytes = predictor_bytes(11, 61, &[], 1.0);
    // output interface version lives at offset 12
    bytes[12..16].copy_from_slice(&9u32.to_le_bytes());
    match VPUCostModel::from_bytes(&bytes) {
        Err(CostModelError::UnsupportedOutputVersion { version: 9 }) => {}
        other => panic!("expected UnsupportedOutputVersion, got {other:?}"),
    }
}

#[test]
fn unsupported_input_version_fails_construction() {
    let bytes = predictor_bytes(7, 61, &[], 1.0);
    match VPUCostModel::from_bytes(&bytes) {
        Err(CostModelError::UnsupportedInputVersion { version: 7 }) => {}
        other => panic!("expected UnsupportedInputVersion, got {other:?}"),
    }
}

#[test]
fn missing_model_file_degrades_to_analytic() {
    let model = VPUCostModel::new("/nonexistent/predictor.vpnn").unwrap();
    assert!(!model.nn_initialized());
}

#[test]
fn corrupt_model_bytes_degrade_to_analytic() {
    let model = VPUCostModel::from_bytes(b"garbage").unwrap();
    assert!(!model.nn_initialized());
}

// --- utilization, activity factor, energy ---------------------------------

#[test]
fn utilization_is_ideal_over_estimated() {
    let wl = v20_conv_56x56();
    let ideal = vpu_cost::performance::dpu_power_ideal_cycles(&wl);

    // predictor answers exactly twice the ideal: utilization 0.5
    #[allow(clippy::cast_precision_loss)]
    let mut model = constant_model((ideal * 2) as f32);
    let utilization = model.hw_utilization(&wl);
    assert!((utilization - 0.5).abs() < 1e-3, "{utilization}");
}

#[test]
fn efficiency_utilization_dominates_power_utilization_under_sparsity() {
    let mut wl = v27_conv(64, 64);
    wl.weight_sparsity_enabled = true;
    wl.weight_sparsity_rate = 0.5;

    let mut model = constant_model(1000.0);
    let power = model.power_mac_hw_utilization(&wl);
    let efficiency = model.efficiency_mac_hw_utilization(&wl);
    assert!(power > 0.0);
    assert!(efficiency > power);
}

#[test]
fn power_activity_factor_is_clamped_to_the_virus_ceiling() {
    // absurdly fast predictor answer drives utilization sky high; the
    // power AF must stay at the V27 ceiling while efficiency AF runs free
    let mut model = constant_model(1.0);
    let wl = v27_conv(64, 64);
    let power_af = model.dpu_power_activity_factor(&wl);
    let efficiency_af = model.dpu_efficiency_activity_factor(&wl);
    assert!((power_af - 1.3).abs() < 1e-6, "{power_af}");
    assert!(efficiency_af > power_af);
}

#[test]
fn energy_is_ideal_cycles_times_power_factor() {
    let model = VPUCostModel::unloaded();
    let wl = v20_conv_56x56();
    let energy = model.dpu_energy(&wl);

    // V20 conv ic=16 → log2=4 → factor 0.87 (uint8, unscaled)
    let ideal = vpu_cost::performance::dpu_power_ideal_cycles(&wl);
    #[allow(clippy::cast_precision_loss)]
    let expected = ideal as f32 * 0.87;
    assert!((energy - expected).abs() < expected * 1e-5, "{energy} vs {expected}");
}

#[test]
fn uncharacterized_device_has_zero_energy() {
    let model = VPUCostModel::unloaded();
    let mut wl = v27_conv(64, 64);
    wl.device = VPUDevice::V40;
    assert!((model.dpu_energy(&wl) - 0.0).abs() < f32::EPSILON);
}

#[test]
fn error_workloads_zero_out_utilization_and_af() {
    let mut model = constant_model(1000.0);
    let mut wl = v27_conv(64, 64);
    wl.op = Operation::Invalid;
    assert!((model.hw_utilization(&wl) - 0.0).abs() < f32::EPSILON);
    assert!((model.dpu_power_activity_factor(&wl) - 0.0).abs() < f32::EPSILON);
}

// --- the info pack ---------------------------------------------------------

#[test]
fn info_pack_is_internally_consistent() {
    let mut model = constant_model(50_000.0);
    let wl = v20_conv_56x56();
    let pack = model.dpu_info(&wl);

    assert_eq!(pack.dpu_cycles, 50_000);
    assert!(pack.err_info.is_empty(), "{}", pack.err_info);
    assert_eq!(pack.dense_mac_operations, 56 * 56 * 16 * 16 * 3 * 3);
    assert_eq!(pack.sparse_mac_operations, pack.dense_mac_operations);
    assert_eq!(pack.power_ideal_cycles, pack.efficiency_ideal_cycles);
    assert!(pack.hw_theoretical_cycles >= pack.power_ideal_cycles);

    #[allow(clippy::cast_precision_loss)]
    let expected_util = pack.power_ideal_cycles as f32 / 50_000.0;
    assert!((pack.power_mac_utilization - expected_util).abs() < 1e-5);

    #[allow(clippy::cast_precision_loss)]
    let expected_energy = pack.power_ideal_cycles as f32 * 0.87;
    assert!((pack.energy - expected_energy).abs() < expected_energy * 1e-5);
}

#[test]
fn info_pack_reports_errors_with_zeroed_utilization() {
    let mut model = VPUCostModel::unloaded();
    let mut wl = v27_conv(64, 64);
    wl.op = Operation::Invalid;
    let pack = model.dpu_info(&wl);
    assert_eq!(pack.dpu_cycles, Cycles::ERROR_INVALID_INPUT_OPERATION);
    assert!(!pack.err_info.is_empty());
    assert!((pack.power_mac_utilization - 0.0).abs() < f32::EPSILON);
    assert!((pack.efficiency_mac_utilization - 0.0).abs() < f32::EPSILON);
}

// --- SHAVE -----------------------------------------------------------------

#[test]
fn shave_catalog_round_trip() {
    let model = VPUCostModel::unloaded();
    let names = model.shave_supported_operations(VPUDevice::V27);
    assert!(names.contains(&"sigmoid".to_string()));

    let t = VPUTensor::new(32, 32, 16, 1, DataType::Float16);
    let swl = SHAVEWorkload::new(VPUDevice::V27, "sigmoid", vec![t], vec![t]);
    let mut info = String::new();
    let cycles = model.shave_2(&swl, &mut info);
    assert!(!Cycles::is_error_code(cycles), "{info}");
    assert!(cycles > 0);
}

#[test]
fn shave_2_errors_on_unknown_kernel_legacy_shave_stays_silent() {
    let model = VPUCostModel::unloaded();
    let t = VPUTensor::new(32, 32, 16, 1, DataType::Float16);

    let swl = SHAVEWorkload::new(VPUDevice::V27, "not_a_kernel", vec![t], vec![t]);
    let mut info = String::new();
    assert_eq!(
        model.shave_2(&swl, &mut info),
        Cycles::ERROR_INVALID_INPUT_CONFIGURATION
    );
    assert!(info.contains("not_a_kernel"));

    // legacy path: self-describing operation, no catalog, no error
    let legacy = SWOperation {
        device: VPUDevice::V27,
        inputs: vec![t],
        outputs: vec![t],
        kernel_efficiency: 4.0,
        latency: 1200,
    };
    assert_eq!(model.shave(&legacy), u32::try_from(t.size() / 4).unwrap() + 1200);
    let energy = model.shave_energy(&legacy);
    assert!(energy > 0.0);
}

#[test]
fn isi_strategy_reaches_the_descriptor() {
    // same workload, two strategies → different descriptors → the cache
    // must treat them as distinct keys (weight on the first ISI slot)
    let mut model =
        VPUCostModel::from_bytes(&predictor_bytes(11, 61, &[(57, 100.0)], 1.0)).unwrap();
    let clustering = v27_conv(64, 64);
    let mut split = v27_conv(64, 64);
    split.isi_strategy = IsiStrategy::SplitOverH;

    assert_eq!(model.dpu(clustering), 101); // clustering one-hot high
    assert_eq!(model.dpu(split), 1); // different key, different estimate
}
