//! Power-factor lookup and the activity-factor formula.
//!
//! The power factor expresses how hard a given operation drives the MAC
//! array relative to the reference power virus, as a function of
//! `log2(input_channels)`. Values between table entries are interpolated
//! logarithmically; a datatype-dependent scale is applied afterwards.

use crate::types::{DPUWorkload, Operation, VPUDevice};
use vpu_chip::power as chip_power;

type ChannelTable = &'static [(u32, f32)];
type OperationTable = &'static [(Operation, ChannelTable)];

/// Simulation-derived factors for the first generation,
/// `{log2(input_channels): factor}` per operation.
static V20_FACTORS: OperationTable = &[
    (
        Operation::Convolution,
        &[
            (4, 0.87),
            (5, 0.92),
            (6, 1.0),
            (7, 0.95),
            (8, 0.86),
            (9, 0.87),
        ],
    ),
    (Operation::DwConvolution, &[(6, 5.84)]),
    (Operation::AvePool, &[(6, 32.60)]),
    (Operation::MaxPool, &[(6, 5.29)]),
    (Operation::Eltwise, &[(7, 232.71)]),
];

/// Simulation-derived factors for the second generation.
static V27_FACTORS: OperationTable = &[
    (
        Operation::Convolution,
        &[
            (4, 1.97),
            (7, 1.20),
            (8, 1.08),
            (9, 1.07),
            (10, 1.01),
            (11, 0.97),
        ],
    ),
    (Operation::DwConvolution, &[(6, 1.43)]),
    (Operation::AvePool, &[(6, 0.29)]),
    (Operation::MaxPool, &[(6, 1.15)]),
    (Operation::Eltwise, &[(8, 0.11)]),
];

/// Power factor lookup table, nested `device → operation → log2(ic)`.
///
/// Devices or operations without characterization data yield 0, which
/// downstream consumers propagate as zero energy.
#[derive(Debug, Clone, Copy, Default)]
pub struct VPUPowerFactorLUT;

impl VPUPowerFactorLUT {
    /// The built-in characterization tables.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn device_table(device: VPUDevice) -> Option<OperationTable> {
        match device {
            VPUDevice::V20 => Some(V20_FACTORS),
            VPUDevice::V27 => Some(V27_FACTORS),
            _ => None,
        }
    }

    /// Datatype scale on top of the interpolated factor.
    fn scaled(value: f32, fp_compute: bool, device: VPUDevice) -> f32 {
        if device == VPUDevice::V20 && fp_compute {
            value * 0.87
        } else if device == VPUDevice::V27 && !fp_compute {
            value * 0.79
        } else {
            value
        }
    }

    /// Logarithmic interpolation over a channel table at `input_channels`.
    ///
    /// Exact `log2` hits return the entry; otherwise the two bracketing
    /// entries are combined as `((g−x)·f(s) + (x−s)·f(g)) / (g−s)`.
    /// Outside the table range the nearest entry is used.
    fn interpolate(table: ChannelTable, input_channels: u32) -> f32 {
        if table.is_empty() || input_channels == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let x = (input_channels as f32).log2();

        let mut smaller: Option<(u32, f32)> = None;
        let mut greater: Option<(u32, f32)> = None;
        for &(key, factor) in table {
            #[allow(clippy::cast_precision_loss)]
            let k = key as f32;
            if k <= x && smaller.map_or(true, |(s, _)| key > s) {
                smaller = Some((key, factor));
            }
            if k >= x && greater.map_or(true, |(g, _)| key < g) {
                greater = Some((key, factor));
            }
        }

        match (smaller, greater) {
            (Some((s, fs)), Some((g, fg))) => {
                if s == g {
                    fs
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let (s, g) = (s as f32, g as f32);
                    ((g - x) * fs + (x - s) * fg) / (g - s)
                }
            }
            // below or above the characterized range: clamp
            (None, Some((_, fg))) => fg,
            (Some((_, fs)), None) => fs,
            (None, None) => 0.0,
        }
    }

    /// The operation- and datatype-adjusted power factor for a workload,
    /// relative to the device's reference power virus.
    #[must_use]
    pub fn operation_adjustment_factor(&self, wl: &DPUWorkload) -> f32 {
        let Some(device_table) = Self::device_table(wl.device) else {
            return 0.0;
        };
        let Some(&(_, channels)) = device_table.iter().find(|(op, _)| *op == wl.op) else {
            return 0.0;
        };
        let raw = Self::interpolate(channels, wl.inputs[0].channels());
        Self::scaled(raw, wl.inputs[0].dtype().is_float(), wl.device)
    }

    /// Ceiling on the power activity factor for a device.
    #[must_use]
    pub fn power_virus_exceed_factor(&self, device: VPUDevice) -> f32 {
        chip_power::power_virus_exceed_factor(device)
    }
}

/// The raw activity-factor formula:
/// `utilization × power_factor × sparse_correction`.
#[must_use]
pub fn agnostic_activity_factor_formula(
    power_factor: f32,
    reference_hw_utilization: f32,
    sparse_correction: f32,
) -> f32 {
    reference_hw_utilization * power_factor * sparse_correction
}
