//! DVFS points and power parameter tables.
//!
//! The C_dyn / leakage numbers shipped with the silicon model are
//! placeholders pending characterization. They are carried as a *loadable*
//! table ([`DynamicParams`]) so integrators can install measured values;
//! nothing in the estimators treats the defaults as truth.

use crate::device::{VPUDevice, VPUSubsystem};

/// One Dynamic Voltage and Frequency Scaling operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DvfsPoint {
    /// Supply voltage in volts.
    pub voltage: f32,
    /// Clock frequency in MHz.
    pub frequency_mhz: f32,
}

/// Valid DVFS operating points for a generation.
#[must_use]
pub fn valid_dvfs(device: VPUDevice) -> &'static [DvfsPoint] {
    match device {
        VPUDevice::V20 => &[DvfsPoint { voltage: 0.8, frequency_mhz: 700.0 }],
        VPUDevice::V21 => &[DvfsPoint { voltage: 0.8, frequency_mhz: 850.0 }],
        VPUDevice::V27 => &[
            DvfsPoint { voltage: 0.6, frequency_mhz: 850.0 },
            DvfsPoint { voltage: 0.75, frequency_mhz: 1100.0 },
            DvfsPoint { voltage: 0.9, frequency_mhz: 1300.0 },
        ],
        VPUDevice::V40 => &[
            DvfsPoint { voltage: 0.55, frequency_mhz: 950.0 },
            DvfsPoint { voltage: 0.65, frequency_mhz: 1550.0 },
            DvfsPoint { voltage: 0.75, frequency_mhz: 1700.0 },
            DvfsPoint { voltage: 0.85, frequency_mhz: 1850.0 },
        ],
        VPUDevice::Unknown => &[],
    }
}

/// The default operating point: the highest-frequency valid DVFS entry.
#[must_use]
pub fn default_dvfs(device: VPUDevice) -> Option<DvfsPoint> {
    valid_dvfs(device)
        .iter()
        .copied()
        .max_by(|a, b| a.frequency_mhz.total_cmp(&b.frequency_mhz))
}

/// Ceiling on the power activity factor relative to the reference power
/// virus. Later generations can exceed the INT8 virus on float workloads,
/// but only up to this factor.
#[must_use]
pub fn power_virus_exceed_factor(device: VPUDevice) -> f32 {
    match device {
        VPUDevice::V20 | VPUDevice::V21 => 1.0,
        VPUDevice::V27 | VPUDevice::V40 => 1.3,
        VPUDevice::Unknown => 0.0,
    }
}

/// Per-subsystem dynamic-power parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DynamicParams {
    /// Effective switched capacitance in nF.
    pub c_dyn_nf: f32,
    /// Nominal leakage in mW at the default operating point.
    pub leakage_mw: f32,
}

/// Power parameter table for all (device, subsystem) pairs.
///
/// Constructed empty (all zeros, the uncharacterized state) or from caller
/// data via [`PowerParamTable::with_entries`].
#[derive(Debug, Clone, Default)]
pub struct PowerParamTable {
    entries: Vec<(VPUDevice, VPUSubsystem, DynamicParams)>,
}

impl PowerParamTable {
    /// The uncharacterized table: every lookup yields zeroed parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from measured entries.
    #[must_use]
    pub fn with_entries(entries: Vec<(VPUDevice, VPUSubsystem, DynamicParams)>) -> Self {
        Self { entries }
    }

    /// Parameters for a (device, subsystem) pair; zeroed when absent.
    #[must_use]
    pub fn get(&self, device: VPUDevice, subsystem: VPUSubsystem) -> DynamicParams {
        self.entries
            .iter()
            .find(|(d, s, _)| *d == device && *s == subsystem)
            .map_or_else(DynamicParams::default, |(_, _, p)| *p)
    }
}

/// Dynamic power in mW: `C_dyn · f · V² · activity_factor`.
#[must_use]
pub fn dynamic_power(c_dyn_nf: f32, activity_factor: f32, dvfs: DvfsPoint) -> f32 {
    c_dyn_nf * dvfs.frequency_mhz * dvfs.voltage * dvfs.voltage * activity_factor
}

/// Static power in mW: nominal leakage scaled by the voltage ratio to the
/// default operating point.
#[must_use]
pub fn static_power(params: DynamicParams, device: VPUDevice, dvfs: DvfsPoint) -> f32 {
    match default_dvfs(device) {
        Some(nominal) if nominal.voltage > 0.0 => {
            params.leakage_mw * dvfs.voltage / nominal.voltage
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dvfs_is_highest_frequency() {
        let p = default_dvfs(VPUDevice::V27).unwrap();
        assert!((p.frequency_mhz - 1300.0).abs() < f32::EPSILON);
        assert!((p.voltage - 0.9).abs() < f32::EPSILON);
        assert!(default_dvfs(VPUDevice::Unknown).is_none());
    }

    #[test]
    fn exceed_factor_by_generation() {
        assert!((power_virus_exceed_factor(VPUDevice::V20) - 1.0).abs() < f32::EPSILON);
        assert!((power_virus_exceed_factor(VPUDevice::V27) - 1.3).abs() < f32::EPSILON);
    }

    #[test]
    fn uncharacterized_table_is_zero() {
        let table = PowerParamTable::new();
        let p = table.get(VPUDevice::V27, VPUSubsystem::Dma);
        assert!((p.c_dyn_nf - 0.0).abs() < f32::EPSILON);
        assert!((dynamic_power(p.c_dyn_nf, 1.0, default_dvfs(VPUDevice::V27).unwrap()) - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn loaded_table_round_trips() {
        let table = PowerParamTable::with_entries(vec![(
            VPUDevice::V27,
            VPUSubsystem::Dpu,
            DynamicParams { c_dyn_nf: 1.2, leakage_mw: 35.0 },
        )]);
        let p = table.get(VPUDevice::V27, VPUSubsystem::Dpu);
        assert!((p.c_dyn_nf - 1.2).abs() < f32::EPSILON);
        // 1.2 nF · 1300 MHz · 0.9² V² · 0.5
        let dyn_mw = dynamic_power(p.c_dyn_nf, 0.5, default_dvfs(VPUDevice::V27).unwrap());
        assert!((dyn_mw - 1.2 * 1300.0 * 0.81 * 0.5).abs() < 1e-3);
    }
}
