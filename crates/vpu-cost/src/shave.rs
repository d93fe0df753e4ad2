//! SHAVE software-kernel catalog.
//!
//! Each modeled kernel carries a sustained throughput (bytes/cycle) and a
//! startup latency; the catalog maps kernel names to those parameters per
//! device generation. Kernels not in the catalog are not silently costed —
//! resolution failures surface as configuration errors.

use crate::cycles::{Cycles, CyclesInterfaceType};
use crate::types::{SHAVEWorkload, VPUDevice};
use std::fmt::Write as _;

/// Cost parameters of one modeled SHAVE kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaveKernel {
    /// Public SHAVE function name.
    pub name: &'static str,
    /// Sustained throughput in output bytes per DPU cycle.
    pub efficiency_bytes_per_cycle: f32,
    /// Fixed startup cost in cycles.
    pub latency_cycles: u32,
}

macro_rules! shave_kernels {
    ($(($name:literal, $efficiency:literal, $latency:literal)),+ $(,)?) => {
        &[$(ShaveKernel {
            name: $name,
            efficiency_bytes_per_cycle: $efficiency,
            latency_cycles: $latency,
        }),+]
    };
}

/// Second-generation SHAVE kernels (V27).
static V27_KERNELS: &[ShaveKernel] = shave_kernels![
    ("add", 8.0, 1000),
    ("mul", 8.0, 1000),
    ("relu", 16.0, 800),
    ("hswish", 8.0, 1000),
    ("sigmoid", 4.0, 1200),
    ("tanh", 4.0, 1200),
    ("swish", 4.0, 1400),
    ("gelu", 4.0, 1500),
    ("softmax", 2.0, 2000),
];

/// Second-generation SHAVE kernels on the wider V40 vector units.
static V40_KERNELS: &[ShaveKernel] = shave_kernels![
    ("add", 12.0, 800),
    ("mul", 12.0, 800),
    ("relu", 24.0, 650),
    ("hswish", 12.0, 800),
    ("sigmoid", 6.0, 950),
    ("tanh", 6.0, 950),
    ("swish", 6.0, 1100),
    ("gelu", 6.0, 1200),
    ("softmax", 3.0, 1600),
];

/// Per-device catalog of modeled SHAVE kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaveCatalog;

impl ShaveCatalog {
    /// The built-in catalog.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// All kernels modeled for a device. Generations before V27 have no
    /// modeled second-generation kernels.
    #[must_use]
    pub fn kernels(device: VPUDevice) -> &'static [ShaveKernel] {
        match device {
            VPUDevice::V27 => V27_KERNELS,
            VPUDevice::V40 => V40_KERNELS,
            _ => &[],
        }
    }

    /// Names of the supported SHAVE operations on a device.
    #[must_use]
    pub fn supported_operations(&self, device: VPUDevice) -> Vec<String> {
        Self::kernels(device)
            .iter()
            .map(|k| k.name.to_string())
            .collect()
    }

    /// Find a kernel by name on a device.
    #[must_use]
    pub fn find(&self, device: VPUDevice, name: &str) -> Option<&'static ShaveKernel> {
        Self::kernels(device).iter().find(|k| k.name == name)
    }

    /// Cycles for a catalog-resolved kernel invocation.
    ///
    /// Unknown kernels (including any request against a device with an
    /// empty catalog) return `ERROR_INVALID_INPUT_CONFIGURATION` and
    /// explain themselves through `info`.
    pub fn compute_cycles(&self, swl: &SHAVEWorkload, info: &mut String) -> CyclesInterfaceType {
        let Some(kernel) = self.find(swl.device(), swl.name()) else {
            let _ = write!(
                info,
                "SHAVE kernel '{}' not modeled for {}",
                swl.name(),
                swl.device()
            );
            return Cycles::ERROR_INVALID_INPUT_CONFIGURATION;
        };

        let Some(output) = swl.outputs().first() else {
            let _ = write!(info, "SHAVE kernel '{}' has no output tensor", swl.name());
            return Cycles::ERROR_INVALID_INPUT_CONFIGURATION;
        };
        let bytes = output.size();
        if bytes == 0 {
            let _ = write!(info, "SHAVE kernel '{}' output is empty", swl.name());
            return Cycles::ERROR_INVALID_INPUT_CONFIGURATION;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let payload = (bytes as f64 / f64::from(kernel.efficiency_bytes_per_cycle)).ceil() as u64;
        Cycles::saturate(payload + u64::from(kernel.latency_cycles))
    }
}
