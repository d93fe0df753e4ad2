//! Workload-to-descriptor preprocessing, versioned.
//!
//! A preprocessor serializes a [`DPUWorkload`] into the flat float vector
//! a trained predictor consumes. The layout is a binary-stable contract
//! per interface version: enums become one-hot groups in a fixed order,
//! numeric fields are appended raw. The factory owns one instance of every
//! known version and hands out borrows.

use crate::types::{
    DataType, DPUWorkload, ExecutionMode, IsiStrategy, Layout, Operation, VPUDevice, VPUTensor,
};

/// Interface version of the development ("latest") descriptor layout.
pub const LATEST_VERSION: u32 = 0;

/// A versioned workload-to-descriptor transformer.
///
/// The slices returned by the transform methods live in a scratch buffer
/// owned by the preprocessor and are invalidated by the next transform
/// call.
pub trait Preprocessing {
    /// The descriptor layout version this instance produces.
    fn interface_version(&self) -> u32;

    /// Width in floats of one produced descriptor.
    fn output_size(&self) -> usize;

    /// Force the descriptor width: shorter layouts are zero-padded, longer
    /// ones truncated. Unsafe in the contract sense — truncation loses
    /// fields — and only meant for aligning to a predictor's input width.
    fn set_size(&mut self, size: usize);

    /// Serialize one workload.
    fn transform(&mut self, workload: &DPUWorkload) -> &[f32];

    /// Serialize a batch, concatenated and zero-padded up to a multiple of
    /// `batch_size` descriptors.
    fn transform_batch(&mut self, workloads: &[DPUWorkload], batch_size: usize) -> &[f32];
}

fn push_one_hot<T: PartialEq>(out: &mut Vec<f32>, all: &[T], value: &T) {
    for candidate in all {
        out.push(if candidate == value { 1.0 } else { 0.0 });
    }
}

#[allow(clippy::cast_precision_loss)]
fn push_tensor(out: &mut Vec<f32>, tensor: &VPUTensor) {
    out.push(tensor.x() as f32);
    out.push(tensor.y() as f32);
    out.push(tensor.channels() as f32);
    out.push(tensor.batches() as f32);
    push_one_hot(out, &DataType::ALL, &tensor.dtype());
    push_one_hot(out, &Layout::ALL, &tensor.layout());
}

/// Base layout (interface 1): device, operation, both tensors, kernel
/// geometry, execution mode. 53 floats.
#[allow(clippy::cast_precision_loss)]
fn encode_v1(wl: &DPUWorkload, out: &mut Vec<f32>) {
    push_one_hot(out, &VPUDevice::ALL, &wl.device);
    push_one_hot(out, &Operation::ALL, &wl.op);
    push_tensor(out, &wl.inputs[0]);
    push_tensor(out, &wl.outputs[0]);
    out.push(wl.kernel[0] as f32);
    out.push(wl.kernel[1] as f32);
    out.push(wl.stride[0] as f32);
    out.push(wl.stride[1] as f32);
    for pad in wl.padding {
        out.push(pad as f32);
    }
    push_one_hot(out, &ExecutionMode::ALL, &wl.execution_mode);
}

/// Interface 10: v1 plus sparsity and broadcast fields. 57 floats.
#[allow(clippy::cast_precision_loss)]
fn encode_v10(wl: &DPUWorkload, out: &mut Vec<f32>) {
    encode_v1(wl, out);
    out.push(wl.input_sparsity_rate);
    out.push(if wl.weight_sparsity_enabled { 1.0 } else { 0.0 });
    out.push(wl.weight_sparsity_rate);
    out.push(wl.output_write_tiles as f32);
}

/// Interface 11: v10 plus the ISI strategy. 61 floats.
fn encode_v11(wl: &DPUWorkload, out: &mut Vec<f32>) {
    encode_v10(wl, out);
    push_one_hot(out, &IsiStrategy::ALL, &wl.isi_strategy);
}

/// Shared buffer mechanics for the concrete versions.
#[derive(Debug)]
struct DescriptorBuffer {
    size: usize,
    buffer: Vec<f32>,
    scratch: Vec<f32>,
}

impl DescriptorBuffer {
    fn new(native_size: usize) -> Self {
        Self {
            size: native_size,
            buffer: Vec::new(),
            scratch: Vec::new(),
        }
    }

    fn run(&mut self, encode: fn(&DPUWorkload, &mut Vec<f32>), wl: &DPUWorkload) -> &[f32] {
        self.buffer.clear();
        encode(wl, &mut self.buffer);
        self.buffer.resize(self.size, 0.0);
        &self.buffer
    }

    fn run_batch(
        &mut self,
        encode: fn(&DPUWorkload, &mut Vec<f32>),
        workloads: &[DPUWorkload],
        batch_size: usize,
    ) -> &[f32] {
        self.buffer.clear();
        for wl in workloads {
            self.scratch.clear();
            encode(wl, &mut self.scratch);
            self.scratch.resize(self.size, 0.0);
            self.buffer.extend_from_slice(&self.scratch);
        }
        let batch = batch_size.max(1);
        let padded = workloads.len().div_ceil(batch) * batch;
        self.buffer.resize(padded * self.size, 0.0);
        &self.buffer
    }
}

macro_rules! preprocessing_version {
    ($name:ident, $version:expr, $native:expr, $encode:path, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug)]
        pub struct $name {
            inner: DescriptorBuffer,
        }

        impl $name {
            /// Layout version constant.
            pub const VERSION: u32 = $version;
            /// Width the layout natively produces.
            pub const NATIVE_SIZE: usize = $native;

            /// New instance at the native width.
            #[must_use]
            pub fn new() -> Self {
                Self {
                    inner: DescriptorBuffer::new(Self::NATIVE_SIZE),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Preprocessing for $name {
            fn interface_version(&self) -> u32 {
                Self::VERSION
            }

            fn output_size(&self) -> usize {
                self.inner.size
            }

            fn set_size(&mut self, size: usize) {
                self.inner.size = size;
            }

            fn transform(&mut self, workload: &DPUWorkload) -> &[f32] {
                self.inner.run($encode, workload)
            }

            fn transform_batch(&mut self, workloads: &[DPUWorkload], batch_size: usize) -> &[f32] {
                self.inner.run_batch($encode, workloads, batch_size)
            }
        }
    };
}

preprocessing_version!(
    PreprocessingLatest,
    LATEST_VERSION,
    61,
    encode_v11,
    "Development layout: tracks the newest interface under version 0."
);
preprocessing_version!(
    PreprocessingV1,
    1,
    53,
    encode_v1,
    "Base layout: geometry, datatypes, and execution mode only."
);
preprocessing_version!(
    PreprocessingV10,
    10,
    57,
    encode_v10,
    "Adds sparsity rates and the broadcast count to the base layout."
);
preprocessing_version!(
    PreprocessingV11,
    11,
    61,
    encode_v11,
    "Adds the ISI strategy to the interface-10 layout."
);

/// Owns one preprocessor per known interface version and shares them out.
#[derive(Debug, Default)]
pub struct PreprocessingFactory {
    latest: PreprocessingLatest,
    v1: PreprocessingV1,
    v10: PreprocessingV10,
    v11: PreprocessingV11,
}

impl PreprocessingFactory {
    /// Factory with all supported versions instantiated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Versions this factory can serve.
    #[must_use]
    pub fn versions(&self) -> [u32; 4] {
        [
            PreprocessingLatest::VERSION,
            PreprocessingV1::VERSION,
            PreprocessingV10::VERSION,
            PreprocessingV11::VERSION,
        ]
    }

    /// True when a preprocessor exists for the interrogated version.
    #[must_use]
    pub fn exists(&self, version: u32) -> bool {
        self.versions().contains(&version)
    }

    /// Borrow the preprocessor for a version. The instance is shared: a
    /// later call for the same version returns the same object.
    pub fn get_mut(&mut self, version: u32) -> Option<&mut dyn Preprocessing> {
        match version {
            PreprocessingLatest::VERSION => Some(&mut self.latest),
            PreprocessingV1::VERSION => Some(&mut self.v1),
            PreprocessingV10::VERSION => Some(&mut self.v10),
            PreprocessingV11::VERSION => Some(&mut self.v11),
            _ => None,
        }
    }
}
