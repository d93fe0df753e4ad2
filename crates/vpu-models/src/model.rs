//! Predictor model: parsed container plus forward runtime.

use crate::error::{Result, VpuModelError};
use crate::parser::{self, ModelHeader};
use crate::runtime::{forward_scalar, DenseLayer};
use bytes::Bytes;
use std::fs;
use std::path::Path;

/// A loaded cycle predictor.
#[derive(Debug, Clone)]
pub struct PredictorModel {
    header: ModelHeader,
    layers: Vec<DenseLayer>,
    /// Raw container bytes, kept for consumers that re-serialize or hash.
    raw: Bytes,
}

impl PredictorModel {
    /// Load a predictor container from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading predictor from: {}", path.display());

        if !path.exists() {
            return Err(VpuModelError::file_not_found(path));
        }
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse a predictor container from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is malformed.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = parser::parse_header(data)?;
        let layers = parser::parse_layers(data, &header)?;

        tracing::info!(
            "Predictor ready: interface in v{} / out v{}, {} layer(s)",
            header.input_version,
            header.output_version,
            layers.len()
        );

        Ok(Self {
            header,
            layers,
            raw: Bytes::copy_from_slice(data),
        })
    }

    /// Descriptor layout version the network was trained against.
    pub fn input_interface_version(&self) -> u32 {
        self.header.input_version
    }

    /// Result semantics version.
    pub fn output_interface_version(&self) -> u32 {
        self.header.output_version
    }

    /// Input tensor shape as `(batch_size, descriptor_width)`.
    pub fn input_shape(&self) -> (usize, usize) {
        (
            self.header.batch_size as usize,
            self.header.descriptor_width as usize,
        )
    }

    /// Raw container bytes.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Run the network on one descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptor width does not match the
    /// network input width.
    pub fn predict(&self, descriptor: &[f32]) -> Result<f32> {
        forward_scalar(&self.layers, descriptor)
    }

    /// Run the network on `count` consecutive descriptors packed into
    /// `flat`. Results are returned in input order.
    ///
    /// # Errors
    ///
    /// Returns an error when `flat` is not `count` descriptors wide.
    pub fn predict_batch(&self, flat: &[f32], count: usize) -> Result<Vec<f32>> {
        let width = self.header.descriptor_width as usize;
        if flat.len() != count * width {
            return Err(VpuModelError::DescriptorWidthMismatch {
                got: flat.len(),
                expected: count * width,
            });
        }
        flat.chunks_exact(width)
            .map(|d| forward_scalar(&self.layers, d))
            .collect()
    }
}
