//! Binary parser for the predictor container.

use crate::error::{Result, VpuModelError};
use crate::runtime::DenseLayer;

/// Container magic bytes.
pub const MODEL_MAGIC: [u8; 4] = *b"VPNN";

/// Supported container format version.
const CONTAINER_VERSION: u32 = 1;

/// Structural limits; anything beyond these is a corrupt file, not a model.
const MAX_LAYERS: u32 = 64;
const MAX_DIM: u32 = 8192;

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    /// Input interface version (descriptor layout the net was trained on).
    pub input_version: u32,
    /// Output interface version (result semantics).
    pub output_version: u32,
    /// Batch size the network processes per invocation.
    pub batch_size: u32,
    /// Width of one input descriptor in floats.
    pub descriptor_width: u32,
    /// Number of dense layers that follow.
    pub layer_count: u32,
}

/// Cursor over the container bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| {
            VpuModelError::parse_error("offset overflow")
        })?;
        if end > self.data.len() {
            return Err(VpuModelError::parse_error(format!(
                "Truncated container: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.data.len() - self.pos
            )));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32_vec(&mut self, count: usize) -> Result<Vec<f32>> {
        let b = self.take(count * 4)?;
        Ok(b.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

/// Parse the container header.
///
/// # Errors
///
/// Returns an error on bad magic, unsupported container version, or
/// out-of-range structural fields.
pub fn parse_header(data: &[u8]) -> Result<ModelHeader> {
    tracing::debug!("Parsing predictor container ({} bytes)", data.len());

    let mut r = Reader::new(data);
    let magic = r.take(4)?;
    if magic != MODEL_MAGIC {
        tracing::error!("Invalid magic bytes: {:02x?}", magic);
        return Err(VpuModelError::InvalidMagic);
    }

    let container = r.read_u32()?;
    if container != CONTAINER_VERSION {
        return Err(VpuModelError::parse_error(format!(
            "Unsupported container version {container} (expected {CONTAINER_VERSION})"
        )));
    }

    let header = ModelHeader {
        input_version: r.read_u32()?,
        output_version: r.read_u32()?,
        batch_size: r.read_u32()?,
        descriptor_width: r.read_u32()?,
        layer_count: r.read_u32()?,
    };

    if header.batch_size == 0 || header.descriptor_width == 0 {
        return Err(VpuModelError::parse_error("Zero batch size or input width"));
    }
    if header.layer_count == 0 || header.layer_count > MAX_LAYERS {
        return Err(VpuModelError::parse_error(format!(
            "Layer count {} out of range 1..={MAX_LAYERS}",
            header.layer_count
        )));
    }

    tracing::debug!(
        "Container: input v{}, output v{}, shape ({}, {}), {} layer(s)",
        header.input_version,
        header.output_version,
        header.batch_size,
        header.descriptor_width,
        header.layer_count
    );

    Ok(header)
}

/// Parse the dense layers following the header.
///
/// # Errors
///
/// Returns an error on truncation, out-of-range dimensions, a dimension
/// chain mismatch, or a final layer that is not a scalar head.
pub fn parse_layers(data: &[u8], header: &ModelHeader) -> Result<Vec<DenseLayer>> {
    let mut r = Reader::new(data);
    r.take(28)?; // magic + six header words

    let mut layers = Vec::with_capacity(header.layer_count as usize);
    let mut expected_in = header.descriptor_width;

    for idx in 0..header.layer_count {
        let in_dim = r.read_u32()?;
        let out_dim = r.read_u32()?;
        if in_dim == 0 || in_dim > MAX_DIM || out_dim == 0 || out_dim > MAX_DIM {
            return Err(VpuModelError::parse_error(format!(
                "Layer {idx}: dimensions {in_dim}x{out_dim} out of range"
            )));
        }
        if in_dim != expected_in {
            return Err(VpuModelError::parse_error(format!(
                "Layer {idx}: input dim {in_dim} does not chain from {expected_in}"
            )));
        }

        let weights = r.read_f32_vec(in_dim as usize * out_dim as usize)?;
        let bias = r.read_f32_vec(out_dim as usize)?;
        layers.push(DenseLayer::new(in_dim as usize, out_dim as usize, weights, bias));
        expected_in = out_dim;
    }

    if expected_in != 1 {
        return Err(VpuModelError::parse_error(format!(
            "Final layer produces {expected_in} outputs, expected a scalar head"
        )));
    }
    if r.pos != data.len() {
        return Err(VpuModelError::parse_error(format!(
            "{} trailing bytes after last layer",
            data.len() - r.pos
        )));
    }

    Ok(layers)
}
