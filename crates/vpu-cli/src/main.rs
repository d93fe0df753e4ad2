//! `vpu-cost` — command-line front end for the VPU cost model.
//!
//! ```text
//! USAGE:
//!   vpu-cost dpu  -d v27 -x 56 -y 56 --ic 64 --oc 64 -k 3 [--target cycles]
//!   vpu-cost dma  -d v27 -x 56 -y 56 --ic 64 --oc 64
//!   vpu-cost shave-ops -d v27             List modeled SHAVE kernels
//! ```

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use vpu_cost::{
    Cycles, DPUWorkload, DataType, ExecutionMode, MemoryLocation, Operation, VPUCostModel,
    VPUDevice, VPUTensor,
};

#[derive(Parser)]
#[command(name = "vpu-cost", about = "VPU hardware cost model CLI", version)]
struct Cli {
    /// Path to a serialized predictor; analytic fallback when omitted.
    #[arg(long, short, global = true, default_value = "")]
    model: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Estimate a DPU workload.
    Dpu(DpuArgs),
    /// Estimate a DMA transfer (DRAM to CMX).
    Dma(DmaArgs),
    /// List the SHAVE kernels modeled for a device.
    ShaveOps {
        /// Target device generation.
        #[arg(long, short)]
        device: DeviceArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceArg {
    V20,
    V21,
    V27,
    V40,
}

impl From<DeviceArg> for VPUDevice {
    fn from(value: DeviceArg) -> Self {
        match value {
            DeviceArg::V20 => Self::V20,
            DeviceArg::V21 => Self::V21,
            DeviceArg::V27 => Self::V27,
            DeviceArg::V40 => Self::V40,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OperationArg {
    Convolution,
    CmConvolution,
    DwConvolution,
    Avepool,
    Maxpool,
    Eltwise,
}

impl From<OperationArg> for Operation {
    fn from(value: OperationArg) -> Self {
        match value {
            OperationArg::Convolution => Self::Convolution,
            OperationArg::CmConvolution => Self::CmConvolution,
            OperationArg::DwConvolution => Self::DwConvolution,
            OperationArg::Avepool => Self::AvePool,
            OperationArg::Maxpool => Self::MaxPool,
            OperationArg::Eltwise => Self::Eltwise,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DtypeArg {
    Uint8,
    Int8,
    Float16,
    Bfloat16,
}

impl From<DtypeArg> for DataType {
    fn from(value: DtypeArg) -> Self {
        match value {
            DtypeArg::Uint8 => Self::UInt8,
            DtypeArg::Int8 => Self::Int8,
            DtypeArg::Float16 => Self::Float16,
            DtypeArg::Bfloat16 => Self::BFloat16,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    Cycles,
    Power,
    Utilization,
    Info,
}

#[derive(Args)]
struct DpuArgs {
    /// Target device generation.
    #[arg(long, short)]
    device: DeviceArg,

    /// Operation to estimate.
    #[arg(long, short, value_enum, default_value = "convolution")]
    operation: OperationArg,

    /// Output tensor width.
    #[arg(long, short)]
    x: u32,

    /// Output tensor height.
    #[arg(long, short)]
    y: u32,

    /// Input channels.
    #[arg(long)]
    ic: u32,

    /// Output channels.
    #[arg(long)]
    oc: u32,

    /// Batch.
    #[arg(long, short, default_value_t = 1)]
    batch: u32,

    /// Square kernel size.
    #[arg(long, short, default_value_t = 1)]
    kernel: u32,

    /// Symmetric padding.
    #[arg(long, short, default_value_t = 0)]
    padding: u32,

    /// Square stride.
    #[arg(long, short, default_value_t = 1)]
    strides: u32,

    /// Input datatype.
    #[arg(long, value_enum, default_value = "uint8")]
    input_dtype: DtypeArg,

    /// Output datatype.
    #[arg(long, value_enum, default_value = "uint8")]
    output_dtype: DtypeArg,

    /// What to report.
    #[arg(long, value_enum, default_value = "cycles")]
    target: TargetArg,
}

#[derive(Args)]
struct DmaArgs {
    /// Target device generation.
    #[arg(long, short)]
    device: DeviceArg,

    /// Tensor width.
    #[arg(long, short)]
    x: u32,

    /// Tensor height.
    #[arg(long, short)]
    y: u32,

    /// Input channels.
    #[arg(long)]
    ic: u32,

    /// Output channels.
    #[arg(long)]
    oc: u32,

    /// Broadcast count into CMX.
    #[arg(long, default_value_t = 1)]
    output_write_tiles: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let model = VPUCostModel::new(&cli.model)?;

    match cli.command {
        Cmd::Dpu(args) => cmd_dpu(model, &args),
        Cmd::Dma(args) => cmd_dma(&model, &args),
        Cmd::ShaveOps { device } => {
            for name in model.shave_supported_operations(device.into()) {
                println!("{name}");
            }
            Ok(())
        }
    }
}

/// The execution mode the Python tooling would derive: cuboid on V27+,
/// fp16 vector for float inputs before that, matrix otherwise.
fn derive_execution_mode(device: VPUDevice, input_dtype: DataType) -> ExecutionMode {
    if device >= VPUDevice::V27 {
        ExecutionMode::Cuboid16x16
    } else if input_dtype.is_float() {
        ExecutionMode::VectorFp16
    } else {
        ExecutionMode::Matrix
    }
}

fn build_workload(args: &DpuArgs) -> Result<DPUWorkload> {
    let device: VPUDevice = args.device.into();
    let input_dtype: DataType = args.input_dtype.into();
    let output_dtype: DataType = args.output_dtype.into();

    // the CLI takes output dims; recover the input dims the kernel needs
    let input_dim = |out: u32| -> Result<u32> {
        let dim = (out - 1) * args.strides + args.kernel;
        match dim.checked_sub(2 * args.padding) {
            Some(v) if v > 0 => Ok(v),
            _ => bail!("padding {} too large for the requested geometry", args.padding),
        }
    };

    Ok(DPUWorkload::dense(
        device,
        args.operation.into(),
        VPUTensor::new(input_dim(args.x)?, input_dim(args.y)?, args.ic, args.batch, input_dtype),
        VPUTensor::new(args.x, args.y, args.oc, args.batch, output_dtype),
        [args.kernel, args.kernel],
        [args.strides, args.strides],
        [args.padding, args.padding, args.padding, args.padding],
        derive_execution_mode(device, input_dtype),
    ))
}

fn cmd_dpu(mut model: VPUCostModel, args: &DpuArgs) -> Result<()> {
    let workload = build_workload(args)?;
    println!("Workload: {workload}");
    if !model.nn_initialized() {
        println!("(no predictor loaded, reporting analytic estimates)");
    }

    match args.target {
        TargetArg::Cycles => {
            let (cycles, info) = model.dpu_msg(workload);
            if Cycles::is_error_code(cycles) {
                bail!("{} ({info})", Cycles::to_error_text(cycles));
            }
            println!("DPU execution cycles: {cycles}");
        }
        TargetArg::Power => {
            println!(
                "DPU activity factor: {:.4}",
                model.dpu_power_activity_factor(&workload)
            );
            println!("DPU energy: {:.1}", model.dpu_energy(&workload));
        }
        TargetArg::Utilization => {
            println!("DPU hw utilization: {:.4}", model.hw_utilization(&workload));
        }
        TargetArg::Info => {
            println!("{}", model.dpu_info(&workload));
        }
    }
    Ok(())
}

fn cmd_dma(model: &VPUCostModel, args: &DmaArgs) -> Result<()> {
    let device: VPUDevice = args.device.into();
    let input = VPUTensor::new(args.x, args.y, args.ic, 1, DataType::UInt8);
    let output = VPUTensor::new(args.x, args.y, args.oc, 1, DataType::UInt8);
    let cycles = model.dma(
        device,
        &input,
        &output,
        MemoryLocation::Dram,
        MemoryLocation::Cmx,
        args.output_write_tiles,
    );
    println!("DMA execution cycles: {cycles}");
    Ok(())
}
