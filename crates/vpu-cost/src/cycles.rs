//! Cycle counts and the sentinel error encoding.
//!
//! Every estimation entry point returns a [`CyclesInterfaceType`]. Values
//! below the reserved band are cycle counts; the topmost values of the u32
//! range encode errors, so a single integer carries both outcomes across
//! the API.

/// Cycle count or sentinel error code.
pub type CyclesInterfaceType = u32;

/// Namespace for the sentinel codes and their helpers.
pub struct Cycles;

impl Cycles {
    /// Marks a usable cycle value.
    pub const NO_ERROR: CyclesInterfaceType = 0;

    /// First value of the reserved error band. Everything at or above this
    /// is an error code, never a cycle count.
    pub const START_ERROR_RANGE: CyclesInterfaceType = u32::MAX - 1024;

    /// Workload does not fit the CMX scratchpad.
    pub const ERROR_INPUT_TOO_BIG: CyclesInterfaceType = u32::MAX - 1;
    /// Device, mode, shape, padding, stride, or sparsity setup is invalid.
    pub const ERROR_INVALID_INPUT_CONFIGURATION: CyclesInterfaceType = u32::MAX - 2;
    /// Operation is unknown or not supported on the device.
    pub const ERROR_INVALID_INPUT_OPERATION: CyclesInterfaceType = u32::MAX - 3;
    /// The predictor produced a value outside the usable interval.
    pub const ERROR_INVALID_OUTPUT_RANGE: CyclesInterfaceType = u32::MAX - 4;
    /// A descriptor could not be built for the workload.
    pub const ERROR_INFERENCE_NOT_POSSIBLE: CyclesInterfaceType = u32::MAX - 5;

    /// True when `value` is a sentinel error code.
    #[must_use]
    pub const fn is_error_code(value: CyclesInterfaceType) -> bool {
        value >= Self::START_ERROR_RANGE
    }

    /// Human-readable name for a sentinel code.
    #[must_use]
    pub fn to_error_text(value: CyclesInterfaceType) -> &'static str {
        match value {
            Self::NO_ERROR => "NO_ERROR",
            Self::ERROR_INPUT_TOO_BIG => "ERROR_INPUT_TOO_BIG",
            Self::ERROR_INVALID_INPUT_CONFIGURATION => "ERROR_INVALID_INPUT_CONFIGURATION",
            Self::ERROR_INVALID_INPUT_OPERATION => "ERROR_INVALID_INPUT_OPERATION",
            Self::ERROR_INVALID_OUTPUT_RANGE => "ERROR_INVALID_OUTPUT_RANGE",
            Self::ERROR_INFERENCE_NOT_POSSIBLE => "ERROR_INFERENCE_NOT_POSSIBLE",
            v if Self::is_error_code(v) => "UNKNOWN_ERROR",
            _ => "cycle value",
        }
    }

    /// Clamp a wide cycle count into the representable (non-error) range.
    #[must_use]
    pub fn saturate(value: u64) -> CyclesInterfaceType {
        u32::try_from(value).map_or(Self::START_ERROR_RANGE - 1, |v| {
            v.min(Self::START_ERROR_RANGE - 1)
        })
    }
}

/// Outcome of workload validation: a sentinel value plus the findings text.
#[derive(Debug, Clone, Default)]
pub struct SanityReport {
    value: CyclesInterfaceType,
    /// Accumulated human-readable findings.
    pub info: String,
}

impl SanityReport {
    /// A fresh report in the no-error state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sentinel value (`NO_ERROR` when the workload is usable).
    #[must_use]
    pub const fn value(&self) -> CyclesInterfaceType {
        self.value
    }

    /// True when the workload can be fed downstream.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.value == Cycles::NO_ERROR
    }

    /// Clear value and findings.
    pub fn reset(&mut self) {
        self.value = Cycles::NO_ERROR;
        self.info.clear();
    }

    /// Record the first-failing condition. Later findings append to `info`
    /// but the first error code wins.
    pub fn report_error(&mut self, code: CyclesInterfaceType, finding: impl AsRef<str>) {
        if self.value == Cycles::NO_ERROR {
            self.value = code;
        }
        if !self.info.is_empty() {
            self.info.push_str("; ");
        }
        self.info.push_str(finding.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_band_partition() {
        assert!(!Cycles::is_error_code(Cycles::NO_ERROR));
        assert!(!Cycles::is_error_code(4_000_000_000));
        assert!(Cycles::is_error_code(Cycles::ERROR_INPUT_TOO_BIG));
        assert!(Cycles::is_error_code(Cycles::ERROR_INVALID_OUTPUT_RANGE));
        assert!(Cycles::is_error_code(Cycles::START_ERROR_RANGE));
        assert!(!Cycles::is_error_code(Cycles::START_ERROR_RANGE - 1));
    }

    #[test]
    fn saturate_stays_below_error_band() {
        assert_eq!(Cycles::saturate(123), 123);
        assert_eq!(Cycles::saturate(u64::MAX), Cycles::START_ERROR_RANGE - 1);
        assert!(!Cycles::is_error_code(Cycles::saturate(u64::MAX)));
    }

    #[test]
    fn report_keeps_first_error() {
        let mut report = SanityReport::new();
        assert!(report.is_usable());

        report.report_error(Cycles::ERROR_INPUT_TOO_BIG, "does not fit");
        report.report_error(Cycles::ERROR_INVALID_INPUT_OPERATION, "also bad op");

        assert_eq!(report.value(), Cycles::ERROR_INPUT_TOO_BIG);
        assert!(report.info.contains("does not fit"));
        assert!(report.info.contains("also bad op"));

        report.reset();
        assert!(report.is_usable());
        assert!(report.info.is_empty());
    }

    #[test]
    fn error_texts() {
        assert_eq!(Cycles::to_error_text(Cycles::NO_ERROR), "NO_ERROR");
        assert_eq!(
            Cycles::to_error_text(Cycles::ERROR_INVALID_INPUT_OPERATION),
            "ERROR_INVALID_INPUT_OPERATION"
        );
        assert_eq!(Cycles::to_error_text(42), "cycle value");
    }
}
