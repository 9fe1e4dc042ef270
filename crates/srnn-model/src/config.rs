//! Shared configuration for the compile and solve layers

use crate::error::{ModelError, Result};

/// Process-wide parameters shared by the compiler and the runtime engine.
///
/// The transfer function family reads `alpha` and `lambda` from here; the
/// compiler budgets tiles against `device_max_bytes`; the engine sizes its
/// worker group from `max_solve_threads` and its scratch pool from
/// `max_processing_threads`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// ELU/SELU alpha parameter
    pub alpha: f64,
    /// SELU lambda parameter
    pub lambda: f64,
    /// Worker threads available for the tiles of one row
    pub max_solve_threads: usize,
    /// Concurrent `solve` callers supported by one engine; each caller
    /// identifies itself with a distinct worker id
    pub max_processing_threads: usize,
    /// Byte budget a single compute tile may not exceed
    pub device_max_bytes: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            alpha: 1.673_263_242_354_377_2,
            lambda: 1.050_700_987_355_480_5,
            max_solve_threads: 4,
            max_processing_threads: 1,
            device_max_bytes: 256 * 1024 * 1024,
        }
    }
}

impl CoreConfig {
    /// Create a configuration with the default transfer-function constants
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ELU/SELU alpha parameter
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the SELU lambda parameter
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Set the number of worker threads used inside one row of tiles
    pub fn with_max_solve_threads(mut self, threads: usize) -> Self {
        self.max_solve_threads = threads;
        self
    }

    /// Set the number of concurrent `solve` callers to provision scratch for
    pub fn with_max_processing_threads(mut self, threads: usize) -> Self {
        self.max_processing_threads = threads;
        self
    }

    /// Set the byte budget of a single compute tile
    pub fn with_device_max_bytes(mut self, bytes: usize) -> Self {
        self.device_max_bytes = bytes;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_solve_threads == 0 {
            return Err(ModelError::invalid_parameter(
                "max_solve_threads",
                self.max_solve_threads.to_string(),
                ">= 1",
            ));
        }
        if self.max_processing_threads == 0 {
            return Err(ModelError::invalid_parameter(
                "max_processing_threads",
                self.max_processing_threads.to_string(),
                ">= 1",
            ));
        }
        if self.device_max_bytes == 0 {
            return Err(ModelError::invalid_parameter(
                "device_max_bytes",
                self.device_max_bytes.to_string(),
                "> 0",
            ));
        }
        if self.lambda <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "lambda",
                self.lambda.to_string(),
                "> 0.0",
            ));
        }
        Ok(())
    }
}
