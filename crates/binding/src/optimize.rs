//! Running LLVM's optimization pipelines over a module.
//!
//! The pipelines are those of LLVM's new pass manager, selected by
//! [`PipelineLevel`] and tuned by [`OptimizationOptions`]. They run for the
//! host machine, as the IR being inspected carries no target of its own that
//! we could rely on.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use inkwell::{
    passes::PassBuilderOptions,
    targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine},
    OptimizationLevel,
};
use irlens_errors::binding::{Error, Result};
use tracing::debug;

use crate::module::ModuleMut;

/// The standard optimization pipelines.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PipelineLevel {
    /// Only the passes that are required for correctness.
    O0,
    O1,
    #[default]
    O2,
    O3,

    /// Optimize for size while keeping most speed optimizations.
    Os,

    /// Optimize aggressively for size.
    Oz,
}

impl PipelineLevel {
    /// Gets the pass pipeline description that LLVM uses for this level.
    #[must_use]
    pub fn pipeline(self) -> String {
        format!("default<{self}>")
    }

    /// Gets the code generation level closest to this pipeline, for building
    /// the target machine.
    fn codegen_level(self) -> OptimizationLevel {
        match self {
            Self::O0 => OptimizationLevel::None,
            Self::O1 => OptimizationLevel::Less,
            Self::O2 | Self::Os | Self::Oz => OptimizationLevel::Default,
            Self::O3 => OptimizationLevel::Aggressive,
        }
    }
}

impl Display for PipelineLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::O0 => "O0",
            Self::O1 => "O1",
            Self::O2 => "O2",
            Self::O3 => "O3",
            Self::Os => "Os",
            Self::Oz => "Oz",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PipelineLevel {
    type Err = Error;

    /// Accepts the level with or without its leading `O`, so both `O2` and `2`
    /// select the same pipeline.
    fn from_str(s: &str) -> Result<Self> {
        let level = s.strip_prefix('O').unwrap_or(s);
        match level {
            "0" => Ok(Self::O0),
            "1" => Ok(Self::O1),
            "2" => Ok(Self::O2),
            "3" => Ok(Self::O3),
            "s" => Ok(Self::Os),
            "z" => Ok(Self::Oz),
            _ => Err(Error::unexpected_value("one of O0, O1, O2, O3, Os, or Oz", s)),
        }
    }
}

/// How an optimization pipeline should be run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OptimizationOptions {
    level:              PipelineLevel,
    loop_unrolling:     bool,
    loop_vectorization: bool,
    slp_vectorization:  bool,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            level:              PipelineLevel::default(),
            loop_unrolling:     true,
            loop_vectorization: false,
            slp_vectorization:  false,
        }
    }
}

impl OptimizationOptions {
    /// Creates the default options: the `O2` pipeline with loop unrolling and
    /// without vectorization.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_level(mut self, level: PipelineLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets whether loops may be unrolled.
    #[must_use]
    pub fn with_loop_unrolling(mut self, loop_unrolling: bool) -> Self {
        self.loop_unrolling = loop_unrolling;
        self
    }

    /// Sets whether loops may be vectorized.
    #[must_use]
    pub fn with_loop_vectorization(mut self, loop_vectorization: bool) -> Self {
        self.loop_vectorization = loop_vectorization;
        self
    }

    /// Sets whether straight-line code may be vectorized.
    #[must_use]
    pub fn with_slp_vectorization(mut self, slp_vectorization: bool) -> Self {
        self.slp_vectorization = slp_vectorization;
        self
    }

    #[must_use]
    pub fn level(&self) -> PipelineLevel {
        self.level
    }

    #[must_use]
    pub fn loop_unrolling(&self) -> bool {
        self.loop_unrolling
    }

    #[must_use]
    pub fn loop_vectorization(&self) -> bool {
        self.loop_vectorization
    }

    #[must_use]
    pub fn slp_vectorization(&self) -> bool {
        self.slp_vectorization
    }

    fn pass_builder_options(&self) -> PassBuilderOptions {
        let options = PassBuilderOptions::create();
        options.set_loop_unrolling(self.loop_unrolling);
        options.set_loop_vectorization(self.loop_vectorization);
        options.set_loop_slp_vectorization(self.slp_vectorization);
        options
    }
}

/// Builds a target machine for the host.
fn host_target_machine(level: PipelineLevel) -> Result<TargetMachine> {
    Target::initialize_native(&InitializationConfig::default()).map_err(Error::LLVMError)?;

    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple)?;
    let cpu = TargetMachine::get_host_cpu_name();
    let features = TargetMachine::get_host_cpu_features();

    target
        .create_target_machine(
            &triple,
            cpu.to_str()?,
            features.to_str()?,
            level.codegen_level(),
            RelocMode::Default,
            CodeModel::Default,
        )
        .ok_or_else(|| Error::LLVMError(format!("No target machine for {}", triple.as_str().to_string_lossy())))
}

impl ModuleMut<'_> {
    /// Runs the optimization pipeline described by `options` over the module.
    ///
    /// # Errors
    ///
    /// - [`Error::LLVMError`] if no target machine can be built for the host,
    ///   or LLVM fails to run the pipeline.
    /// - [`Error::CStrConversionError`] if the host's CPU description is not
    ///   valid UTF-8.
    pub fn optimize(&self, options: &OptimizationOptions) -> Result<()> {
        let machine = host_target_machine(options.level)?;
        let pipeline = options.level.pipeline();
        debug!(
            module = ?self.name(),
            pipeline = %pipeline,
            loop_unrolling = options.loop_unrolling,
            loop_vectorization = options.loop_vectorization,
            slp_vectorization = options.slp_vectorization,
            "running optimization pipeline"
        );

        self.run_passes(&pipeline, &machine, options.pass_builder_options())?;
        Ok(())
    }
}
