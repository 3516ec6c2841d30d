/*! Lowering passes that make a contract module runnable on the sysio wasm VM.
 *
 * The VM has no hardware floating point and expects the contract entry point to set up and tear
 * down the C++ runtime itself. `apply_fixup` wraps the entry function with those lifecycle calls and
 * `softfloat_fixup` routes float arithmetic through the runtime's software float routines. Both run
 * once per function between the front end and wasm code generation.
 */

pub mod config;
pub mod entry_wrapper;
pub mod registry;
pub mod softfloat;

pub use config::{ConfigError, EntryConfig, TransformConfig};
pub use entry_wrapper::EntryWrapperPass;
pub use registry::{build_pipeline, PassRegistry};
pub use softfloat::SoftfloatPass;

use sysir_core::Module;

/// Runs the configured pipeline over every function of `module`.
pub fn lower_module(
    module: &mut Module,
    config: &TransformConfig,
) -> anyhow::Result<sysir_core::PipelineReport> {
    let mut pipeline = build_pipeline(config)?;
    pipeline.run_on_module(module)
}
