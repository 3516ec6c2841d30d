/*! Passes and the queries they lean on.
 *
 * Lowering passes run once per function and report whether they changed anything. The def-use
 * helpers answer the two questions a local rewrite needs: where a value is defined and who reads it.
 */

pub mod def_use;
pub mod pass;

pub use def_use::{defining_site, uses_of, UseSite};
pub use pass::{FunctionPass, PassManager, PassRun, PassStatistics, PipelineReport};
