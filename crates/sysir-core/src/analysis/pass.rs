use crate::{
    function::Function,
    module::{Module, SymbolTable},
    IrError,
};
use anyhow::{Context, Result};
use std::any::Any;
use std::time::{Duration, Instant};

/// A transformation invoked once per function.
///
/// The function and the module's symbol table are borrowed for the duration
/// of the call only; a pass never keeps either around.
pub trait FunctionPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    /// Returns `true` when the function was changed in a way later passes
    /// should re-examine.
    fn run_on_function(&mut self, function: &mut Function, symbols: &mut SymbolTable)
        -> Result<bool>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Clone)]
pub struct PassStatistics {
    pub name: String,
    pub duration: Duration,
    pub functions_visited: usize,
    pub functions_changed: usize,
}

/// One execution of a pass over the module and the functions it changed.
#[derive(Debug, Clone)]
pub struct PassRun {
    pub pass: &'static str,
    pub changed: Vec<String>,
}

/// Pass runs in pipeline order. A pass listed twice gets two runs.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    runs: Vec<PassRun>,
}

impl PipelineReport {
    pub fn runs(&self) -> &[PassRun] {
        &self.runs
    }

    /// Functions changed by any run of `pass`, first occurrence order.
    pub fn changed_functions(&self, pass: &str) -> Vec<&str> {
        let mut functions: Vec<&str> = Vec::new();
        for run in self.runs.iter().filter(|run| run.pass == pass) {
            for name in &run.changed {
                if !functions.contains(&name.as_str()) {
                    functions.push(name);
                }
            }
        }
        functions
    }

    pub fn any_changed(&self) -> bool {
        self.runs.iter().any(|run| !run.changed.is_empty())
    }

    pub fn total_changes(&self) -> usize {
        self.runs.iter().map(|run| run.changed.len()).sum()
    }
}

pub struct PassManager {
    passes: Vec<Box<dyn FunctionPass>>,
    statistics: Vec<PassStatistics>,
    collect_stats: bool,
}

impl PassManager {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            statistics: Vec::new(),
            collect_stats: false,
        }
    }

    pub fn enable_statistics(&mut self) {
        self.collect_stats = true;
    }

    pub fn register_pass<P: FunctionPass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    pub fn register_boxed(&mut self, pass: Box<dyn FunctionPass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Runs every pass over every function, passes in registration order and
    /// functions in module order.
    pub fn run_on_module(&mut self, module: &mut Module) -> Result<PipelineReport> {
        let function_names = module.function_names();
        let mut report = PipelineReport::default();

        for pass in self.passes.iter_mut() {
            let start = self.collect_stats.then(Instant::now);
            let mut changed = Vec::new();

            for name in &function_names {
                let (function, symbols) = module
                    .function_and_symbols_mut(name)
                    .ok_or_else(|| IrError::FunctionNotFound(name.clone()))?;

                let did_change = pass
                    .run_on_function(function, symbols)
                    .with_context(|| format!("pass '{}' failed on @{}", pass.name(), name))?;

                tracing::debug!(pass = pass.name(), function = %name, changed = did_change, "ran pass");
                if did_change {
                    changed.push(name.clone());
                }
            }

            if let Some(start) = start {
                self.statistics.push(PassStatistics {
                    name: pass.name().to_string(),
                    duration: start.elapsed(),
                    functions_visited: function_names.len(),
                    functions_changed: changed.len(),
                });
            }

            report.runs.push(PassRun {
                pass: pass.name(),
                changed,
            });
        }

        Ok(report)
    }

    /// Runs the pipeline on a single function of `module`.
    pub fn run_on_function(&mut self, module: &mut Module, name: &str) -> Result<bool> {
        let mut any_changed = false;
        for pass in self.passes.iter_mut() {
            let (function, symbols) = module
                .function_and_symbols_mut(name)
                .ok_or_else(|| IrError::FunctionNotFound(name.to_string()))?;
            any_changed |= pass
                .run_on_function(function, symbols)
                .with_context(|| format!("pass '{}' failed on @{}", pass.name(), name))?;
        }
        Ok(any_changed)
    }

    pub fn statistics(&self) -> &[PassStatistics] {
        &self.statistics
    }

    pub fn get_pass_mut<P: FunctionPass + 'static>(&mut self) -> Option<&mut P> {
        self.passes
            .iter_mut()
            .find_map(|p| p.as_any_mut().downcast_mut::<P>())
    }

    pub fn get_pass<P: FunctionPass + 'static>(&self) -> Option<&P> {
        self.passes
            .iter()
            .find_map(|p| p.as_any().downcast_ref::<P>())
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}
