use crate::config::EntryConfig;
use anyhow::Result;
use std::any::Any;
use sysir_core::{
    analysis::FunctionPass,
    cursor::FuncCursor,
    function::{Function, Signature},
    module::SymbolTable,
    types::Type,
    values::{Constant, ParamId, Value},
    IrError,
};

pub const SET_CONTRACT_NAME: &str = "sysio_set_contract_name";
pub const CALL_CTORS: &str = "__wasm_call_ctors";
pub const CALL_DTORS: &str = "__cxa_finalize";

/// Wraps the contract entry point with runtime setup and teardown.
///
/// The entry block gets `sysio_set_contract_name(receiver)` followed by
/// `__wasm_call_ctors()`, and every returning block gets
/// `__cxa_finalize(0)` right before its `ret`.
pub struct EntryWrapperPass {
    entry: EntryConfig,
}

impl EntryWrapperPass {
    pub fn new(entry: EntryConfig) -> Self {
        Self { entry }
    }

    pub fn is_entry(&self, function: &Function) -> bool {
        function.has_attribute(&self.entry.attribute) || function.name == self.entry.name
    }

    fn wrap(&self, function: &mut Function, symbols: &mut SymbolTable) -> Result<()> {
        let receiver = match function.params.first() {
            Some(param) if param.ty == Type::I64 => Value::Param(ParamId(0)),
            Some(param) => {
                return Err(IrError::TypeError(format!(
                    "entry @{} takes {} as its first argument, {} needs i64",
                    function.name, param.ty, SET_CONTRACT_NAME
                ))
                .into())
            }
            None => {
                return Err(IrError::TypeError(format!(
                    "entry @{} has no receiver argument for {}",
                    function.name, SET_CONTRACT_NAME
                ))
                .into())
            }
        };

        let ctors = symbols.get_or_insert_function(CALL_CTORS, Signature::new(vec![], Type::Void))?;
        let dtors = symbols
            .get_or_insert_function(CALL_DTORS, Signature::new(vec![Type::I32], Type::Void))?;
        let set_contract = symbols
            .get_or_insert_function(SET_CONTRACT_NAME, Signature::new(vec![Type::I64], Type::Void))?;

        let entry = function.entry_block();
        let exits = function.body.return_blocks();
        let zero = Constant::zero(&Type::I32)
            .map(Value::Constant)
            .ok_or_else(|| IrError::TypeError("no zero constant for i32".into()))?;

        let mut cursor = FuncCursor::new(function).at_top(entry);
        cursor.ins().call(symbols, set_contract, vec![receiver])?;
        cursor.ins().call(symbols, ctors, vec![])?;

        for &block in &exits {
            cursor.goto_bottom(block);
            cursor.ins().call(symbols, dtors, vec![zero.clone()])?;
        }

        tracing::debug!(function = %function.name, exits = exits.len(), "wrapped contract entry");
        Ok(())
    }
}

impl Default for EntryWrapperPass {
    fn default() -> Self {
        Self::new(EntryConfig::default())
    }
}

impl FunctionPass for EntryWrapperPass {
    fn name(&self) -> &'static str {
        "apply_fixup"
    }

    fn description(&self) -> &'static str {
        "Sysio Apply Fixups"
    }

    fn run_on_function(
        &mut self,
        function: &mut Function,
        symbols: &mut SymbolTable,
    ) -> Result<bool> {
        if !self.is_entry(function) {
            return Ok(false);
        }

        self.wrap(function, symbols)?;
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
