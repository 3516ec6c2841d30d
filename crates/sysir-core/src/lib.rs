/*! Core IR types, symbol table and pass framework for sysio contract lowering.
 *
 * Contracts reach the wasm backend as a module of SSA functions. The lowering passes need to insert
 * calls, declare runtime symbols and swap instructions in place without disturbing the rest of the
 * graph. This crate provides that graph and the small amount of machinery to walk and edit it.
 */

pub mod analysis;
pub mod block;
pub mod cursor;
pub mod format;
pub mod function;
pub mod inst_builder;
pub mod instructions;
pub mod module;
pub mod types;
pub mod values;

pub use analysis::{FunctionPass, PassManager, PassRun, PipelineReport};
pub use block::{BasicBlock, BlockId, Terminator};
pub use cursor::{CursorPosition, FuncCursor};
pub use function::{Function, FunctionBody, InstSite, Parameter, Signature};
pub use instructions::{BinaryOp, CallConv, CastOp, Instruction};
pub use module::{FuncRef, Linkage, Module, SymbolDecl, SymbolTable};
pub use types::Type;
pub use values::{Constant, ParamId, TempId, Value};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
    #[error("Unknown symbol reference: {0}")]
    UnknownSymbol(u32),
    #[error("Symbol {name} already declared as {existing}, requested {requested}")]
    SignatureMismatch {
        name: String,
        existing: String,
        requested: String,
    },
    #[error("Verification failed in {function}: {message}")]
    Verification { function: String, message: String },
}

pub type Result<T> = std::result::Result<T, IrError>;
