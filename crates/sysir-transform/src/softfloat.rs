use anyhow::Result;
use std::any::Any;
use sysir_core::{
    analysis::FunctionPass,
    function::{Function, InstSite, Signature},
    inst_builder::make_call,
    instructions::{BinaryOp, Instruction},
    module::{FuncRef, SymbolTable},
    types::Type,
    values::Value,
    IrError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    pub const ALL: [Precision; 2] = [Precision::Single, Precision::Double];

    pub fn of(ty: &Type) -> Option<Self> {
        match ty {
            Type::F32 => Some(Precision::Single),
            Type::F64 => Some(Precision::Double),
            _ => None,
        }
    }

    pub fn ty(self) -> Type {
        match self {
            Precision::Single => Type::F32,
            Precision::Double => Type::F64,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Precision::Single => "f32",
            Precision::Double => "f64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl SoftOp {
    pub const ALL: [SoftOp; 5] = [SoftOp::Add, SoftOp::Sub, SoftOp::Mul, SoftOp::Div, SoftOp::Rem];

    /// `frem` is deliberately absent: the runtime exports `_rem` routines but
    /// remainder instructions are left for the backend.
    pub fn lowered_from(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::FAdd => Some(SoftOp::Add),
            BinaryOp::FSub => Some(SoftOp::Sub),
            BinaryOp::FMul => Some(SoftOp::Mul),
            BinaryOp::FDiv => Some(SoftOp::Div),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            SoftOp::Add => "add",
            SoftOp::Sub => "sub",
            SoftOp::Mul => "mul",
            SoftOp::Div => "div",
            SoftOp::Rem => "rem",
        }
    }
}

/// Runtime symbol for one precision/operator pair, e.g. `_sysio_f64_div`.
pub fn routine_name(precision: Precision, op: SoftOp) -> String {
    format!("_sysio_{}_{}", precision.prefix(), op.suffix())
}

/// Handles to all ten runtime routines for one module.
#[derive(Debug, Clone)]
pub struct SoftfloatRoutines {
    handles: [[FuncRef; 5]; 2],
}

impl SoftfloatRoutines {
    pub fn resolve(symbols: &mut SymbolTable) -> sysir_core::Result<Self> {
        let mut handles = [[FuncRef(0); 5]; 2];
        for precision in Precision::ALL {
            let ty = precision.ty();
            let signature = Signature::new(vec![ty.clone(), ty.clone()], ty);
            for op in SoftOp::ALL {
                handles[precision as usize][op as usize] =
                    symbols.get_or_insert_function(&routine_name(precision, op), signature.clone())?;
            }
        }
        Ok(Self { handles })
    }

    pub fn get(&self, precision: Precision, op: SoftOp) -> FuncRef {
        self.handles[precision as usize][op as usize]
    }

    /// The routine replacing `op` on operands of type `ty`, if any.
    pub fn lookup(&self, op: BinaryOp, ty: &Type) -> Option<FuncRef> {
        let op = SoftOp::lowered_from(op)?;
        let precision = Precision::of(ty)?;
        Some(self.get(precision, op))
    }
}

struct Candidate {
    site: InstSite,
    routine: FuncRef,
    left: Value,
    right: Value,
    result: Value,
}

#[derive(Debug, Clone)]
pub struct PendingRewrite {
    pub site: InstSite,
    pub replacement: Instruction,
    pub old_result: Value,
    pub new_result: Value,
}

/// Replaces single and double precision `fadd`/`fsub`/`fmul`/`fdiv` with
/// calls to the runtime's softfloat routines and widens `x86_fp80` stack
/// slots to `fp128`.
#[derive(Debug, Default)]
pub struct SoftfloatPass {
    rewritten: usize,
    widened: usize,
}

impl SoftfloatPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total arithmetic rewrites over the lifetime of this pass.
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }

    /// Total `x86_fp80` allocas widened over the lifetime of this pass.
    pub fn widened(&self) -> usize {
        self.widened
    }

    /// Walks every instruction once. Alloca retyping happens in place; every
    /// arithmetic site becomes a pending rewrite, kept in program order.
    pub fn scan(
        &mut self,
        function: &mut Function,
        symbols: &SymbolTable,
        routines: &SoftfloatRoutines,
    ) -> Result<Vec<PendingRewrite>> {
        let mut candidates = Vec::new();

        for (&block_id, block) in function.body.blocks.iter_mut() {
            for (index, inst) in block.instructions.iter_mut().enumerate() {
                match inst {
                    Instruction::Alloca { ty, .. } if ty.is_extended_precision() => {
                        *ty = Type::Fp128;
                        self.widened += 1;
                    }
                    Instruction::Binary {
                        result,
                        op,
                        left,
                        right,
                        ty,
                    } => {
                        if let Some(routine) = routines.lookup(*op, ty) {
                            candidates.push(Candidate {
                                site: InstSite::new(block_id, index),
                                routine,
                                left: left.clone(),
                                right: right.clone(),
                                result: result.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut pending = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let new_result = function.body.make_temp();
            let replacement = make_call(
                symbols,
                candidate.routine,
                vec![candidate.left, candidate.right],
                Some(new_result.clone()),
            )?;
            pending.push(PendingRewrite {
                site: candidate.site,
                replacement,
                old_result: candidate.result,
                new_result,
            });
        }

        Ok(pending)
    }

    /// Installs every replacement, then rebinds the users of each replaced
    /// result. Rebinding last also fixes operands of replacements that read
    /// an earlier rewritten result.
    pub fn apply(&mut self, function: &mut Function, pending: Vec<PendingRewrite>) -> Result<usize> {
        let mut rebinds = Vec::with_capacity(pending.len());

        for rewrite in pending {
            let original = function.body.replace_inst(rewrite.site, rewrite.replacement)?;
            if original.result() != Some(&rewrite.old_result) {
                return Err(IrError::InvalidInstruction(format!(
                    "{}:{} in @{} changed between scan and rewrite",
                    rewrite.site.block, rewrite.site.index, function.name
                ))
                .into());
            }
            tracing::trace!(
                function = %function.name,
                block = %rewrite.site.block,
                index = rewrite.site.index,
                "replaced float arithmetic with softfloat call"
            );
            rebinds.push((rewrite.old_result, rewrite.new_result));
        }

        for (old, new) in &rebinds {
            function.body.replace_all_uses(old, new);
        }

        self.rewritten += rebinds.len();
        Ok(rebinds.len())
    }
}

impl FunctionPass for SoftfloatPass {
    fn name(&self) -> &'static str {
        "softfloat_fixup"
    }

    fn description(&self) -> &'static str {
        "Sysio Softfloat Fixups"
    }

    fn run_on_function(
        &mut self,
        function: &mut Function,
        symbols: &mut SymbolTable,
    ) -> Result<bool> {
        let routines = SoftfloatRoutines::resolve(symbols)?;
        let widened_before = self.widened;

        let pending = self.scan(function, symbols, &routines)?;
        let rewritten = self.apply(function, pending)?;

        tracing::debug!(
            function = %function.name,
            rewritten,
            widened = self.widened - widened_before,
            "lowered float arithmetic"
        );

        // Widening allocas alone does not count as a change.
        Ok(rewritten > 0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
