use crate::block::{BasicBlock, BlockId};
use crate::instructions::{CallConv, Instruction};
use crate::module::SymbolTable;
use crate::types::Type;
use crate::values::{ParamId, TempId, Value};
use crate::{IrError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub ret: Type,
    pub call_conv: CallConv,
    pub attributes: IndexSet<String>,
    pub body: FunctionBody,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<Parameter>, ret: Type) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            call_conv: CallConv::C,
            attributes: IndexSet::new(),
            body: FunctionBody::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> Signature {
        Signature {
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            ret: self.ret.clone(),
        }
    }

    pub fn entry_block(&self) -> BlockId {
        self.body.entry_block()
    }

    pub fn param(&self, index: usize) -> Option<Value> {
        (index < self.params.len()).then(|| Value::Param(ParamId(index as u32)))
    }

    pub fn add_attribute(&mut self, attr: impl Into<String>) {
        self.attributes.insert(attr.into());
    }

    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.contains(attr)
    }

    /// Checks the structural invariants every pass must preserve.
    pub fn verify(&self, symbols: &SymbolTable) -> Result<()> {
        let fail = |message: String| IrError::Verification {
            function: self.name.clone(),
            message,
        };

        if !self.body.blocks.contains_key(&self.body.entry_block) {
            return Err(fail(format!("missing entry {}", self.body.entry_block)));
        }

        let mut defined = HashSet::new();
        for (block_id, block) in &self.body.blocks {
            if !block.is_terminated() {
                return Err(fail(format!("{} has no terminator", block_id)));
            }

            for target in block.successors() {
                if !self.body.blocks.contains_key(&target) {
                    return Err(fail(format!("{} branches to unknown {}", block_id, target)));
                }
            }

            for (index, inst) in block.instructions.iter().enumerate() {
                if let Some(Value::Temp(temp)) = inst.result() {
                    if !defined.insert(*temp) {
                        return Err(fail(format!("%{} defined twice", temp)));
                    }
                }

                if let Instruction::Call {
                    result,
                    callee,
                    args,
                    ret,
                    ..
                } = inst
                {
                    let decl = symbols
                        .get(*callee)
                        .ok_or_else(|| fail(format!("{}:{} calls unknown symbol", block_id, index)))?;
                    if decl.signature.params.len() != args.len() {
                        return Err(fail(format!(
                            "{}:{} passes {} arguments to @{} which takes {}",
                            block_id,
                            index,
                            args.len(),
                            decl.name,
                            decl.signature.params.len()
                        )));
                    }
                    if decl.signature.ret != *ret || result.is_some() == ret.is_void() {
                        return Err(fail(format!(
                            "{}:{} has a result inconsistent with @{}",
                            block_id, index, decl.name
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl Signature {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self
            .params
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} ({})", self.ret, params)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Position of a non-terminator instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstSite {
    pub block: BlockId,
    pub index: usize,
}

impl InstSite {
    pub fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionBody {
    pub entry_block: BlockId,
    pub blocks: IndexMap<BlockId, BasicBlock>,
    next_block_id: u32,
    next_temp_id: u32,
}

impl FunctionBody {
    pub fn new() -> Self {
        let entry_block = BlockId(0);
        let mut blocks = IndexMap::new();
        blocks.insert(entry_block, BasicBlock::new(entry_block));

        Self {
            entry_block,
            blocks,
            next_block_id: 1,
            next_temp_id: 0,
        }
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, BasicBlock::new(id));
        id
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn get_block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn entry_block(&self) -> BlockId {
        self.entry_block
    }

    /// A temp that no instruction or terminator in the body mentions yet.
    /// Temps placed directly through `blocks` are accounted for.
    pub fn make_temp(&mut self) -> Value {
        self.next_temp_id = self.next_temp_id.max(self.first_unmentioned_temp());
        let id = TempId(self.next_temp_id);
        self.next_temp_id += 1;
        Value::Temp(id)
    }

    fn first_unmentioned_temp(&self) -> u32 {
        self.blocks
            .values()
            .flat_map(|block| {
                block
                    .instructions
                    .iter()
                    .flat_map(|inst| inst.result().into_iter().chain(inst.operands()))
                    .chain(block.terminator.operands())
            })
            .filter_map(Value::as_temp)
            .map(|temp| temp.0 + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.values().map(|b| b.instructions.len()).sum()
    }

    /// Blocks whose terminator is a return, in layout order.
    pub fn return_blocks(&self) -> Vec<BlockId> {
        self.blocks
            .values()
            .filter(|b| b.terminator.is_return())
            .map(|b| b.id)
            .collect()
    }

    pub fn inst(&self, site: InstSite) -> Option<&Instruction> {
        self.blocks.get(&site.block)?.instructions.get(site.index)
    }

    /// Swaps the instruction at `site` for `replacement` and hands back the
    /// original. Users of the old result are not touched; see
    /// [`FunctionBody::replace_all_uses`].
    pub fn replace_inst(&mut self, site: InstSite, replacement: Instruction) -> Result<Instruction> {
        let slot = self
            .blocks
            .get_mut(&site.block)
            .and_then(|b| b.instructions.get_mut(site.index))
            .ok_or_else(|| {
                IrError::InvalidInstruction(format!("no instruction at {}:{}", site.block, site.index))
            })?;
        Ok(std::mem::replace(slot, replacement))
    }

    /// Rebinds every operand equal to `from` to `to`, terminators included.
    /// Returns the number of rewritten operands.
    pub fn replace_all_uses(&mut self, from: &Value, to: &Value) -> usize {
        let mut rewritten = 0;
        for block in self.blocks.values_mut() {
            let operands = block
                .instructions
                .iter_mut()
                .flat_map(|inst| inst.operands_mut())
                .chain(block.terminator.operands_mut());
            for operand in operands {
                if operand == from {
                    *operand = to.clone();
                    rewritten += 1;
                }
            }
        }
        rewritten
    }
}

impl Default for FunctionBody {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Terminator;
    use crate::instructions::BinaryOp;

    fn fadd(result: Value, left: Value, right: Value) -> Instruction {
        Instruction::Binary {
            result,
            op: BinaryOp::FAdd,
            left,
            right,
            ty: Type::F32,
        }
    }

    #[test]
    fn test_make_temp_is_fresh() {
        let mut body = FunctionBody::new();
        let a = body.make_temp();
        let b = body.make_temp();
        assert_ne!(a, b);
    }

    #[test]
    fn test_make_temp_skips_temps_added_directly() {
        let mut body = FunctionBody::new();
        let x = Value::Param(ParamId(0));
        let entry = body.entry_block();
        {
            let block = body.get_block_mut(entry).unwrap();
            block.add_instruction(fadd(Value::Temp(TempId(5)), x.clone(), x.clone()));
            block.set_terminator(Terminator::Return(Some(Value::Temp(TempId(7)))));
        }

        assert_eq!(body.make_temp(), Value::Temp(TempId(8)));
        assert_eq!(body.make_temp(), Value::Temp(TempId(9)));
    }

    #[test]
    fn test_return_blocks_in_layout_order() {
        let mut body = FunctionBody::new();
        let b1 = body.create_block();
        let b2 = body.create_block();
        body.get_block_mut(BlockId(0))
            .unwrap()
            .set_terminator(Terminator::Jump(b1));
        body.get_block_mut(b1)
            .unwrap()
            .set_terminator(Terminator::Return(None));
        body.get_block_mut(b2)
            .unwrap()
            .set_terminator(Terminator::Return(None));

        assert_eq!(body.return_blocks(), vec![b1, b2]);
    }

    #[test]
    fn test_replace_inst_keeps_position() {
        let mut body = FunctionBody::new();
        let x = Value::Param(ParamId(0));
        let first = body.make_temp();
        let second = body.make_temp();
        let entry = body.entry_block();
        {
            let block = body.get_block_mut(entry).unwrap();
            block.add_instruction(fadd(first.clone(), x.clone(), x.clone()));
            block.add_instruction(fadd(second.clone(), first.clone(), x.clone()));
        }

        let replacement = fadd(second.clone(), x.clone(), x.clone());
        let old = body
            .replace_inst(InstSite::new(entry, 1), replacement.clone())
            .unwrap();

        assert_eq!(old.operands()[0], &first);
        assert_eq!(body.inst(InstSite::new(entry, 1)), Some(&replacement));
        assert_eq!(body.instruction_count(), 2);
    }

    #[test]
    fn test_replace_inst_out_of_range() {
        let mut body = FunctionBody::new();
        let entry = body.entry_block();
        let inst = fadd(
            Value::Temp(TempId(0)),
            Value::Param(ParamId(0)),
            Value::Param(ParamId(0)),
        );
        assert!(matches!(
            body.replace_inst(InstSite::new(entry, 0), inst),
            Err(IrError::InvalidInstruction(_))
        ));
    }

    #[test]
    fn test_replace_all_uses_reaches_terminator() {
        let mut body = FunctionBody::new();
        let old = body.make_temp();
        let new = body.make_temp();
        let sum = body.make_temp();
        let entry = body.entry_block();
        {
            let block = body.get_block_mut(entry).unwrap();
            block.add_instruction(fadd(sum.clone(), old.clone(), old.clone()));
            block.set_terminator(Terminator::Return(Some(old.clone())));
        }

        assert_eq!(body.replace_all_uses(&old, &new), 3);
        assert_eq!(
            body.get_block(entry).unwrap().terminator,
            Terminator::Return(Some(new.clone()))
        );
        assert_eq!(
            body.inst(InstSite::new(entry, 0)).unwrap().operands(),
            vec![&new, &new]
        );
    }

    #[test]
    fn test_verify_rejects_unterminated_block() {
        let func = Function::new("f", vec![], Type::Void);
        let symbols = SymbolTable::new();
        assert!(matches!(
            func.verify(&symbols),
            Err(IrError::Verification { .. })
        ));
    }

    #[test]
    fn test_param_lookup() {
        let func = Function::new("f", vec![Parameter::new("a", Type::I64)], Type::Void);
        assert_eq!(func.param(0), Some(Value::Param(ParamId(0))));
        assert_eq!(func.param(1), None);
    }
}
