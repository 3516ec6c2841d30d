use crate::{
    block::BlockId,
    function::{Function, InstSite},
    values::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseSite {
    Instruction { site: InstSite, operand: usize },
    Terminator { block: BlockId, operand: usize },
}

impl UseSite {
    pub fn block(&self) -> BlockId {
        match self {
            UseSite::Instruction { site, .. } => site.block,
            UseSite::Terminator { block, .. } => *block,
        }
    }
}

/// Every operand slot in `function` that reads `value`, in layout order.
pub fn uses_of(function: &Function, value: &Value) -> Vec<UseSite> {
    let mut uses = Vec::new();

    for (&block_id, block) in &function.body.blocks {
        for (index, inst) in block.instructions.iter().enumerate() {
            for (operand, used) in inst.operands().into_iter().enumerate() {
                if used == value {
                    uses.push(UseSite::Instruction {
                        site: InstSite::new(block_id, index),
                        operand,
                    });
                }
            }
        }

        for (operand, used) in block.terminator.operands().into_iter().enumerate() {
            if used == value {
                uses.push(UseSite::Terminator {
                    block: block_id,
                    operand,
                });
            }
        }
    }

    uses
}

pub fn defining_site(function: &Function, value: &Value) -> Option<InstSite> {
    function.body.blocks.iter().find_map(|(&block_id, block)| {
        block
            .instructions
            .iter()
            .position(|inst| inst.result() == Some(value))
            .map(|index| InstSite::new(block_id, index))
    })
}
