use crate::instructions::Instruction;
use crate::values::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "block{}", self.0)
    }
}

/// The terminator lives outside `instructions`, so a block can never hold
/// more than one and insertion "at the end" always lands before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            instructions: Vec::new(),
            terminator: Terminator::Invalid,
        }
    }

    pub fn add_instruction(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn set_terminator(&mut self, term: Terminator) {
        self.terminator = term;
    }

    pub fn is_terminated(&self) -> bool {
        !matches!(self.terminator, Terminator::Invalid)
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator.successors()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terminator {
    Jump(BlockId),
    Branch {
        condition: Value,
        then_block: BlockId,
        else_block: BlockId,
    },

    Switch {
        value: Value,
        default: BlockId,
        cases: Vec<(Value, BlockId)>,
    },

    Return(Option<Value>),

    Unreachable,

    Invalid,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Switch { default, cases, .. } => {
                let mut blocks = vec![*default];
                blocks.extend(cases.iter().map(|(_, block)| *block));
                blocks
            }
            Terminator::Return(_) | Terminator::Unreachable | Terminator::Invalid => vec![],
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Terminator::Return(_))
    }

    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Terminator::Branch { condition, .. } => vec![condition],
            Terminator::Switch { value, cases, .. } => {
                let mut values = vec![value];
                values.extend(cases.iter().map(|(v, _)| v));
                values
            }
            Terminator::Return(value) => value.iter().collect(),
            Terminator::Jump(_) | Terminator::Unreachable | Terminator::Invalid => vec![],
        }
    }

    pub fn operands_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Terminator::Branch { condition, .. } => vec![condition],
            Terminator::Switch { value, cases, .. } => {
                let mut values = vec![value];
                values.extend(cases.iter_mut().map(|(v, _)| v));
                values
            }
            Terminator::Return(value) => value.iter_mut().collect(),
            Terminator::Jump(_) | Terminator::Unreachable | Terminator::Invalid => vec![],
        }
    }
}
