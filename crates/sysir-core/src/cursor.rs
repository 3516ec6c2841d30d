use crate::{
    block::{BasicBlock, BlockId, Terminator},
    function::Function,
    inst_builder::InstBuilder,
    instructions::Instruction,
    IrError, Result,
};

/// Where the next inserted instruction goes.
///
/// `At(block, i)` inserts before the instruction currently at `i` and then
/// steps past it, so consecutive inserts keep their order. `After(block)`
/// appends, which places the instruction directly before the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPosition {
    #[default]
    Nowhere,
    Before(BlockId),
    At(BlockId, usize),
    After(BlockId),
}

pub struct FuncCursor<'a> {
    position: CursorPosition,
    pub(crate) function: &'a mut Function,
}

impl<'a> FuncCursor<'a> {
    pub fn new(function: &'a mut Function) -> Self {
        Self {
            position: CursorPosition::Nowhere,
            function,
        }
    }

    pub fn position(&self) -> CursorPosition {
        self.position
    }

    pub fn set_position(&mut self, pos: CursorPosition) {
        self.position = pos;
    }

    pub fn goto_top(&mut self, block: BlockId) {
        self.position = CursorPosition::Before(block);
    }

    pub fn goto_bottom(&mut self, block: BlockId) {
        self.position = CursorPosition::After(block);
    }

    pub fn goto_inst(&mut self, block: BlockId, index: usize) {
        self.position = CursorPosition::At(block, index);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        match self.position {
            CursorPosition::Before(b) | CursorPosition::At(b, _) | CursorPosition::After(b) => {
                Some(b)
            }
            CursorPosition::Nowhere => None,
        }
    }

    pub fn insert_inst(&mut self, inst: Instruction) -> Result<()> {
        let (block, index) = match self.position {
            CursorPosition::Nowhere => {
                return Err(IrError::BuilderError(
                    "Cannot insert at Nowhere position".into(),
                ));
            }
            CursorPosition::Before(block) => (block, Some(0)),
            CursorPosition::At(block, idx) => (block, Some(idx)),
            CursorPosition::After(block) => (block, None),
        };

        let block_data = self
            .get_block_mut(block)
            .ok_or_else(|| IrError::BuilderError(format!("Block {} not found", block)))?;

        match index {
            Some(idx) if idx > block_data.instructions.len() => {
                return Err(IrError::BuilderError(format!(
                    "Insertion point {}:{} is past the end",
                    block, idx
                )));
            }
            Some(idx) => {
                block_data.instructions.insert(idx, inst);
                self.position = CursorPosition::At(block, idx + 1);
            }
            None => block_data.instructions.push(inst),
        }
        Ok(())
    }

    pub fn set_terminator(&mut self, term: Terminator) -> Result<()> {
        let block_id = self
            .current_block()
            .ok_or_else(|| IrError::BuilderError("No current block".into()))?;

        let block = self
            .get_block_mut(block_id)
            .ok_or_else(|| IrError::BuilderError(format!("Block {} not found", block_id)))?;

        if block.is_terminated() {
            return Err(IrError::BuilderError(format!(
                "Block {} already has terminator",
                block_id
            )));
        }

        block.terminator = term;
        Ok(())
    }

    pub fn is_terminated(&self) -> bool {
        self.current_block()
            .and_then(|b| self.function.body.blocks.get(&b))
            .map(|b| b.is_terminated())
            .unwrap_or(false)
    }

    fn get_block_mut(&mut self, block_id: BlockId) -> Option<&mut BasicBlock> {
        self.function.body.blocks.get_mut(&block_id)
    }

    pub fn ins(&mut self) -> InstBuilder<'_, 'a> {
        InstBuilder::new(self)
    }
}

impl<'a> FuncCursor<'a> {
    pub fn at_bottom(mut self, block: BlockId) -> Self {
        self.goto_bottom(block);
        self
    }

    pub fn at_top(mut self, block: BlockId) -> Self {
        self.goto_top(block);
        self
    }
}
