use crate::{
    cursor::FuncCursor,
    instructions::{BinaryOp, CastOp, Instruction},
    module::{FuncRef, SymbolTable},
    types::Type,
    values::Value,
    IrError, Result,
};

/// Builds a call to `callee` using the return type and calling convention
/// recorded in the symbol table, not whatever the caller happens to use.
pub fn make_call(
    symbols: &SymbolTable,
    callee: FuncRef,
    args: Vec<Value>,
    result: Option<Value>,
) -> Result<Instruction> {
    let decl = symbols
        .get(callee)
        .ok_or(IrError::UnknownSymbol(callee.0))?;

    if decl.signature.params.len() != args.len() {
        return Err(IrError::InvalidInstruction(format!(
            "@{} takes {} arguments, got {}",
            decl.name,
            decl.signature.params.len(),
            args.len()
        )));
    }

    let result = if decl.signature.ret.is_void() {
        None
    } else {
        Some(result.ok_or_else(|| {
            IrError::InvalidInstruction(format!("call to @{} needs a result value", decl.name))
        })?)
    };

    Ok(Instruction::Call {
        result,
        callee,
        args,
        ret: decl.signature.ret.clone(),
        call_conv: decl.call_conv,
    })
}

pub struct InstBuilder<'b, 'a: 'b> {
    cursor: &'b mut FuncCursor<'a>,
}

impl<'b, 'a> InstBuilder<'b, 'a> {
    pub fn new(cursor: &'b mut FuncCursor<'a>) -> Self {
        Self { cursor }
    }

    pub fn call(
        mut self,
        symbols: &SymbolTable,
        callee: FuncRef,
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let returns_value = symbols
            .get(callee)
            .is_some_and(|decl| !decl.signature.ret.is_void());
        let result = returns_value.then(|| self.next_value());
        let inst = make_call(symbols, callee, args, result)?;
        let result = inst.result().cloned();
        self.cursor.insert_inst(inst)?;
        Ok(result)
    }

    pub fn binary(mut self, op: BinaryOp, left: Value, right: Value, ty: Type) -> Result<Value> {
        let result = self.next_value();
        let inst = Instruction::Binary {
            result: result.clone(),
            op,
            left,
            right,
            ty,
        };
        self.cursor.insert_inst(inst)?;
        Ok(result)
    }

    pub fn add(self, left: Value, right: Value, ty: Type) -> Result<Value> {
        self.binary(BinaryOp::Add, left, right, ty)
    }

    pub fn fadd(self, left: Value, right: Value, ty: Type) -> Result<Value> {
        self.binary(BinaryOp::FAdd, left, right, ty)
    }

    pub fn fsub(self, left: Value, right: Value, ty: Type) -> Result<Value> {
        self.binary(BinaryOp::FSub, left, right, ty)
    }

    pub fn fmul(self, left: Value, right: Value, ty: Type) -> Result<Value> {
        self.binary(BinaryOp::FMul, left, right, ty)
    }

    pub fn fdiv(self, left: Value, right: Value, ty: Type) -> Result<Value> {
        self.binary(BinaryOp::FDiv, left, right, ty)
    }

    pub fn frem(self, left: Value, right: Value, ty: Type) -> Result<Value> {
        self.binary(BinaryOp::FRem, left, right, ty)
    }

    pub fn alloca(mut self, ty: Type, align: u32) -> Result<Value> {
        let result = self.next_value();
        let inst = Instruction::Alloca {
            result: result.clone(),
            ty,
            count: None,
            align,
        };
        self.cursor.insert_inst(inst)?;
        Ok(result)
    }

    pub fn load(mut self, ptr: Value, ty: Type) -> Result<Value> {
        let result = self.next_value();
        let inst = Instruction::Load {
            result: result.clone(),
            ptr,
            ty,
        };
        self.cursor.insert_inst(inst)?;
        Ok(result)
    }

    pub fn store(self, ptr: Value, value: Value, ty: Type) -> Result<()> {
        self.cursor.insert_inst(Instruction::Store { ptr, value, ty })
    }

    pub fn cast(mut self, op: CastOp, value: Value, from: Type, to: Type) -> Result<Value> {
        let result = self.next_value();
        let inst = Instruction::Cast {
            result: result.clone(),
            op,
            value,
            from,
            to,
        };
        self.cursor.insert_inst(inst)?;
        Ok(result)
    }

    fn next_value(&mut self) -> Value {
        self.cursor.function.body.make_temp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{Function, Parameter, Signature};
    use crate::instructions::CallConv;
    use crate::values::Constant;

    #[test]
    fn test_call_takes_callee_convention() {
        let mut symbols = SymbolTable::new();
        let dtors = symbols
            .declare(
                "__cxa_finalize",
                Signature::new(vec![Type::I32], Type::Void),
                CallConv::Cold,
            )
            .unwrap();

        let mut function = Function::new("apply", vec![], Type::Void);
        function.call_conv = CallConv::Fast;
        let entry = function.entry_block();

        let mut cursor = FuncCursor::new(&mut function).at_bottom(entry);
        let zero = Value::Constant(Constant::int(0, 32));
        let result = cursor.ins().call(&symbols, dtors, vec![zero]).unwrap();
        assert!(result.is_none());

        let inst = &function.body.get_block(entry).unwrap().instructions[0];
        assert!(matches!(
            inst,
            Instruction::Call {
                call_conv: CallConv::Cold,
                ret: Type::Void,
                ..
            }
        ));
    }

    #[test]
    fn test_call_with_wrong_arity_fails() {
        let mut symbols = SymbolTable::new();
        let ctors = symbols
            .get_or_insert_function("__wasm_call_ctors", Signature::new(vec![], Type::Void))
            .unwrap();

        let err = make_call(
            &symbols,
            ctors,
            vec![Value::Constant(Constant::int(1, 32))],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, IrError::InvalidInstruction(_)));
    }

    #[test]
    fn test_unknown_callee() {
        let symbols = SymbolTable::new();
        assert_eq!(
            make_call(&symbols, FuncRef(7), vec![], None).unwrap_err(),
            IrError::UnknownSymbol(7)
        );
    }

    #[test]
    fn test_value_producing_call_gets_result() {
        let mut symbols = SymbolTable::new();
        let add = symbols
            .get_or_insert_function(
                "_sysio_f32_add",
                Signature::new(vec![Type::F32, Type::F32], Type::F32),
            )
            .unwrap();

        let mut function = Function::new(
            "f",
            vec![Parameter::new("x", Type::F32), Parameter::new("y", Type::F32)],
            Type::F32,
        );
        let entry = function.entry_block();
        let x = function.param(0).unwrap();
        let y = function.param(1).unwrap();

        let mut cursor = FuncCursor::new(&mut function).at_bottom(entry);
        let result = cursor.ins().call(&symbols, add, vec![x, y]).unwrap();
        assert!(matches!(result, Some(Value::Temp(_))));
    }
}
