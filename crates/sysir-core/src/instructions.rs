use crate::block::BlockId;
use crate::module::FuncRef;
use crate::types::Type;
use crate::values::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Alloca {
        result: Value,
        ty: Type,
        count: Option<Value>,
        align: u32,
    },
    Load {
        result: Value,
        ptr: Value,
        ty: Type,
    },
    Store {
        ptr: Value,
        value: Value,
        ty: Type,
    },

    Binary {
        result: Value,
        op: BinaryOp,
        left: Value,
        right: Value,
        ty: Type,
    },

    Cast {
        result: Value,
        op: CastOp,
        value: Value,
        from: Type,
        to: Type,
    },

    Select {
        result: Value,
        condition: Value,
        then_val: Value,
        else_val: Value,
        ty: Type,
    },
    Phi {
        result: Value,
        ty: Type,
        incoming: Vec<(BlockId, Value)>,
    },

    /// `result` is `None` exactly when `ret` is void.
    Call {
        result: Option<Value>,
        callee: FuncRef,
        args: Vec<Value>,
        ret: Type,
        call_conv: CallConv,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinaryOp {
    pub fn is_float_op(self) -> bool {
        matches!(
            self,
            BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::URem => "urem",
            BinaryOp::SRem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastOp {
    Bitcast,
    ZExt,
    SExt,
    Trunc,
    FpExt,
    FpTrunc,
}

impl CastOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CastOp::Bitcast => "bitcast",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::Trunc => "trunc",
            CastOp::FpExt => "fpext",
            CastOp::FpTrunc => "fptrunc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallConv {
    #[default]
    C,
    Fast,
    Cold,
    PreserveMost,
    Numbered(u32),
}

impl std::fmt::Display for CallConv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallConv::C => write!(f, "ccc"),
            CallConv::Fast => write!(f, "fastcc"),
            CallConv::Cold => write!(f, "coldcc"),
            CallConv::PreserveMost => write!(f, "preserve_mostcc"),
            CallConv::Numbered(n) => write!(f, "cc {}", n),
        }
    }
}

impl Instruction {
    pub fn result(&self) -> Option<&Value> {
        match self {
            Instruction::Alloca { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::Binary { result, .. }
            | Instruction::Cast { result, .. }
            | Instruction::Select { result, .. }
            | Instruction::Phi { result, .. } => Some(result),
            Instruction::Call { result, .. } => result.as_ref(),
            Instruction::Store { .. } => None,
        }
    }

    pub fn result_type(&self) -> Type {
        match self {
            Instruction::Alloca { .. } => Type::Ptr,
            Instruction::Load { ty, .. }
            | Instruction::Binary { ty, .. }
            | Instruction::Select { ty, .. }
            | Instruction::Phi { ty, .. } => ty.clone(),
            Instruction::Cast { to, .. } => to.clone(),
            Instruction::Call { ret, .. } => ret.clone(),
            Instruction::Store { .. } => Type::Void,
        }
    }

    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Instruction::Alloca { count, .. } => count.iter().collect(),
            Instruction::Load { ptr, .. } => vec![ptr],
            Instruction::Store { ptr, value, .. } => vec![ptr, value],
            Instruction::Binary { left, right, .. } => vec![left, right],
            Instruction::Cast { value, .. } => vec![value],
            Instruction::Select {
                condition,
                then_val,
                else_val,
                ..
            } => vec![condition, then_val, else_val],
            Instruction::Phi { incoming, .. } => incoming.iter().map(|(_, v)| v).collect(),
            Instruction::Call { args, .. } => args.iter().collect(),
        }
    }

    pub fn operands_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Instruction::Alloca { count, .. } => count.iter_mut().collect(),
            Instruction::Load { ptr, .. } => vec![ptr],
            Instruction::Store { ptr, value, .. } => vec![ptr, value],
            Instruction::Binary { left, right, .. } => vec![left, right],
            Instruction::Cast { value, .. } => vec![value],
            Instruction::Select {
                condition,
                then_val,
                else_val,
                ..
            } => vec![condition, then_val, else_val],
            Instruction::Phi { incoming, .. } => incoming.iter_mut().map(|(_, v)| v).collect(),
            Instruction::Call { args, .. } => args.iter_mut().collect(),
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Instruction::Call { .. })
    }

    pub fn callee(&self) -> Option<FuncRef> {
        match self {
            Instruction::Call { callee, .. } => Some(*callee),
            _ => None,
        }
    }

    pub fn is_float_binary(&self) -> bool {
        matches!(self, Instruction::Binary { op, .. } if op.is_float_op())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{Constant, ParamId, TempId};

    #[test]
    fn test_binary_operands_keep_order() {
        let inst = Instruction::Binary {
            result: Value::Temp(TempId(2)),
            op: BinaryOp::FSub,
            left: Value::Param(ParamId(1)),
            right: Value::Param(ParamId(0)),
            ty: Type::F32,
        };

        assert_eq!(
            inst.operands(),
            vec![&Value::Param(ParamId(1)), &Value::Param(ParamId(0))]
        );
        assert!(inst.is_float_binary());
        assert_eq!(inst.result_type(), Type::F32);
    }

    #[test]
    fn test_void_call_has_no_result() {
        let inst = Instruction::Call {
            result: None,
            callee: FuncRef(0),
            args: vec![Value::Constant(Constant::int(0, 32))],
            ret: Type::Void,
            call_conv: CallConv::C,
        };

        assert!(inst.result().is_none());
        assert_eq!(inst.callee(), Some(FuncRef(0)));
        assert!(!inst.is_float_binary());
    }

    #[test]
    fn test_operands_mut_reaches_phi_incoming() {
        let mut inst = Instruction::Phi {
            result: Value::Temp(TempId(5)),
            ty: Type::F64,
            incoming: vec![
                (BlockId(0), Value::Temp(TempId(1))),
                (BlockId(1), Value::Temp(TempId(2))),
            ],
        };

        for operand in inst.operands_mut() {
            *operand = Value::Temp(TempId(9));
        }

        assert!(inst
            .operands()
            .iter()
            .all(|v| **v == Value::Temp(TempId(9))));
    }
}
