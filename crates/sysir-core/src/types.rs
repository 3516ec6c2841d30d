use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Int(u16),
    F32,
    F64,
    /// 80-bit x87 extended precision. The wasm target cannot hold it.
    X86Fp80,
    Fp128,
    Ptr,
}

impl Type {
    pub const I1: Type = Type::Int(1);
    pub const I8: Type = Type::Int(8);
    pub const I32: Type = Type::Int(32);
    pub const I64: Type = Type::Int(64);

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Type::F32 | Type::F64 | Type::X86Fp80 | Type::Fp128
        )
    }

    pub fn is_extended_precision(&self) -> bool {
        matches!(self, Type::X86Fp80)
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            Type::Void => 0,
            Type::Int(bits) => (*bits as usize + 7) / 8,
            Type::F32 => 4,
            Type::F64 => 8,
            Type::X86Fp80 => 10,
            Type::Fp128 => 16,
            Type::Ptr => 4,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::F32 => write!(f, "float"),
            Type::F64 => write!(f, "double"),
            Type::X86Fp80 => write!(f, "x86_fp80"),
            Type::Fp128 => write!(f, "fp128"),
            Type::Ptr => write!(f, "ptr"),
        }
    }
}
