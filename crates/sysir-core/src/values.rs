use crate::types::Type;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Temp(TempId),
    Param(ParamId),
    Constant(Constant),
}

impl Value {
    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Value::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_temp(&self) -> Option<TempId> {
        match self {
            Value::Temp(t) => Some(*t),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Temp(t) => write!(f, "%{}", t),
            Value::Param(p) => write!(f, "%{}", p),
            Value::Constant(c) => write!(f, "{}", c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempId(pub u32);

impl std::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub u32);

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Float payloads are kept as raw bits so constants stay `Eq` and `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Int(BigInt, u16),
    F32(u32),
    F64(u64),
    Null,
}

impl Constant {
    pub fn zero(ty: &Type) -> Option<Self> {
        match ty {
            Type::Int(bits) => Some(Constant::Int(BigInt::zero(), *bits)),
            Type::F32 => Some(Constant::F32(0)),
            Type::F64 => Some(Constant::F64(0)),
            Type::Ptr => Some(Constant::Null),
            _ => None,
        }
    }

    pub fn int(value: i64, bits: u16) -> Self {
        Constant::Int(BigInt::from(value), bits)
    }

    pub fn f32(value: f32) -> Self {
        Constant::F32(value.to_bits())
    }

    pub fn f64(value: f64) -> Self {
        Constant::F64(value.to_bits())
    }

    pub fn ty(&self) -> Type {
        match self {
            Constant::Int(_, bits) => Type::Int(*bits),
            Constant::F32(_) => Type::F32,
            Constant::F64(_) => Type::F64,
            Constant::Null => Type::Ptr,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int(val, _) => val.to_i64(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(val, _) => write!(f, "{}", val),
            Constant::F32(bits) => write!(f, "{:?}", f32::from_bits(*bits)),
            Constant::F64(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            Constant::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_typed() {
        let zero = Constant::zero(&Type::I32).unwrap();
        assert_eq!(zero.ty(), Type::I32);
        assert_eq!(zero.as_int(), Some(0));
        assert!(Constant::zero(&Type::Void).is_none());
    }

    #[test]
    fn test_float_constants_compare_by_bits() {
        assert_eq!(Constant::f32(1.5), Constant::f32(1.5));
        assert_ne!(Constant::f64(0.0), Constant::f64(-0.0));
        assert_eq!(Constant::f64(2.0).to_string(), "2.0");
    }
}
