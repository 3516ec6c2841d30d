use crate::function::{Function, Signature};
use crate::instructions::CallConv;
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Handle to a symbol in a module's [`SymbolTable`]. Handles are never
/// invalidated because symbols are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Declared only; resolved at link time.
    External,
    Defined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDecl {
    pub name: String,
    pub signature: Signature,
    pub call_conv: CallConv,
    pub linkage: Linkage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: IndexMap<String, SymbolDecl>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, func: FuncRef) -> Option<&SymbolDecl> {
        self.symbols
            .get_index(func.0 as usize)
            .map(|(_, decl)| decl)
    }

    pub fn lookup(&self, name: &str) -> Option<FuncRef> {
        self.symbols
            .get_index_of(name)
            .map(|index| FuncRef(index as u32))
    }

    pub fn call_conv(&self, func: FuncRef) -> Option<CallConv> {
        self.get(func).map(|decl| decl.call_conv)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuncRef, &SymbolDecl)> {
        self.symbols
            .values()
            .enumerate()
            .map(|(index, decl)| (FuncRef(index as u32), decl))
    }

    /// Declare-if-absent with the default C calling convention.
    pub fn get_or_insert_function(&mut self, name: &str, signature: Signature) -> Result<FuncRef> {
        self.declare(name, signature, CallConv::C)
    }

    /// Returns the existing handle when `name` is already known with the same
    /// signature; the stored calling convention wins over `call_conv` in that
    /// case.
    pub fn declare(&mut self, name: &str, signature: Signature, call_conv: CallConv) -> Result<FuncRef> {
        if let Some((index, _, existing)) = self.symbols.get_full(name) {
            if existing.signature != signature {
                return Err(IrError::SignatureMismatch {
                    name: name.to_string(),
                    existing: existing.signature.to_string(),
                    requested: signature.to_string(),
                });
            }
            return Ok(FuncRef(index as u32));
        }

        tracing::trace!(symbol = %name, signature = %signature, "declaring external function");
        let (index, _) = self.symbols.insert_full(
            name.to_string(),
            SymbolDecl {
                name: name.to_string(),
                signature,
                call_conv,
                linkage: Linkage::External,
            },
        );
        Ok(FuncRef(index as u32))
    }

    fn define(&mut self, function: &Function) -> Result<FuncRef> {
        let func = self.declare(&function.name, function.signature(), function.call_conv)?;
        if let Some(decl) = self.symbols.get_mut(&function.name) {
            decl.linkage = Linkage::Defined;
            decl.call_conv = function.call_conv;
        }
        Ok(func)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub functions: IndexMap<String, Function>,
    pub symbols: SymbolTable,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: IndexMap::new(),
            symbols: SymbolTable::new(),
        }
    }

    /// Adds a definition. A prior external declaration with the same
    /// signature is upgraded in place, so existing handles stay valid.
    /// A second definition of the same name is rejected.
    pub fn add_function(&mut self, function: Function) -> Result<FuncRef> {
        if self.functions.contains_key(&function.name) {
            return Err(IrError::BuilderError(format!(
                "Function {} already exists",
                function.name
            )));
        }
        let func = self.symbols.define(&function)?;
        self.functions.insert(function.name.clone(), function);
        Ok(func)
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.get_mut(name)
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    /// Disjoint borrows of one function and the symbol table, which is
    /// what a function pass needs to declare runtime helpers while editing.
    pub fn function_and_symbols_mut(
        &mut self,
        name: &str,
    ) -> Option<(&mut Function, &mut SymbolTable)> {
        let function = self.functions.get_mut(name)?;
        Some((function, &mut self.symbols))
    }

    pub fn verify(&self) -> Result<()> {
        for function in self.functions.values() {
            function.verify(&self.symbols)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Parameter;
    use crate::types::Type;

    fn binary_f32() -> Signature {
        Signature::new(vec![Type::F32, Type::F32], Type::F32)
    }

    #[test]
    fn test_get_or_insert_is_idempotent() {
        let mut symbols = SymbolTable::new();

        let first = symbols
            .get_or_insert_function("_sysio_f32_add", binary_f32())
            .unwrap();
        let second = symbols
            .get_or_insert_function("_sysio_f32_add", binary_f32())
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols.get(first).unwrap().linkage, Linkage::External);
    }

    #[test]
    fn test_conflicting_signature_is_rejected() {
        let mut symbols = SymbolTable::new();
        symbols
            .get_or_insert_function("__cxa_finalize", Signature::new(vec![Type::I32], Type::Void))
            .unwrap();

        let err = symbols
            .get_or_insert_function("__cxa_finalize", Signature::new(vec![], Type::Void))
            .unwrap_err();

        assert!(matches!(err, IrError::SignatureMismatch { .. }));
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn test_existing_call_conv_wins() {
        let mut symbols = SymbolTable::new();
        let sig = Signature::new(vec![], Type::Void);
        let declared = symbols
            .declare("__wasm_call_ctors", sig.clone(), CallConv::Fast)
            .unwrap();
        let resolved = symbols
            .get_or_insert_function("__wasm_call_ctors", sig)
            .unwrap();

        assert_eq!(declared, resolved);
        assert_eq!(symbols.call_conv(resolved), Some(CallConv::Fast));
    }

    #[test]
    fn test_definition_upgrades_declaration() {
        let mut module = Module::new("contract");
        let sig = Signature::new(vec![Type::I64], Type::Void);
        let declared = module
            .symbols
            .get_or_insert_function("helper", sig)
            .unwrap();

        let mut helper = Function::new("helper", vec![Parameter::new("x", Type::I64)], Type::Void);
        helper.call_conv = CallConv::Cold;
        let defined = module.add_function(helper).unwrap();

        assert_eq!(declared, defined);
        let decl = module.symbols.get(defined).unwrap();
        assert_eq!(decl.linkage, Linkage::Defined);
        assert_eq!(decl.call_conv, CallConv::Cold);
    }

    #[test]
    fn test_duplicate_definition_is_rejected() {
        let mut module = Module::new("contract");
        let mut first = Function::new("apply", vec![], Type::Void);
        first.add_attribute("first");
        module.add_function(first).unwrap();

        let err = module
            .add_function(Function::new("apply", vec![], Type::Void))
            .unwrap_err();

        assert!(matches!(err, IrError::BuilderError(_)));
        assert!(module.get_function("apply").unwrap().has_attribute("first"));
        assert_eq!(module.functions.len(), 1);
    }

    #[test]
    fn test_function_and_symbols_mut() {
        let mut module = Module::new("contract");
        module
            .add_function(Function::new("apply", vec![], Type::Void))
            .unwrap();

        let (function, symbols) = module.function_and_symbols_mut("apply").unwrap();
        function.add_attribute("sysio_wasm_entry");
        symbols
            .get_or_insert_function("__wasm_call_ctors", Signature::new(vec![], Type::Void))
            .unwrap();

        assert!(module.get_function("apply").unwrap().has_attribute("sysio_wasm_entry"));
        assert!(module.symbols.lookup("__wasm_call_ctors").is_some());
        assert!(module.function_and_symbols_mut("missing").is_none());
    }
}
