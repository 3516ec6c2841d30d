use crate::{
    block::{BasicBlock, Terminator},
    function::Function,
    instructions::Instruction,
    module::{Linkage, Module, SymbolTable},
    types::Type,
};
use std::fmt::Write;

pub fn format_module(module: &Module) -> String {
    let mut output = String::new();

    writeln!(&mut output, "; module: {}", module.name).unwrap();

    let mut declared_any = false;
    for (_, decl) in module.symbols.iter() {
        if decl.linkage == Linkage::External {
            let params = decl
                .signature
                .params
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                &mut output,
                "declare {} {} @{}({})",
                decl.call_conv, decl.signature.ret, decl.name, params
            )
            .unwrap();
            declared_any = true;
        }
    }

    for function in module.functions.values() {
        if declared_any {
            writeln!(&mut output).unwrap();
        }
        write!(&mut output, "{}", format_function(function, &module.symbols)).unwrap();
        declared_any = true;
    }

    output
}

pub fn format_function(function: &Function, symbols: &SymbolTable) -> String {
    let mut output = String::new();

    let params = function
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} %p{}", p.ty, i))
        .collect::<Vec<_>>()
        .join(", ");
    write!(
        &mut output,
        "define {} {} @{}({})",
        function.call_conv, function.ret, function.name, params
    )
    .unwrap();

    for attr in &function.attributes {
        write!(&mut output, " \"{}\"", attr).unwrap();
    }

    writeln!(&mut output, " {{").unwrap();

    for block in function.body.blocks.values() {
        write!(&mut output, "{}", format_block(block, &function.ret, symbols)).unwrap();
    }

    writeln!(&mut output, "}}").unwrap();

    output
}

fn format_block(block: &BasicBlock, ret: &Type, symbols: &SymbolTable) -> String {
    let mut output = String::new();

    writeln!(&mut output, "{}:", block.id).unwrap();

    for inst in &block.instructions {
        writeln!(&mut output, "    {}", format_instruction(inst, symbols)).unwrap();
    }

    writeln!(&mut output, "    {}", format_terminator(&block.terminator, ret)).unwrap();

    output
}

pub fn format_instruction(inst: &Instruction, symbols: &SymbolTable) -> String {
    match inst {
        Instruction::Alloca {
            result,
            ty,
            count,
            align,
        } => match count {
            Some(count) => format!("{} = alloca {}, {}, align {}", result, ty, count, align),
            None => format!("{} = alloca {}, align {}", result, ty, align),
        },
        Instruction::Load { result, ptr, ty } => format!("{} = load {}, ptr {}", result, ty, ptr),
        Instruction::Store { ptr, value, ty } => format!("store {} {}, ptr {}", ty, value, ptr),
        Instruction::Binary {
            result,
            op,
            left,
            right,
            ty,
        } => format!("{} = {} {} {}, {}", result, op.mnemonic(), ty, left, right),
        Instruction::Cast {
            result,
            op,
            value,
            from,
            to,
        } => format!("{} = {} {} {} to {}", result, op.mnemonic(), from, value, to),
        Instruction::Select {
            result,
            condition,
            then_val,
            else_val,
            ty,
        } => format!(
            "{} = select i1 {}, {} {}, {} {}",
            result, condition, ty, then_val, ty, else_val
        ),
        Instruction::Phi {
            result,
            ty,
            incoming,
        } => {
            let edges = incoming
                .iter()
                .map(|(block, value)| format!("[ {}, {} ]", value, block))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} = phi {} {}", result, ty, edges)
        }
        Instruction::Call {
            result,
            callee,
            args,
            ret,
            call_conv,
        } => {
            let (name, param_types) = match symbols.get(*callee) {
                Some(decl) => (decl.name.clone(), decl.signature.params.clone()),
                None => (format!("<unknown:{}>", callee.0), Vec::new()),
            };
            let args = args
                .iter()
                .enumerate()
                .map(|(i, arg)| match param_types.get(i) {
                    Some(ty) => format!("{} {}", ty, arg),
                    None => arg.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            let call = format!("call {} {} @{}({})", call_conv, ret, name, args);
            match result {
                Some(result) => format!("{} = {}", result, call),
                None => call,
            }
        }
    }
}

fn format_terminator(term: &Terminator, ret: &Type) -> String {
    match term {
        Terminator::Jump(target) => format!("br {}", target),
        Terminator::Branch {
            condition,
            then_block,
            else_block,
        } => format!("br i1 {}, {}, {}", condition, then_block, else_block),
        Terminator::Switch {
            value,
            default,
            cases,
        } => {
            let cases = cases
                .iter()
                .map(|(v, b)| format!("{}: {}", v, b))
                .collect::<Vec<_>>()
                .join(", ");
            format!("switch {}, {} [{}]", value, default, cases)
        }
        Terminator::Return(Some(value)) => format!("ret {} {}", ret, value),
        Terminator::Return(None) => "ret void".to_string(),
        Terminator::Unreachable => "unreachable".to_string(),
        Terminator::Invalid => "<invalid>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::FuncCursor;
    use crate::function::{Parameter, Signature};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_module() {
        let mut module = Module::new("contract");
        let ctors = module
            .symbols
            .get_or_insert_function("__wasm_call_ctors", Signature::new(vec![], Type::Void))
            .unwrap();

        let mut function = Function::new(
            "apply",
            vec![Parameter::new("x", Type::F32), Parameter::new("y", Type::F32)],
            Type::F32,
        );
        function.add_attribute("sysio_wasm_entry");
        let entry = function.entry_block();
        let x = function.param(0).unwrap();
        let y = function.param(1).unwrap();

        let mut cursor = FuncCursor::new(&mut function).at_bottom(entry);
        cursor.ins().call(&module.symbols, ctors, vec![]).unwrap();
        let sum = cursor.ins().fadd(x, y, Type::F32).unwrap();
        cursor.set_terminator(Terminator::Return(Some(sum))).unwrap();
        module.add_function(function).unwrap();

        let expected = "\
; module: contract
declare ccc void @__wasm_call_ctors()

define ccc float @apply(float %p0, float %p1) \"sysio_wasm_entry\" {
block0:
    call ccc void @__wasm_call_ctors()
    %t0 = fadd float %p0, %p1
    ret float %t0
}
";
        assert_eq!(format_module(&module), expected);
    }
}
