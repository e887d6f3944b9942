//! Tests for the abstract machine.

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use crate::{
    api::{CodegenOptions, ConcatLowering},
    ast::{AstBuilder, BinaryOp, Label, MethodDecl, MethodSignature, Stmt, ValueType},
    compiler::MethodSizeGuard,
    stream::{FrozenStream, Instruction, InstructionStream},
    vm::{ExecError, Locals, Machine, Value},
};

fn compile(options: &CodegenOptions, body: &[Stmt<'_>]) -> FrozenStream {
    let method = MethodDecl {
        signature: MethodSignature::method("T", "m", &[]),
        body,
    };
    MethodSizeGuard::new(options)
        .unwrap()
        .generate(&method)
        .unwrap()
        .unwrap()
}

fn locals(values: &[(u16, Value)]) -> Locals {
    values.iter().cloned().collect()
}

#[test]
fn test_arithmetic() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    // (a * 3 - b) / 2
    let a = ast.operand(0, ValueType::Int);
    let b = ast.operand(1, ValueType::Int);
    let expr = ast.binary(
        BinaryOp::Div,
        ast.binary(BinaryOp::Sub, ast.binary(BinaryOp::Mul, a, ast.int(3)), b),
        ast.int(2),
    );
    let code = compile(&CodegenOptions::default(), &[Stmt::Return(Some(expr))]);

    let result = Machine::new()
        .run(&code, &mut locals(&[(0, Value::Int(7)), (1, Value::Int(5))]))
        .unwrap();

    assert_eq!(result, Some(Value::Int(8)));
}

#[test]
fn test_wrapping_overflow() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let code = compile(
        &CodegenOptions::default(),
        &[
            Stmt::CompoundAssign {
                slot: 0,
                op: BinaryOp::Add,
                value: ast.int(1),
            },
            Stmt::CompoundAssign {
                slot: 2,
                op: BinaryOp::Mul,
                value: ast.long(2),
            },
        ],
    );
    let mut slots = locals(&[(0, Value::Int(i32::MAX)), (2, Value::Long(i64::MIN))]);

    assert_eq!(Machine::new().run(&code, &mut slots).unwrap(), None);
    assert_eq!(slots[&0], Value::Int(i32::MIN));
    assert_eq!(slots[&2], Value::Long(0));
}

#[test]
fn test_division_by_zero() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.binary(BinaryOp::Rem, ast.long(10), ast.operand(0, ValueType::Long));
    let code = compile(&CodegenOptions::default(), &[Stmt::Return(Some(expr))]);

    let err = Machine::new()
        .run(&code, &mut locals(&[(0, Value::Long(0))]))
        .unwrap_err();

    assert_eq!(err, ExecError::DivisionByZero);
}

#[test]
fn test_concat_converts_operands() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let expr = ast.concat(&[
        ast.str("x="),
        ast.operand(0, ValueType::Int),
        ast.str(", y="),
        ast.long(-3),
    ]);

    for concat in [
        ConcatLowering::Dynamic { bootstrap: 0 },
        ConcatLowering::Call { target: 5 },
    ] {
        let options = CodegenOptions {
            max_arguments_per_dynamic_call: 3,
            concat,
            ..CodegenOptions::default()
        };
        let code = compile(&options, &[Stmt::Return(Some(expr))]);
        let machine = Machine::new().with_target(5, Machine::concat);

        let result = machine
            .run(&code, &mut locals(&[(0, Value::Int(4))]))
            .unwrap();

        assert_eq!(result, Some(Value::Str("x=4, y=-3".to_string())));
    }
}

#[test]
fn test_native_call() {
    fn sum(args: &[Value]) -> Result<Value, ExecError> {
        let mut total = 0i64;
        for arg in args {
            match arg {
                Value::Int(n) => total += i64::from(*n),
                Value::Long(n) => total += n,
                Value::Str(_) => {
                    return Err(ExecError::TypeMismatch {
                        expected: ValueType::Long,
                        found: ValueType::Str,
                    });
                }
            }
        }
        Ok(Value::Long(total))
    }

    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let call = ast.call(
        1,
        ValueType::Long,
        &[ast.int(2), ast.long(40), ast.operand(0, ValueType::Int)],
    );
    let code = compile(&CodegenOptions::default(), &[Stmt::Return(Some(call))]);

    let result = Machine::new()
        .with_target(1, sum)
        .run(&code, &mut locals(&[(0, Value::Int(100))]))
        .unwrap();
    assert_eq!(result, Some(Value::Long(142)));

    let err = Machine::new()
        .run(&code, &mut locals(&[(0, Value::Int(100))]))
        .unwrap_err();
    assert_eq!(err, ExecError::UnknownTarget(1));
}

#[test]
fn test_unbound_slot() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let code = compile(
        &CodegenOptions::default(),
        &[Stmt::Eval(ast.operand(9, ValueType::Str))],
    );

    assert_eq!(
        Machine::new().run(&code, &mut Locals::new()).unwrap_err(),
        ExecError::UnboundSlot(9)
    );
}

#[test]
fn test_step_limit() {
    let code = compile(
        &CodegenOptions::default(),
        &[Stmt::Label(Label(0)), Stmt::Goto(Label(0))],
    );

    let err = Machine::new()
        .with_max_steps(1000)
        .run(&code, &mut Locals::new())
        .unwrap_err();

    assert_eq!(err, ExecError::StepLimit(1000));
}

#[test]
fn test_slot_type_is_checked() {
    let mut stream = InstructionStream::new();
    stream.append(Instruction::load(0, ValueType::Int)).unwrap();
    stream.append(Instruction::ret(Some(ValueType::Int))).unwrap();
    let code = stream.freeze().unwrap();

    let err = Machine::new()
        .run(&code, &mut locals(&[(0, Value::Long(1))]))
        .unwrap_err();
    assert_eq!(
        err,
        ExecError::TypeMismatch {
            expected: ValueType::Int,
            found: ValueType::Long
        }
    );
}
