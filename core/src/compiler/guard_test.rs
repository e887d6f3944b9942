//! Tests for the method size guard.

use core::sync::atomic::AtomicBool;

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use crate::{
    api::{CodegenOptions, ConfigError, Limits},
    ast::{AstBuilder, BinaryOp, Label, MethodDecl, MethodSignature, Stmt, ValueType},
    compiler::{MethodResult, MethodSizeGuard},
    diagnostics::LimitKind,
    errors::{GenerationError, InternalError},
    stream::{Constant, FrozenStream},
};

fn with_limits(limits: Limits) -> CodegenOptions {
    CodegenOptions {
        limits,
        ..CodegenOptions::default()
    }
}

fn code_limit(max_code_length: u64) -> CodegenOptions {
    with_limits(Limits {
        max_code_length,
        ..Limits::default()
    })
}

fn listing(code: &FrozenStream) -> Vec<String> {
    code.instructions().iter().map(|i| i.to_string()).collect()
}

fn generate(options: &CodegenOptions, method: &MethodDecl<'_>) -> MethodResult {
    MethodSizeGuard::new(options)
        .unwrap()
        .generate(method)
        .unwrap()
}

/// A method whose body is `count` copies of `a + b;`, 4 bytes each.
fn sum_statements<'a>(ast: AstBuilder<'a>, count: usize) -> MethodDecl<'a> {
    let sum = ast.binary(
        BinaryOp::Add,
        ast.operand(0, ValueType::Int),
        ast.operand(1, ValueType::Int),
    );
    let body: Vec<Stmt<'a>> = (0..count).map(|_| Stmt::Eval(sum)).collect();
    MethodDecl {
        signature: MethodSignature::method("X", "sums", &["int", "int"]),
        body: ast.body(&body),
    }
}

#[test]
fn test_small_method_freezes() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let method = MethodDecl {
        signature: MethodSignature::method("X", "f", &["int"]),
        body: ast.body(&[
            Stmt::Store {
                slot: 1,
                value: ast.binary(BinaryOp::Mul, ast.operand(0, ValueType::Int), ast.int(3)),
            },
            Stmt::Return(Some(ast.operand(1, ValueType::Int))),
        ]),
    };

    let code = generate(&CodegenOptions::default(), &method).unwrap();

    assert_eq!(
        listing(&code),
        vec!["iload 0", "iconst 3", "imul", "istore 1", "iload 1", "ireturn"]
    );
    assert_eq!(code.byte_length(), 6);
    assert_eq!(code.max_stack(), 2);
}

#[test]
fn test_implicit_return() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let method = MethodDecl {
        signature: MethodSignature::method("X", "noop", &[]),
        body: ast.body(&[Stmt::Empty]),
    };

    let code = generate(&CodegenOptions::default(), &method).unwrap();

    assert_eq!(listing(&code), vec!["return"]);
}

#[test]
fn test_compound_assign() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let method = MethodDecl {
        signature: MethodSignature::method("X", "foo", &[]),
        body: ast.body(&[Stmt::CompoundAssign {
            slot: 0,
            op: BinaryOp::Mul,
            value: ast.binary(
                BinaryOp::Add,
                ast.operand(1, ValueType::Int),
                ast.operand(2, ValueType::Int),
            ),
        }]),
    };

    let code = generate(&CodegenOptions::default(), &method).unwrap();

    assert_eq!(
        listing(&code),
        vec!["iload 0", "iload 1", "iload 2", "iadd", "imul", "istore 0", "return"]
    );
    assert_eq!(code.byte_length(), 7);
}

#[test]
fn test_limit_is_inclusive() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    // Two statements plus the implicit return: 9 bytes.
    let method = sum_statements(ast, 2);

    assert!(generate(&code_limit(9), &method).is_ok());

    let diagnostic = generate(&code_limit(8), &method).unwrap_err();
    assert_eq!(diagnostic.limit, LimitKind::CodeLength);
    assert_eq!(diagnostic.observed, 9);
    assert_eq!(diagnostic.limit_value, 8);
}

#[test]
fn test_first_crossing_stops_generation() {
    crate::test_utils::init_test_logging();
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let method = sum_statements(ast, 100);

    let diagnostic = generate(&code_limit(10), &method).unwrap_err();

    // Crossed after the third statement; the rest is never emitted.
    assert_eq!(diagnostic.observed, 12);
    assert_eq!(
        diagnostic.to_string(),
        "The code of method sums(int, int) is exceeding the 10 bytes limit"
    );
}

#[test]
fn test_rejection_is_monotonic() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let options = code_limit(50);

    let mut rejected = false;
    for count in 0..30 {
        let outcome = generate(&options, &sum_statements(ast, count));
        if rejected {
            assert!(outcome.is_err(), "{} statements accepted after rejection", count);
        }
        rejected = outcome.is_err();
    }
    assert!(rejected);
}

#[test]
fn test_operand_stack_limit() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let wide = ast.call(
        0,
        ValueType::Int,
        &[ast.long(0), ast.long(1), ast.int(0)],
    );
    let method = MethodDecl {
        signature: MethodSignature::method("X", "test", &["long"]),
        body: ast.body(&[Stmt::Eval(wide)]),
    };
    let options = with_limits(Limits {
        max_operand_stack: 4,
        ..Limits::default()
    });

    let diagnostic = generate(&options, &method).unwrap_err();

    assert_eq!(diagnostic.limit, LimitKind::OperandStack);
    assert_eq!(diagnostic.observed, 5);
    assert_eq!(
        diagnostic.to_string(),
        "The operand stack is exceeding the 4 bytes limit"
    );
}

#[test]
fn test_constant_pool_limit() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let body: Vec<Stmt> = ["a", "b", "a", "c"]
        .iter()
        .map(|s| Stmt::Eval(ast.str(s)))
        .collect();
    let method = MethodDecl {
        signature: MethodSignature::static_initializer("Big"),
        body: ast.body(&body),
    };
    let options = with_limits(Limits {
        max_constant_pool_entries: 2,
        ..Limits::default()
    });

    let diagnostic = generate(&options, &method).unwrap_err();

    assert_eq!(diagnostic.limit, LimitKind::ConstantPoolBudget);
    assert_eq!(diagnostic.observed, 3);
    assert_eq!(
        diagnostic.to_string(),
        "Too many constants, the constant pool for Big would exceed 2 entries"
    );
}

#[test]
fn test_code_length_checked_before_operand_stack() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let method = sum_statements(ast, 1);
    let options = with_limits(Limits {
        max_code_length: 1,
        max_operand_stack: 1,
        max_constant_pool_entries: 65535,
    });

    let diagnostic = generate(&options, &method).unwrap_err();

    assert_eq!(diagnostic.limit, LimitKind::CodeLength);
}

#[test]
fn test_labels_and_goto() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let method = MethodDecl {
        signature: MethodSignature::method("X", "spin", &[]),
        body: ast.body(&[
            Stmt::Label(Label(0)),
            Stmt::CompoundAssign {
                slot: 0,
                op: BinaryOp::Add,
                value: ast.int(1),
            },
            Stmt::Goto(Label(0)),
        ]),
    };

    let code = generate(&CodegenOptions::default(), &method).unwrap();

    assert_eq!(code.label_target(Label(0)), Some(0));
    assert_eq!(
        listing(&code),
        vec!["iload 0", "iconst 1", "iadd", "istore 0", "goto L0", "return"]
    );
}

#[test]
fn test_unbound_label_is_internal_error() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let method = MethodDecl {
        signature: MethodSignature::method("X", "jump", &[]),
        body: ast.body(&[Stmt::Goto(Label(3))]),
    };

    let err = MethodSizeGuard::new(&CodegenOptions::default())
        .unwrap()
        .generate(&method)
        .unwrap_err();

    assert_eq!(err, GenerationError::Internal(InternalError::UnboundLabel(Label(3))));
}

#[test]
fn test_unbalanced_statement_is_internal_error() {
    let options = CodegenOptions::default();
    let guard = MethodSizeGuard::new(&options).unwrap();
    let signature = MethodSignature::method("X", "leaky", &[]);

    let err = guard
        .guard(&signature, |body| {
            body.stream_mut().push_constant(Constant::Int(1))?;
            body.statement(&Stmt::Empty)
        })
        .unwrap_err();

    assert_eq!(
        err,
        GenerationError::Internal(InternalError::UnbalancedStatement { depth: 1 })
    );
}

#[test]
fn test_final_checkpoint_sees_raw_appends() {
    let options = code_limit(2);
    let guard = MethodSizeGuard::new(&options).unwrap();
    let signature = MethodSignature::constructor("X", &["int"]);

    let diagnostic = guard
        .guard(&signature, |body| {
            body.stream_mut().push_constant(Constant::Int(1000))?;
            Ok(())
        })
        .unwrap()
        .unwrap_err();

    assert_eq!(
        diagnostic.to_string(),
        "The code of constructor X(int) is exceeding the 2 bytes limit"
    );
}

#[test]
fn test_cancellation() {
    let arena = Bump::new();
    let ast = AstBuilder::new(&arena);
    let options = CodegenOptions::default();
    let cancelled = AtomicBool::new(true);

    let err = MethodSizeGuard::new(&options)
        .unwrap()
        .with_cancellation(&cancelled)
        .generate(&sum_statements(ast, 3))
        .unwrap_err();

    assert_eq!(err, GenerationError::Cancelled);
}

#[test]
fn test_invalid_options_rejected() {
    let options = CodegenOptions {
        max_arguments_per_dynamic_call: 0,
        ..CodegenOptions::default()
    };

    assert_eq!(
        MethodSizeGuard::new(&options).err(),
        Some(ConfigError::CeilingTooSmall(0))
    );
}
