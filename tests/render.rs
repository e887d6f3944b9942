use indoc::indoc;
use sizeguard::{
    LimitKind, SizeDiagnostic, Span, ast::MethodSignature, render_diagnostics_to,
    render_diagnostics_to_string_no_color,
};

const SOURCE: &str = indoc! {"
    class X {
        int foo(int a) { return a + a + a; }
        static { }
    }
"};

fn code_length(signature: MethodSignature) -> SizeDiagnostic {
    SizeDiagnostic {
        signature,
        limit: LimitKind::CodeLength,
        observed: 65536,
        limit_value: 65535,
    }
}

#[test]
fn test_spanned_diagnostic_points_at_declaration() {
    let start = SOURCE.find("int foo").unwrap();
    let signature =
        MethodSignature::method("X", "foo", &["int"]).with_span(Span::new(start, start + 14));

    let output =
        render_diagnostics_to_string_no_color(SOURCE, "X.java", &[code_length(signature)]);

    assert!(output.contains("[S0001] Error:"), "{}", output);
    assert!(
        output.contains("The code of method foo(int) is exceeding the 65535 bytes limit"),
        "{}",
        output
    );
    assert!(output.contains("in foo(int)"), "{}", output);
    assert!(output.contains("X.java"), "{}", output);
    assert!(output.contains("split it into smaller methods"), "{}", output);
}

#[test]
fn test_unspanned_diagnostic_is_one_line() {
    let output = render_diagnostics_to_string_no_color(
        SOURCE,
        "X.java",
        &[code_length(MethodSignature::static_initializer("X"))],
    );

    assert_eq!(
        output,
        "[S0001] error: The code for the static initializer is exceeding the 65535 bytes limit\n"
    );
}

#[test]
fn test_diagnostics_render_in_order() {
    let start = SOURCE.find("static").unwrap();
    let diagnostics = [
        code_length(MethodSignature::method("X", "foo", &["int"])),
        SizeDiagnostic {
            signature: MethodSignature::static_initializer("X").with_span(Span::new(start, start + 6)),
            limit: LimitKind::ConstantPoolBudget,
            observed: 70000,
            limit_value: 65535,
        },
    ];

    let mut buf = Vec::new();
    render_diagnostics_to(SOURCE, "X.java", &diagnostics, &mut buf).unwrap();
    let output = String::from_utf8_lossy(&buf);

    let first = output.find("[S0001]").unwrap();
    let second = output.find("[S0003]").unwrap();
    assert!(first < second, "{}", output);
    assert!(output.contains("the constant pool for X would exceed 65535 entries"));
}
