//! Size diagnostic rendering using ariadne
//!
//! Diagnostics that carry the span of their method declaration are drawn
//! against the source text; the rest are printed as a single line.

use crate::{Severity, SizeDiagnostic};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render diagnostics with formatting to stderr
///
/// # Example
/// ```no_run
/// use sizeguard::{CodegenOptions, compile_types, render_diagnostics};
///
/// let source = "class X { ... }";
/// let (_, diagnostics) = compile_types(&CodegenOptions::default(), &[], 1).unwrap();
/// render_diagnostics(source, "X.java", &diagnostics);
/// ```
pub fn render_diagnostics(source: &str, file_name: &str, diagnostics: &[SizeDiagnostic]) {
    write_diagnostics(source, file_name, diagnostics, &mut std::io::stderr(), true).ok();
}

/// Render diagnostics to a specific writer
pub fn render_diagnostics_to(
    source: &str,
    file_name: &str,
    diagnostics: &[SizeDiagnostic],
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    write_diagnostics(source, file_name, diagnostics, writer, true)
}

/// Render diagnostics to a String (useful for logs, IDE hovers, etc.)
pub fn render_diagnostics_to_string(
    source: &str,
    file_name: &str,
    diagnostics: &[SizeDiagnostic],
) -> String {
    let mut buf = Vec::new();
    write_diagnostics(source, file_name, diagnostics, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render diagnostics to a String without color codes (useful for tests)
pub fn render_diagnostics_to_string_no_color(
    source: &str,
    file_name: &str,
    diagnostics: &[SizeDiagnostic],
) -> String {
    let mut buf = Vec::new();
    write_diagnostics(source, file_name, diagnostics, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn write_diagnostics(
    source: &str,
    file_name: &str,
    diagnostics: &[SizeDiagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for size_diag in diagnostics {
        let diag = size_diag.to_diagnostic();

        if size_diag.signature.span.is_none() {
            let code = diag.code.as_deref().unwrap_or("");
            writeln!(writer, "[{}] {}: {}", code, diag.severity, diag.message)?;
            continue;
        }

        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
        };

        let mut report = Report::build(kind, (file_name, diag.span.0.clone()))
            .with_message(&diag.message)
            .with_config(ariadne::Config::default().with_color(use_color));

        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        // The related entry names the method, so it labels the declaration.
        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new((file_name, related.span.0.clone()))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }
        if diag.related.is_empty() {
            let color = colors.next();
            report = report.with_label(
                Label::new((file_name, diag.span.0.clone()))
                    .with_message(&diag.message)
                    .with_color(color),
            );
        }

        for help_msg in &diag.help {
            report = report.with_help(help_msg);
        }

        // Reborrow the writer so it is not moved into the first report.
        report
            .finish()
            .write((file_name, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}
