//! Builder-pattern printer for rendering diagnostics.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use super::message::Severity;
use super::{Diagnostics, Span};
use crate::source_map::SourceMap;

/// Renders diagnostics against the sources they point into.
pub struct DiagnosticsPrinter<'a> {
    diagnostics: &'a Diagnostics,
    sources: Option<&'a SourceMap>,
    colored: bool,
    filtered: bool,
}

impl<'a> DiagnosticsPrinter<'a> {
    pub fn new(diagnostics: &'a Diagnostics) -> Self {
        Self {
            diagnostics,
            sources: None,
            colored: false,
            filtered: false,
        }
    }

    pub fn sources(mut self, sources: &'a SourceMap) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    /// Suppress cascading diagnostics that share a span.
    pub fn filtered(mut self, value: bool) -> Self {
        self.filtered = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let messages = if self.filtered {
            self.diagnostics.filtered()
        } else {
            self.diagnostics.raw().to_vec()
        };

        let Some(sources) = self.sources else {
            for (i, diag) in messages.iter().enumerate() {
                if i > 0 {
                    w.write_char('\n')?;
                }
                write!(w, "{}", diag)?;
            }
            return Ok(());
        };

        if messages.is_empty() {
            return Ok(());
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in messages.iter().enumerate() {
            let source = sources.get(diag.span.source);
            let range = adjust_range(diag.span, source.content.len());

            let mut snippet = Snippet::source(source.content).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(range)
                    .label(&diag.message),
            );
            snippet = snippet.path(source.kind.display_name());

            // Related spans in other sources get their own snippet below.
            let mut foreign: Vec<Group> = Vec::new();
            for related in &diag.related {
                if related.span.source == diag.span.source {
                    snippet = snippet.annotation(
                        AnnotationKind::Context
                            .span(adjust_range(related.span, source.content.len()))
                            .label(&related.message),
                    );
                } else {
                    let other = sources.get(related.span.source);
                    foreign.push(
                        Level::NOTE.secondary_title(&related.message).element(
                            Snippet::source(other.content)
                                .line_start(1)
                                .path(other.kind.display_name())
                                .annotation(
                                    AnnotationKind::Context
                                        .span(adjust_range(related.span, other.content.len())),
                                ),
                        ),
                    );
                }
            }

            let level = severity_to_level(diag.severity());
            let mut report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];
            report.extend(foreign);

            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

fn adjust_range(span: Span, limit: usize) -> std::ops::Range<usize> {
    if span.start == span.end {
        return span.start..(span.start + 1).min(limit);
    }
    span.start..span.end.min(limit)
}

impl Diagnostics {
    pub fn printer(&self) -> DiagnosticsPrinter<'_> {
        DiagnosticsPrinter::new(self)
    }

    pub fn render(&self, sources: &SourceMap) -> String {
        self.printer().sources(sources).render()
    }
}
