//! Synthesizer - Generate template source from a field list
//!
//! Each field is emitted according to its kind and presence. Required
//! values go through `required(...)` so a missing value fails rendering;
//! optional values are wrapped in an `if` guard. Booleans and numbers are
//! guarded by `present(...)` because `false` and `0` are meaningful values.

use crate::field::{Field, FieldKind, Presence, emission_order};
use crate::path::TemplatePath;
use crate::schema::{DEPENDS_ON, ExtractionError, FieldExtractor, ResourceKind, TimeoutsConfig};
use crate::value::RESOURCE_NAME_KEY;

/// Synthesizer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizerConfig {
    /// Number of spaces per nesting level
    pub indent: usize,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

/// Generates template source for resources and data sources
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        Self { config }
    }

    /// Extract fields from `schema` and render its template
    pub fn synthesize(
        &self,
        schema: &dyn FieldExtractor,
        resource_type: &str,
        kind: ResourceKind,
    ) -> Result<String, ExtractionError> {
        let fields = schema.extract_fields()?;
        Ok(self.render(
            &fields,
            resource_type,
            kind,
            schema.timeouts(),
            schema.has_depends_on(),
        ))
    }

    /// Render template source for `fields`
    pub fn render(
        &self,
        fields: &[Field],
        resource_type: &str,
        kind: ResourceKind,
        timeouts: TimeoutsConfig,
        has_depends_on: bool,
    ) -> String {
        let mut emitter = Emitter {
            out: String::new(),
            unit: " ".repeat(self.config.indent),
        };

        emitter.line(
            0,
            &format!(
                "{} \"{}\" \"{{{{ required({}) }}}}\" {{",
                kind.keyword(),
                resource_type,
                RESOURCE_NAME_KEY
            ),
        );
        for field in emission_order(fields) {
            if field.name() == RESOURCE_NAME_KEY || (has_depends_on && field.name() == DEPENDS_ON)
            {
                continue;
            }
            emitter.field(field, 1, None);
        }
        if timeouts.any() {
            emitter.timeouts(timeouts);
        }
        if has_depends_on {
            emitter.depends_on();
        }
        emitter.line(0, "}");
        emitter.out
    }
}

struct Emitter {
    out: String,
    unit: String,
}

impl Emitter {
    fn line(&mut self, depth: usize, text: &str) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        for _ in 0..depth {
            self.out.push_str(&self.unit);
        }
        self.out.push_str(text);
    }

    /// Emit `body` unconditionally for required fields, under an `if` guard
    /// otherwise. `body` receives the expression to read the value through.
    fn guarded(
        &mut self,
        field: &Field,
        expr: &str,
        depth: usize,
        body: impl FnOnce(&mut Self, &str),
    ) {
        match field.presence() {
            Presence::RequiredAlways => body(self, &format!("required({})", expr)),
            Presence::OptionalPresent => {
                let cond = match field.kind() {
                    FieldKind::Bool | FieldKind::Number => format!("present({})", expr),
                    _ => expr.to_string(),
                };
                self.line(depth, &format!("{{{{- if {} }}}}", cond));
                body(self, expr);
                self.line(depth, "{{- end }}");
            }
            Presence::Omitted => {}
        }
    }

    fn field(&mut self, field: &Field, depth: usize, parent: Option<&TemplatePath>) {
        let path = match parent {
            Some(parent) => parent.append(field.name(), field.is_collection()),
            None => TemplatePath::new(field.name(), field.is_collection()),
        };
        let expr = path.expression();
        let name = field.name();

        match field.kind() {
            FieldKind::Object if field.is_set() => {
                self.guarded(field, &expr, depth, |e, value| {
                    // One block per element, read through the loop variable
                    let var = format!("item{}", depth);
                    e.line(depth, &format!("{{{{- for ${} in {} }}}}", var, value));
                    e.line(depth, &format!("{} {{", name));
                    let element = TemplatePath::within(&var);
                    for nested in emission_order(field.nested_fields()) {
                        e.field(nested, depth + 1, Some(&element));
                    }
                    e.line(depth, "}");
                    e.line(depth, "{{- end }}");
                });
            }
            FieldKind::Object => {
                self.guarded(field, &expr, depth, |e, _| {
                    e.line(depth, &format!("{} {{", name));
                    for nested in emission_order(field.nested_fields()) {
                        e.field(nested, depth + 1, Some(&path));
                    }
                    e.line(depth, "}");
                });
            }
            FieldKind::Collection => {
                self.guarded(field, &expr, depth, |e, value| {
                    e.line(depth, &format!("{} = [", name));
                    e.line(depth + 1, &format!("{{{{- for $item in {} }}}}", value));
                    e.line(depth + 1, "{{ render_value($item) }},");
                    e.line(depth + 1, "{{- end }}");
                    e.line(depth, "]");
                });
            }
            FieldKind::Map => {
                self.guarded(field, &expr, depth, |e, value| {
                    e.line(depth, &format!("{} = {{", name));
                    e.line(
                        depth + 1,
                        &format!("{{{{- for $key, $value in {} }}}}", value),
                    );
                    e.line(
                        depth + 1,
                        "{{ render_value($key) }} = {{ render_value($value) }}",
                    );
                    e.line(depth + 1, "{{- end }}");
                    e.line(depth, "}");
                });
            }
            FieldKind::Bool => {
                self.guarded(field, &expr, depth, |e, value| {
                    e.line(depth, &format!("{} = {{{{ {} }}}}", name, value));
                });
            }
            FieldKind::String | FieldKind::Number => {
                self.guarded(field, &expr, depth, |e, value| {
                    e.line(
                        depth,
                        &format!("{} = {{{{ render_value({}) }}}}", name, value),
                    );
                });
            }
        }
    }

    fn timeouts(&mut self, timeouts: TimeoutsConfig) {
        let root = TemplatePath::new("timeouts", false);
        self.line(1, &format!("{{{{- if {} }}}}", root.expression()));
        self.line(1, "timeouts {");
        for operation in timeouts.operations() {
            let expr = root.append(operation, false).expression();
            self.line(2, &format!("{{{{- if {} }}}}", expr));
            self.line(
                2,
                &format!("{} = {{{{ render_value({}) }}}}", operation, expr),
            );
            self.line(2, "{{- end }}");
        }
        self.line(1, "}");
        self.line(1, "{{- end }}");
    }

    fn depends_on(&mut self) {
        self.line(1, &format!("{{{{- if {} }}}}", DEPENDS_ON));
        self.line(
            1,
            &format!(
                "{} = [{{{{ for $i, $dep in {} }}}}{{{{ if $i }}}}, {{{{ end }}}}{{{{ render_value($dep) }}}}{{{{ end }}}}]",
                DEPENDS_ON, DEPENDS_ON
            ),
        );
        self.line(1, "{{- end }}");
    }
}
