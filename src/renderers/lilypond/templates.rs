//! LilyPond template rendering system
//!
//! Mustache-based templates for the document shell around the rendered
//! staves. The minimal template is bare output for further processing;
//! the standard template adds a header block and layout stanza.

use serde::Serialize;

use super::RenderError;

/// Template selection for LilyPond output
#[derive(Debug, Clone, Copy)]
pub enum LilyPondTemplate {
    /// Bare bones: version line and score block only.
    Minimal,
    /// Header with title/composer and a layout stanza.
    Standard,
}

/// Context data for template rendering
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// LilyPond version (e.g., "2.24.0")
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,

    /// Comment emitted near the top of the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_comment: Option<String>,

    /// Rendered staves content.
    pub staves: String,
}

impl TemplateContext {
    pub fn new(version: String, staves: String) -> Self {
        Self {
            version,
            title: None,
            composer: None,
            source_comment: None,
            staves,
        }
    }

    pub fn builder(version: String, staves: String) -> TemplateContextBuilder {
        TemplateContextBuilder {
            context: TemplateContext::new(version, staves),
        }
    }
}

/// Builder for TemplateContext
pub struct TemplateContextBuilder {
    context: TemplateContext,
}

impl TemplateContextBuilder {
    pub fn title(mut self, title: Option<String>) -> Self {
        self.context.title = title;
        self
    }

    pub fn composer(mut self, composer: Option<String>) -> Self {
        self.context.composer = composer;
        self
    }

    pub fn source_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.context.source_comment = Some(comment.into());
        self
    }

    pub fn build(self) -> TemplateContext {
        self.context
    }
}

/// Get template content by type
fn get_template_content(template_type: LilyPondTemplate) -> &'static str {
    match template_type {
        LilyPondTemplate::Minimal => include_str!("templates/minimal.ly.mustache"),
        LilyPondTemplate::Standard => include_str!("templates/standard.ly.mustache"),
    }
}

/// Render a LilyPond document using a template
pub fn render_lilypond(
    template_type: LilyPondTemplate,
    context: &TemplateContext,
) -> Result<String, RenderError> {
    let template_content = get_template_content(template_type);
    let template = mustache::compile_str(template_content)?;
    Ok(template.render_to_string(context)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_minimal_template() {
        let context = TemplateContext::new("2.24.0".to_string(), "c'4 d'4 e'4 f'4".to_string());
        let rendered = render_lilypond(LilyPondTemplate::Minimal, &context).unwrap();
        assert!(rendered.contains("\\version"));
        assert!(rendered.contains("c'4 d'4 e'4 f'4"));
        assert!(!rendered.contains("\\header"));
    }

    #[test]
    fn test_render_standard_template() {
        let context = TemplateContext::builder("2.24.0".to_string(), "c'4".to_string())
            .title(Some("Archipelago".to_string()))
            .build();
        let rendered = render_lilypond(LilyPondTemplate::Standard, &context).unwrap();
        assert!(rendered.contains("Archipelago"));
        assert!(rendered.contains("\\layout"));
    }
}
