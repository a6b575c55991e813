use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template: {0}")]
    Template(#[from] handlebars::TemplateError),
    #[error("render: {0}")]
    Render(#[from] handlebars::RenderError),
}

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../templates/partials/header.hbs")),
    ("footer", include_str!("../templates/partials/footer.hbs")),
    ("post_card", include_str!("../templates/partials/post_card.hbs")),
];

const PAGES: &[(&str, &str)] = &[
    ("home", include_str!("../templates/home.hbs")),
    ("add", include_str!("../templates/add.hbs")),
    ("blog", include_str!("../templates/blog.hbs")),
    ("search", include_str!("../templates/search.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

/// Turns a page name plus a context mapping into HTML.
/// Values are HTML-escaped by the engine.
pub struct Renderer {
    hb: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut hb = Handlebars::new();
        for (name, src) in PARTIALS {
            hb.register_partial(name, *src)?;
        }
        for (name, src) in PAGES {
            hb.register_template_string(name, *src)?;
        }
        Ok(Self { hb })
    }

    pub fn render<T: Serialize>(&self, page: &str, ctx: &T) -> Result<String, RenderError> {
        Ok(self.hb.render(page, ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_page_renders_with_empty_context() {
        let r = Renderer::new().unwrap();
        for (name, _) in PAGES {
            r.render(name, &json!({})).unwrap();
        }
    }

    #[test]
    fn values_are_escaped() {
        let r = Renderer::new().unwrap();
        let html = r
            .render("blog", &json!({ "post": { "id": 1, "title": "<script>x</script>", "content": "c", "name": "" } }))
            .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>x"));
    }
}
