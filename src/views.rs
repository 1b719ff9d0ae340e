// Ready-made views rendering `400.jinja`, `403.jinja`, `404.jinja` and
// `500.jinja` with the request, whatever its method.
use http::StatusCode;
use serde::Serialize;

use crate::backend::Engines;
use crate::context::Context;
use crate::errors::Result;
use crate::request::Request;

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

#[derive(Serialize)]
struct ViewInfo<'a> {
    template_name: &'a str,
    status: u16,
}

/// Renders one template for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericView {
    pub template_name: String,
    pub status: StatusCode,
    pub content_type: String,
}

impl GenericView {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self { template_name: template_name.into(), status: StatusCode::OK, content_type: "text/html".to_string() }
    }

    /// The view itself is available to the template as `view`.
    pub fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert(
            "view",
            &ViewInfo { template_name: &self.template_name, status: self.status.as_u16() },
        );
        context
    }

    pub fn render(&self, engines: &Engines, request: &Request) -> Result<Response> {
        let body = engines.render_to_string(&self.template_name, Some(self.context()), Some(request))?;
        Ok(Response { status: self.status, content_type: self.content_type.clone(), body })
    }
}

/// Error pages, answering every HTTP method the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorView {
    BadRequest,
    PermissionDenied,
    PageNotFound,
    ServerError,
}

impl ErrorView {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorView::BadRequest => StatusCode::BAD_REQUEST,
            ErrorView::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorView::PageNotFound => StatusCode::NOT_FOUND,
            ErrorView::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `400.jinja` and so on.
    pub fn template_name(self) -> String {
        format!("{}.jinja", self.status().as_u16())
    }

    pub fn view(self) -> GenericView {
        GenericView { status: self.status(), ..GenericView::new(self.template_name()) }
    }

    pub fn render(self, engines: &Engines, request: &Request) -> Result<Response> {
        self.view().render(engines, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_template_names() {
        let expected = [
            (ErrorView::BadRequest, 400, "400.jinja"),
            (ErrorView::PermissionDenied, 403, "403.jinja"),
            (ErrorView::PageNotFound, 404, "404.jinja"),
            (ErrorView::ServerError, 500, "500.jinja"),
        ];
        for (view, status, template) in expected {
            assert_eq!(view.status().as_u16(), status);
            assert_eq!(view.template_name(), template);
        }
    }

    #[test]
    fn view_is_in_the_context() {
        let context = ErrorView::PageNotFound.view().context();
        let view = context.get("view").unwrap();
        assert_eq!(view.get_attr("template_name").unwrap().as_str(), Some("404.jinja"));
    }
}
