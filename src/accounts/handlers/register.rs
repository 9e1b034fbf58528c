use crate::accounts::{
    forms::{CleanRegistration, RegistrationForm, RegistrationInput, Submission},
    handlers::ServerError,
    store::UserStore,
    templates::{Templates, REGISTER_TEMPLATE},
};
use axum::{
    body::Bytes,
    extract::Extension,
    http::{
        header::{CONTENT_TYPE, LOCATION},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Where a successful registration lands.
pub const SUCCESS_URL: &str = "/login";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Bind the POST body. Anything that is not an urlencoded form binds as an
/// empty submission, so it is answered with the required-field errors.
fn bind_input(headers: &HeaderMap, body: &Bytes) -> RegistrationInput {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let is_form = content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));

    if is_form {
        RegistrationInput::from_urlencoded(body)
    } else {
        debug!(content_type, "not an urlencoded form, binding empty input");
        RegistrationInput::default()
    }
}

/// Registration view: one instance per request, built from the shared
/// extensions.
#[derive(Debug)]
pub struct RegistrationView {
    store: Arc<dyn UserStore>,
    templates: Arc<Templates>,
}

impl RegistrationView {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, templates: Arc<Templates>) -> Self {
        Self { store, templates }
    }

    /// Render the page for `form`, bound or not, with status 200.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    pub fn render(&self, form: &RegistrationForm) -> Result<Response, ServerError> {
        let html = self.templates.render(REGISTER_TEMPLATE, "form", form)?;
        Ok(Html(html).into_response())
    }

    /// Save the user and redirect to [`SUCCESS_URL`].
    ///
    /// # Errors
    /// Store failures propagate; the caller answers them with a 500.
    #[instrument(skip(self, registration), fields(username = %registration.username()))]
    pub async fn handle_valid(
        &self,
        registration: CleanRegistration,
    ) -> Result<Response, ServerError> {
        let user = registration.save(self.store.as_ref()).await?;

        info!(user_id = %user.id, "user registered");

        Ok((StatusCode::FOUND, [(LOCATION, SUCCESS_URL)]).into_response())
    }

    /// Re-render the page with the submitted username and the errors.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    #[instrument(skip(self, form), fields(username = %form.username()))]
    pub fn handle_invalid(&self, form: &RegistrationForm) -> Result<Response, ServerError> {
        self.render(form)
    }
}

#[utoipa::path(
    get,
    path= "/register",
    responses (
        (status = 200, description = "Empty registration form", content_type = "text/html", body = String),
    ),
    tag= "register"
)]
// axum handler for the registration page
#[instrument(skip(store, templates))]
pub async fn register_page(
    store: Extension<Arc<dyn UserStore>>,
    templates: Extension<Arc<Templates>>,
) -> Result<Response, ServerError> {
    let view = RegistrationView::new(store.0, templates.0);

    view.render(&RegistrationForm::unbound())
}

#[utoipa::path(
    post,
    path= "/register",
    request_body(content = RegistrationInput, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 302, description = "Registration successful, redirect to the login page", headers(("Location" = String))),
        (status = 200, description = "Form re-rendered with validation errors", content_type = "text/html", body = String),
        (status = 500, description = "User could not be stored"),
    ),
    tag= "register"
)]
// axum handler for form submissions
#[instrument(skip(store, templates, headers, body))]
pub async fn register(
    store: Extension<Arc<dyn UserStore>>,
    templates: Extension<Arc<Templates>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServerError> {
    let view = RegistrationView::new(store.0, templates.0);
    let input = bind_input(&headers, &body);

    match RegistrationForm::validate(input, view.store.as_ref()).await? {
        Submission::Valid(registration) => view.handle_valid(registration).await,
        Submission::Invalid(form) => view.handle_invalid(&form),
    }
}
