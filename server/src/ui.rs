//! # Pages and static assets
//!
//! Pages are rendered on the server. The same data is also embedded as JSON in
//! `window.__PAGE__` for the scripts under `/static/code/`, which add the interactive parts:
//! the login/register toggle, extra card rows and the flip-card practice view.

use std::{fmt::Write as _, path::Path};

use axum::{
    Router,
    extract::{self, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::error;

use crate::{
    api::{
        extractors::CurrentSession,
        modules::{ModuleDetail, ModuleSummary},
    },
    app::AppState,
    auth::{self, Session, csrf::CSRF_FIELD},
    models::{RowId, User},
};

const STYLESHEET: &str = "/static/css/app.css";
const SHARED_SCRIPT: &str = "/static/code/app.js";

/// Number of empty card rows the create form starts with.
const INITIAL_CARD_ROWS: usize = 2;

/// Returns the page routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/auth", get(auth_page))
        .route("/create", get(create_page))
        .route("/flashcard_module/{id}", get(module_page))
}

#[must_use]
pub fn new_static_server(static_dir: &Path) -> ServeDir {
    ServeDir::new(static_dir)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Viewer {
    user_id: RowId,
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageContext<'a, T: Serialize> {
    page: &'a str,
    instance_name: &'a str,
    csrf_token: String,
    user: Option<Viewer>,
    data: T,
}

#[derive(Serialize)]
struct IndexData {
    modules: Vec<ModuleSummary>,
}

#[derive(Serialize)]
struct ModuleData {
    module: Option<ModuleDetail>,
}

/// What differs between pages: the `<main>` markup and which script enhances it.
struct Page<'a> {
    name: &'a str,
    title: Option<&'a str>,
    script: Option<&'a str>,
    main: String,
}

async fn index(
    CurrentSession(session): CurrentSession,
    State(state): State<AppState>,
) -> Html<String> {
    let user = auth::current_user(state.db.as_ref(), &session).await;
    let modules: Vec<ModuleSummary> = match state.db.list_modules().await {
        Ok(modules) => modules.iter().map(ModuleSummary::from).collect(),
        Err(err) => {
            error!("failed to list modules: {err}");
            Vec::new()
        }
    };
    let page = Page {
        name: "index",
        title: None,
        script: None,
        main: index_main(&modules),
    };
    render(&state, &session, user, page, IndexData { modules })
}

fn index_main(modules: &[ModuleSummary]) -> String {
    let mut html = String::from("<h1>Modules</h1>\n");
    if modules.is_empty() {
        html.push_str("<p class=\"empty\">No modules yet.</p>\n");
        return html;
    }
    html.push_str("<ul class=\"module-list\">\n");
    for module in modules {
        let _ = write!(
            html,
            "<li><a href=\"/flashcard_module/{}\">{}</a>",
            module.id,
            escape_html(&module.name)
        );
        if !module.description.is_empty() {
            let _ = write!(html, "<p>{}</p>", escape_html(&module.description));
        }
        let _ = writeln!(
            html,
            "<span class=\"meta\">{}, by {}</span></li>",
            card_count(module.count_questions),
            escape_html(module.owner_name.as_deref().unwrap_or("unknown"))
        );
    }
    html.push_str("</ul>\n");
    html
}

fn card_count(count: i64) -> String {
    if count == 1 {
        "1 card".to_string()
    } else {
        format!("{count} cards")
    }
}

async fn auth_page(
    CurrentSession(session): CurrentSession,
    State(state): State<AppState>,
) -> Html<String> {
    let user = auth::current_user(state.db.as_ref(), &session).await;
    let page = Page {
        name: "auth",
        title: Some("Log in"),
        script: Some("/static/code/auth.js"),
        main: AUTH_MAIN.to_string(),
    };
    render(&state, &session, user, page, ())
}

const AUTH_MAIN: &str = r#"<h1 id="auth-heading">Log in</h1>
<noscript><p class="error">Logging in needs JavaScript.</p></noscript>
<form id="auth-form">
<label>Username <input type="text" name="username" autocomplete="username" required></label>
<label>Password <input type="password" name="password" autocomplete="current-password" required></label>
<label id="password2-row" hidden>Repeat password <input type="password" name="password2" autocomplete="new-password"></label>
<p id="auth-error" class="error" hidden></p>
<div class="form-actions">
<button type="submit" id="auth-submit">Log in</button>
<button type="button" id="auth-toggle" class="link-button">Create a new account</button>
</div>
</form>
"#;

async fn create_page(
    CurrentSession(session): CurrentSession,
    State(state): State<AppState>,
) -> Response {
    let Some(user) = auth::current_user(state.db.as_ref(), &session).await else {
        return Redirect::to("/auth").into_response();
    };
    let page = Page {
        name: "create",
        title: Some("New module"),
        script: Some("/static/code/create.js"),
        main: create_main(&session.csrf_token()),
    };
    render(&state, &session, Some(user), page, ()).into_response()
}

/// A plain form post to `/api/modules`; the CSRF token rides along as a hidden field.
fn create_main(csrf_token: &str) -> String {
    let mut html = String::from("<h1>New module</h1>\n");
    html.push_str("<form id=\"create-form\" method=\"post\" action=\"/api/modules\">\n");
    let _ = writeln!(
        html,
        "<input type=\"hidden\" name=\"{CSRF_FIELD}\" value=\"{}\">",
        escape_html(csrf_token)
    );
    html.push_str("<label>Name <input type=\"text\" name=\"name\" required></label>\n");
    html.push_str(
        "<label>Description <textarea name=\"description\" rows=\"3\"></textarea></label>\n",
    );
    html.push_str("<div class=\"cards\">\n");
    for index in 1..=INITIAL_CARD_ROWS {
        let _ = writeln!(
            html,
            "<div class=\"card-row\">\
             <input type=\"text\" name=\"term_{index}\" placeholder=\"Term\">\
             <input type=\"text\" name=\"definition_{index}\" placeholder=\"Definition\">\
             </div>"
        );
    }
    html.push_str("</div>\n");
    html.push_str("<p id=\"create-error\" class=\"error\" hidden></p>\n");
    html.push_str("<div class=\"form-actions\">\n");
    html.push_str("<button type=\"button\" id=\"add-card-btn\">Add card</button>\n");
    html.push_str("<button type=\"submit\">Create module</button>\n");
    html.push_str("</div>\n</form>\n");
    html
}

/// An unknown id still renders the page, with `module: null`.
async fn module_page(
    CurrentSession(session): CurrentSession,
    State(state): State<AppState>,
    extract::Path(id): extract::Path<RowId>,
) -> Html<String> {
    let user = auth::current_user(state.db.as_ref(), &session).await;
    let module = match state.db.get_module(id).await {
        Ok(module) => module.map(ModuleDetail::from),
        Err(err) => {
            error!(module_id = id, "failed to load module: {err}");
            None
        }
    };
    let title = module.as_ref().map(|m| m.summary.name.clone());
    let page = Page {
        name: "module",
        title: title.as_deref(),
        script: Some("/static/code/module.js"),
        main: module_main(module.as_ref()),
    };
    render(&state, &session, user, page, ModuleData { module })
}

fn module_main(module: Option<&ModuleDetail>) -> String {
    let Some(module) = module else {
        return "<h1>Module not found.</h1>\n<p><a href=\"/\">Back to all modules</a></p>\n"
            .to_string();
    };
    let summary = &module.summary;

    let mut html = String::new();
    let _ = writeln!(html, "<h1>{}</h1>", escape_html(&summary.name));
    if !summary.description.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", escape_html(&summary.description));
    }
    let _ = writeln!(
        html,
        "<p class=\"meta\">{}, by {}</p>",
        card_count(summary.count_questions),
        escape_html(summary.owner_name.as_deref().unwrap_or("unknown"))
    );

    let Some(first) = module.cards.iter().next() else {
        html.push_str("<p class=\"empty\">This module has no cards.</p>\n");
        return html;
    };
    html.push_str("<section class=\"practice\">\n");
    let _ = writeln!(
        html,
        "<div id=\"card\" class=\"card\" tabindex=\"0\" role=\"button\" aria-pressed=\"false\">\
         <div id=\"term\" class=\"card-face card-front\">{}</div>\
         <div id=\"definition\" class=\"card-face card-back\">{}</div></div>",
        escape_html(&first.term),
        escape_html(&first.dfn)
    );
    html.push_str("<div class=\"controls\">\n");
    html.push_str("<button type=\"button\" id=\"prev-btn\">Previous</button>\n");
    html.push_str("<button type=\"button\" id=\"flip-btn\" class=\"primary\">Flip</button>\n");
    html.push_str("<button type=\"button\" id=\"next-btn\">Next</button>\n");
    html.push_str("</div>\n");
    let _ = writeln!(
        html,
        "<p id=\"progress-text\">1 / {}</p>\n</section>",
        module.cards.len()
    );

    html.push_str("<h2>All cards</h2>\n<ol class=\"card-list\">\n");
    for card in &module.cards {
        let _ = writeln!(
            html,
            "<li><span class=\"term\">{}</span><span class=\"dfn\">{}</span></li>",
            escape_html(&card.term),
            escape_html(&card.dfn)
        );
    }
    html.push_str("</ol>\n");
    html
}

/// Site header: the instance name, plus links and a logout button depending on the viewer.
fn header(instance_name: &str, user: Option<&Viewer>) -> String {
    let mut html = String::from("<header class=\"site-header\">\n");
    let _ = writeln!(
        html,
        "<a class=\"brand\" href=\"/\">{}</a>",
        escape_html(instance_name)
    );
    html.push_str("<nav>\n");
    match user {
        Some(user) => {
            let _ = writeln!(
                html,
                "<span class=\"viewer\">{}</span>",
                escape_html(&user.username)
            );
            html.push_str("<a href=\"/create\">New module</a>\n");
            html.push_str("<button type=\"button\" id=\"logout-btn\">Log out</button>\n");
        }
        None => html.push_str("<a href=\"/auth\">Log in</a>\n"),
    }
    html.push_str("</nav>\n</header>\n");
    html
}

fn render<T: Serialize>(
    state: &AppState,
    session: &Session,
    user: Option<User>,
    page: Page<'_>,
    data: T,
) -> Html<String> {
    let instance_name = state.config.instance_name.as_str();
    let context = PageContext {
        page: page.name,
        instance_name,
        csrf_token: session.csrf_token(),
        user: user.map(|u| Viewer {
            user_id: u.id,
            username: u.username,
        }),
        data,
    };
    let json = serde_json::to_string(&context).unwrap_or_else(|err| {
        error!(page = page.name, "failed to encode page data: {err}");
        "null".to_string()
    });

    let title = match page.title {
        Some(title) => format!("{title} | {instance_name}"),
        None => instance_name.to_string(),
    };

    let mut html = String::with_capacity(1024 + page.main.len() + json.len());
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(
        html,
        "<meta name=\"csrf-token\" content=\"{}\">",
        escape_html(&context.csrf_token)
    );
    let _ = writeln!(html, "<title>{}</title>", escape_html(&title));
    let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{STYLESHEET}\">");
    let _ = writeln!(html, "<script>window.__PAGE__ = {};</script>", escape_script(&json));
    let _ = writeln!(html, "<script defer src=\"{SHARED_SCRIPT}\"></script>");
    if let Some(script) = page.script {
        let _ = writeln!(html, "<script defer src=\"{script}\"></script>");
    }
    html.push_str("</head>\n");
    let _ = writeln!(html, "<body data-page=\"{}\">", escape_html(page.name));
    html.push_str(&header(instance_name, context.user.as_ref()));
    html.push_str("<main>\n");
    html.push_str(&page.main);
    html.push_str("</main>\n</body>\n</html>\n");
    Html(html)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Makes JSON safe to embed in an inline `<script>`.
fn escape_script(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
