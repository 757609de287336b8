use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::{Extensions, HeaderMap, header::CONTENT_TYPE, request::Parts},
};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use tracing::debug;

use crate::{
    api::ApiError,
    app::AppState,
    auth::{self, Session, csrf},
    models::{Card, CardList, User},
};

/// The request's [`Session`], as installed by the session middleware.
pub struct CurrentSession(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_of(&parts.extensions).map(CurrentSession)
    }
}

fn session_of(extensions: &Extensions) -> Result<Session, ApiError> {
    extensions
        .get::<Session>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("session middleware is not installed".into()))
}

/// Rejects the request with [`ApiError::NotLoggedIn`] unless the session belongs to an existing
/// user.
pub struct AuthenticatedUser {
    pub user: User,
    pub session: Session,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        match auth::current_user(state.db.as_ref(), &session).await {
            Some(user) => Ok(AuthenticatedUser { user, session }),
            None => Err(ApiError::NotLoggedIn),
        }
    }
}

/// Rejects the request with [`ApiError::MissingCsrfToken`] unless it echoes the session's CSRF
/// token in a header.
pub struct CsrfGuard(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for CsrfGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        if csrf::check(&parts.headers, &session.csrf_token()) {
            Ok(CsrfGuard(session))
        } else {
            Err(ApiError::MissingCsrfToken)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Option<Self> {
        let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let mime = content_type.split(';').next()?.trim();
        if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            Some(BodyKind::Form)
        } else if mime.eq_ignore_ascii_case("application/json")
            || mime.to_ascii_lowercase().ends_with("+json")
        {
            Some(BodyKind::Json)
        } else {
            None
        }
    }
}

/// Deserializes the body as JSON or as `application/x-www-form-urlencoded`, depending on its
/// `Content-Type`.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match BodyKind::of(req.headers()) {
            Some(BodyKind::Json) => Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| JsonOrForm(value))
                .map_err(|rejection| malformed(BodyKind::Json, &rejection.body_text())),
            Some(BodyKind::Form) => Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| JsonOrForm(value))
                .map_err(|rejection| malformed(BodyKind::Form, &rejection.body_text())),
            None => Err(unsupported_body()),
        }
    }
}

/// Client-facing rejection for a body that failed to parse. The parser's detail is only logged.
fn malformed(kind: BodyKind, detail: &str) -> ApiError {
    debug!("rejected {kind:?} body: {detail}");
    let message = match kind {
        BodyKind::Json => "invalid JSON body",
        BodyKind::Form => "invalid form body",
    };
    ApiError::MalformedPayload(message.to_string())
}

fn unsupported_body() -> ApiError {
    ApiError::MalformedPayload("expected a JSON or form-encoded body".to_string())
}

/// Deserializes a string that may also be `null` or absent, both read as empty.
fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// # New module payload
///
/// Accepted either as JSON `{name, description, cards: [{term, dfn}]}` or as a form with
/// `name`, `description` and numbered `term_N`/`definition_N` fields starting at 1.
///
/// Incomplete cards are dropped silently. An empty name, or a JSON `cards` value that is not a
/// list, is rejected.
///
/// Extraction also enforces CSRF. The token is read from the header; form bodies may carry it
/// in a [`csrf::CSRF_FIELD`] field instead, so a plain HTML form submission works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateModuleRequest {
    pub name: String,
    pub description: String,
    pub cards: CardList,
}

#[derive(Deserialize)]
struct JsonModule {
    #[serde(default, deserialize_with = "nullable_string")]
    name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    description: String,
    #[serde(default = "no_cards")]
    cards: serde_json::Value,
}

fn no_cards() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

impl CreateModuleRequest {
    fn new(name: &str, description: String, cards: CardList) -> Result<Self, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("module name is required".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            description,
            cards,
        })
    }

    fn from_json(body: JsonModule) -> Result<Self, ApiError> {
        let serde_json::Value::Array(entries) = body.cards else {
            return Err(ApiError::Validation("cards must be a list".to_string()));
        };
        let cards = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<Card>(entry).ok())
            .collect();
        Self::new(&body.name, body.description, cards)
    }

    fn from_form(mut fields: HashMap<String, String>) -> Result<Self, ApiError> {
        let mut cards = Vec::new();
        for index in 1.. {
            let term = fields.remove(&format!("term_{index}"));
            let dfn = fields.remove(&format!("definition_{index}"));
            match (term, dfn) {
                (None, None) => break,
                (Some(term), Some(dfn)) => cards.push(Card::new(term, dfn)),
                // half a pair; keep scanning
                _ => {}
            }
        }
        let name = fields.remove("name").unwrap_or_default();
        let description = fields.remove("description").unwrap_or_default();
        Self::new(&name, description, CardList::from(cards))
    }
}

impl<S: Send + Sync> FromRequest<S> for CreateModuleRequest {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let session_token = session_of(req.extensions())?.csrf_token();
        let header_ok = csrf::check(req.headers(), &session_token);

        match BodyKind::of(req.headers()) {
            Some(BodyKind::Form) => {
                let Form(mut fields) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(|rejection| malformed(BodyKind::Form, &rejection.body_text()))?;
                let field_ok = fields
                    .remove(csrf::CSRF_FIELD)
                    .is_some_and(|token| csrf::check_token(&token, &session_token));
                if !(header_ok || field_ok) {
                    return Err(ApiError::MissingCsrfToken);
                }
                Self::from_form(fields)
            }
            _ if !header_ok => Err(ApiError::MissingCsrfToken),
            Some(BodyKind::Json) => {
                let Json(body) = Json::<JsonModule>::from_request(req, state)
                    .await
                    .map_err(|rejection| malformed(BodyKind::Json, &rejection.body_text()))?;
                Self::from_json(body)
            }
            None => Err(unsupported_body()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::http::{HeaderMap, HeaderValue, header::CONTENT_TYPE};
    use serde_json::json;

    use super::{BodyKind, CreateModuleRequest, JsonModule};
    use crate::{api::ApiError, models::Card};

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn json_module(value: serde_json::Value) -> Result<CreateModuleRequest, ApiError> {
        CreateModuleRequest::from_json(serde_json::from_value::<JsonModule>(value).unwrap())
    }

    #[test]
    fn test_body_kind_detection() {
        let mut headers = HeaderMap::new();
        assert_eq!(BodyKind::of(&headers), None);

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert_eq!(BodyKind::of(&headers), Some(BodyKind::Json));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/X-WWW-Form-Urlencoded"),
        );
        assert_eq!(BodyKind::of(&headers), Some(BodyKind::Form));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(BodyKind::of(&headers), None);
    }

    #[test]
    fn test_form_scan_stops_at_first_absent_index() {
        let request = CreateModuleRequest::from_form(form(&[
            ("name", "Capitals"),
            ("description", "Europe"),
            ("term_1", "France"),
            ("definition_1", "Paris"),
            // half pair at 2 is skipped
            ("term_2", "Spain"),
            ("term_3", "Italy"),
            ("definition_3", "Rome"),
            // nothing at 4, so 5 is never read
            ("term_5", "Greece"),
            ("definition_5", "Athens"),
        ]))
        .unwrap();
        assert_eq!(request.name, "Capitals");
        assert_eq!(request.description, "Europe");
        assert_eq!(
            request.cards.into_inner(),
            vec![Card::new("France", "Paris"), Card::new("Italy", "Rome")]
        );
    }

    #[test]
    fn test_form_drops_blank_pairs() {
        let request = CreateModuleRequest::from_form(form(&[
            ("name", "Blanks"),
            ("term_1", ""),
            ("definition_1", "x"),
            ("term_2", "y"),
            ("definition_2", "z"),
        ]))
        .unwrap();
        assert_eq!(request.cards.into_inner(), vec![Card::new("y", "z")]);
        assert_eq!(request.description, "");
    }

    #[test]
    fn test_name_is_required() {
        assert!(matches!(
            CreateModuleRequest::from_form(form(&[("name", "  ")])),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            json_module(json!({"description": "nameless"})),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_json_cards() {
        let request = json_module(json!({
            "name": " Letters ",
            "cards": [
                {"term": "a", "dfn": "1"},
                {"term": "", "dfn": "2"},
                {"term": "b", "dfn": ""},
                {"term": 3, "dfn": "number"},
                "not an object",
                {"term": "c", "dfn": "3", "extra": true},
            ],
        }))
        .unwrap();
        assert_eq!(request.name, "Letters");
        assert_eq!(
            request.cards.into_inner(),
            vec![Card::new("a", "1"), Card::new("c", "3")]
        );
    }

    #[test]
    fn test_json_null_description_is_empty() {
        let request = json_module(json!({"name": "N", "description": null})).unwrap();
        assert_eq!(request.description, "");
        assert!(matches!(
            json_module(json!({"name": null})),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_json_cards_must_be_a_list() {
        let missing = json_module(json!({"name": "Empty"})).unwrap();
        assert!(missing.cards.is_empty());

        for cards in [json!(null), json!({"term": "a", "dfn": "b"}), json!("abc")] {
            assert!(matches!(
                json_module(json!({"name": "Bad", "cards": cards})),
                Err(ApiError::Validation(_))
            ));
        }
    }
}
