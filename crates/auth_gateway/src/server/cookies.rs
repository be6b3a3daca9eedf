use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const SESSION_COOKIE_NAME: &str = "SESSION_ID";

/// Create the session cookie issued alongside the first IdP redirect.
///
/// `SameSite=Lax` so the browser still sends it on the top-level GET the
/// IdP redirects back to.
pub(super) fn session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Session id from the request cookies. An empty value counts as absent.
pub(super) fn get_session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
