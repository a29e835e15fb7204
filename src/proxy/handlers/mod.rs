pub mod forward;
pub mod login;
pub mod logout;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::proxy::cookie_policy::CookiePolicy;
use crate::proxy::SESSION_COOKIE_NAME;

/// Build the session cookie handed to the browser. The value is the opaque
/// identifier only; the upstream credential never leaves the proxy.
pub(crate) fn session_cookie(
    policy: &CookiePolicy,
    session_id: &str,
    ttl_secs: u64,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(policy.secure)
        .same_site(policy.same_site)
        .max_age(Duration::seconds(ttl_secs as i64))
        .build()
}

/// Build the removal cookie with the same attributes the session cookie was
/// issued with, so browsers actually drop it.
pub(crate) fn clear_session_cookie(secure: bool, same_site: SameSite) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .max_age(Duration::ZERO)
        .build()
}
