use axum::http::{Method, Uri};
use url::form_urlencoded;
use uuid::Uuid;

use crate::models::Role;

/// Where anonymous callers are sent when a guarded route needs a login.
pub const LOGIN_PATH: &str = "/auth/login";

/// Query parameter carrying the original destination through the login flow.
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// Path prefixes the access policy is applied to. A path matches when it
/// equals a prefix or continues it with a `/` segment.
pub const GUARDED_PREFIXES: [&str; 6] = [
    "/admin",
    "/dashboard",
    "/profile",
    "/favorites",
    "/sell",
    "/api/cars",
];

/// Session
///
/// The caller identity resolved once per request by the auth layer and passed
/// explicitly into `evaluate`. An authenticated session may still carry no
/// recognised role; such a session never satisfies a role requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated { user_id: Uuid, role: Option<Role> },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Session::Authenticated { user_id, .. } => Some(*user_id),
            Session::Anonymous => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Session::Authenticated { role, .. } => *role,
            Session::Anonymous => None,
        }
    }
}

/// RouteClasses
///
/// The set of route classes a request falls into. Classes overlap freely:
/// `/dashboard/seller/stats` is both `dashboard` and `dashboard_seller`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteClasses {
    pub admin: bool,
    pub dashboard: bool,
    pub dashboard_seller: bool,
    pub dashboard_buyer: bool,
    pub profile: bool,
    pub favorites: bool,
    pub sell: bool,
    pub cars_mutation: bool,
}

impl RouteClasses {
    /// Classifies by raw path prefix. Only `cars_mutation` looks at the method.
    pub fn classify(path: &str, method: &Method) -> Self {
        let mutating = [Method::POST, Method::PUT, Method::DELETE].contains(method);

        Self {
            admin: path.starts_with("/admin"),
            dashboard: path.starts_with("/dashboard"),
            dashboard_seller: path.starts_with("/dashboard/seller"),
            dashboard_buyer: path.starts_with("/dashboard/buyer"),
            profile: path.starts_with("/profile"),
            favorites: path.starts_with("/favorites"),
            sell: path.starts_with("/sell"),
            cars_mutation: mutating && path.starts_with("/api/cars"),
        }
    }
}

/// Decision
///
/// Outcome of one policy evaluation. A redirect with a `callback_url` is the
/// login redirect; the callback is the untouched `path?query` of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo {
        destination: &'static str,
        callback_url: Option<String>,
    },
}

impl Decision {
    fn login(uri: &Uri) -> Self {
        Decision::RedirectTo {
            destination: LOGIN_PATH,
            callback_url: Some(callback_url(uri)),
        }
    }

    fn redirect(destination: &'static str) -> Self {
        Decision::RedirectTo {
            destination,
            callback_url: None,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn preserves_return_path(&self) -> bool {
        matches!(
            self,
            Decision::RedirectTo {
                callback_url: Some(_),
                ..
            }
        )
    }

    /// The `Location` header value for a redirect, `None` for `Allow`.
    pub fn location(&self) -> Option<String> {
        match self {
            Decision::Allow => None,
            Decision::RedirectTo {
                destination,
                callback_url: None,
            } => Some((*destination).to_string()),
            Decision::RedirectTo {
                destination,
                callback_url: Some(callback),
            } => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(CALLBACK_PARAM, callback)
                    .finish();
                Some(format!("{destination}?{query}"))
            }
        }
    }
}

/// True when `path` falls under one of the guarded prefixes.
pub fn is_guarded(path: &str) -> bool {
    GUARDED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

fn callback_url(uri: &Uri) -> String {
    match uri.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", uri.path(), query),
        _ => uri.path().to_string(),
    }
}

/// evaluate
///
/// Maps a request onto `Allow` or a redirect. Checks run in a fixed order and
/// the first redirect wins:
///
/// 1. profile, favorites and car mutations require a login;
/// 2. favorites are for buyers (sellers go to their dashboard, others home);
/// 3. sell pages require a login and the seller role;
/// 4. admin pages require a login and the admin role;
/// 5. dashboards require a login, and each role dashboard its own role.
///
/// Paths outside `GUARDED_PREFIXES` are always allowed. An admin hitting a
/// role dashboard is bounced to the other dashboard like any non-matching role.
pub fn evaluate(uri: &Uri, method: &Method, session: &Session) -> Decision {
    let path = uri.path();
    if !is_guarded(path) {
        return Decision::Allow;
    }

    let route = RouteClasses::classify(path, method);
    let logged_in = session.is_authenticated();
    let role = session.role();

    if (route.profile || route.favorites || route.cars_mutation) && !logged_in {
        return Decision::login(uri);
    }

    if route.favorites && role != Some(Role::Buyer) {
        return Decision::redirect(if role == Some(Role::Seller) {
            "/dashboard/seller"
        } else {
            "/"
        });
    }

    if route.sell {
        if !logged_in {
            return Decision::login(uri);
        }
        if role != Some(Role::Seller) {
            return Decision::redirect(if role == Some(Role::Buyer) {
                "/dashboard/buyer"
            } else {
                "/"
            });
        }
    }

    if route.admin {
        if !logged_in {
            return Decision::login(uri);
        }
        if role != Some(Role::Admin) {
            return Decision::redirect("/");
        }
    }

    if route.dashboard {
        if !logged_in {
            return Decision::login(uri);
        }
        if route.dashboard_seller && role != Some(Role::Seller) {
            return Decision::redirect("/dashboard/buyer");
        }
        if route.dashboard_buyer && role != Some(Role::Buyer) {
            return Decision::redirect("/dashboard/seller");
        }
    }

    Decision::Allow
}
