use super::jwt::JwtService;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ok, Ready};
use uuid::Uuid;

/// The requesting user, when a valid bearer token identifies one.
///
/// Resolution never fails the request: a missing, malformed or expired token
/// simply yields an anonymous caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentUser(pub Option<Uuid>);

#[derive(Debug)]
enum IdentityError {
    NotConfigured,
    NoAuthHeader,
    InvalidHeaderFormat,
    NotBearerToken,
    VerificationFailed(String),
    InvalidUuidInClaims(String),
}

impl IdentityError {
    fn log_message(&self, path: &str) -> String {
        match self {
            IdentityError::NotConfigured => format!("{}: token checks disabled, caller is anonymous", path),
            IdentityError::NoAuthHeader => format!("{}: no credentials sent, caller is anonymous", path),
            IdentityError::InvalidHeaderFormat => format!("{}: unreadable credentials, caller is anonymous", path),
            IdentityError::NotBearerToken => format!("{}: credentials are not a bearer token, caller is anonymous", path),
            IdentityError::VerificationFailed(e) => format!("{}: rejected token ({}), caller is anonymous", path, e),
            IdentityError::InvalidUuidInClaims(sub) => format!("{}: token subject '{}' is not a user id, caller is anonymous", path, sub),
        }
    }

    fn is_expected(&self) -> bool {
        matches!(self, IdentityError::NotConfigured | IdentityError::NoAuthHeader)
    }
}

fn resolve_user(req: &HttpRequest) -> Result<Uuid, IdentityError> {
    let jwt_service = req
        .app_data::<web::Data<JwtService>>()
        .ok_or(IdentityError::NotConfigured)?;

    let auth_header = req.headers().get("Authorization").ok_or(IdentityError::NoAuthHeader)?;
    let auth_str = auth_header.to_str().map_err(|_| IdentityError::InvalidHeaderFormat)?;
    let token = auth_str.strip_prefix("Bearer ").ok_or(IdentityError::NotBearerToken)?;

    let claims = jwt_service
        .verify_token(token)
        .map_err(|e| IdentityError::VerificationFailed(e.to_string()))?;

    Uuid::parse_str(&claims.sub).map_err(|_| IdentityError::InvalidUuidInClaims(claims.sub.clone()))
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match resolve_user(req) {
            Ok(user_id) => {
                log::debug!("Request to {} identified as user {}", req.path(), user_id);
                ok(CurrentUser(Some(user_id)))
            }
            Err(e) if e.is_expected() => {
                log::debug!("{}", e.log_message(req.path()));
                ok(CurrentUser(None))
            }
            Err(e) => {
                log::warn!("{}", e.log_message(req.path()));
                ok(CurrentUser(None))
            }
        }
    }
}
