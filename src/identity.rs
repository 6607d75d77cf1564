//! Verified caller identity.
//!
//! The session boundary (an upstream gateway) authenticates requests and
//! forwards the result in headers; the core trusts that identity without
//! re-validating credentials. Cart and order handlers take `Identity` as an
//! extractor and reject requests that arrive without one.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let user_id = header(USER_ID_HEADER)
            .and_then(|v| Uuid::parse_str(&v).ok())
            .ok_or(Error::Unauthorized)?;
        let email = header(USER_EMAIL_HEADER).ok_or(Error::Unauthorized)?;
        let name = header(USER_NAME_HEADER).unwrap_or_default();

        Ok(Identity {
            user_id,
            name,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<Identity, Error> {
        let (mut parts, _) = request.into_parts();
        Identity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_identity_from_headers() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_NAME_HEADER, "Ada")
            .header(USER_EMAIL_HEADER, "ada@example.com")
            .body(())
            .unwrap();
        let identity = extract(request).await.unwrap();
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.email, "ada@example.com");
    }

    #[tokio::test]
    async fn missing_or_malformed_identity_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(Error::Unauthorized)));

        let request = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .header(USER_EMAIL_HEADER, "ada@example.com")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(Error::Unauthorized)));
    }
}
