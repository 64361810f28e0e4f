use crate::request::Request;

/// Decides whether an authenticated request satisfies a route's
/// authorization requirement.
///
/// Routes without a requirement never consult the authorizer.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, request: &Request, requirement: &str) -> bool;
}

/// Treats user data as a comma-separated role list.
///
/// An authenticated request (non-empty user data) passes an empty requirement;
/// otherwise the requirement must be one of the roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDataAuthorizer;

impl Authorizer for UserDataAuthorizer {
    fn authorize(&self, request: &Request, requirement: &str) -> bool {
        if request.user_data.is_empty() {
            return false;
        }
        let requirement = requirement.trim();
        requirement.is_empty() || request.user_data.split(',').any(|role| role.trim() == requirement)
    }
}

impl<F> Authorizer for F
where
    F: Fn(&Request, &str) -> bool + Send + Sync,
{
    fn authorize(&self, request: &Request, requirement: &str) -> bool {
        (self)(request, requirement)
    }
}
