use std::time::Instant;

/// Identity of the superuser
pub const ADMIN_IDENTITY: &str = "admin";

/// Execution context of one in-flight operation: who is calling and until when.
///
/// The deadline is carried through every layer but bulk operations do not
/// consult it; a fan-out run always completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    identity: Option<String>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Unauthenticated context
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            deadline: None,
        }
    }

    pub fn admin() -> Self {
        Self::with_identity(ADMIN_IDENTITY)
    }

    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Authenticated principal; empty identities count as absent
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.identity() == Some(ADMIN_IDENTITY)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_flags() {
        assert!(!RequestContext::anonymous().is_authenticated());
        assert!(!RequestContext::with_identity("").is_authenticated());
        assert!(RequestContext::with_identity("loki").is_authenticated());
        assert!(!RequestContext::with_identity("loki").is_admin());
        assert!(RequestContext::admin().is_admin());
    }
}
