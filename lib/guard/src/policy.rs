//! Per-route access policy declared when a route is registered.

/// Names the resource a guarded route operates on.
///
/// The guard records it on every decision it makes for the route, so logs
/// say what was being accessed, and which path parameter identified it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    resource: &'static str,
    resource_id_param: Option<&'static str>,
}

impl RoutePolicy {
    /// A policy for a collection-level operation on `resource`.
    #[must_use]
    pub const fn resource(resource: &'static str) -> Self {
        Self {
            resource,
            resource_id_param: None,
        }
    }

    /// Names the path parameter holding the resource's ID.
    #[must_use]
    pub const fn with_resource_id(mut self, param: &'static str) -> Self {
        self.resource_id_param = Some(param);
        self
    }

    /// The guarded resource.
    #[must_use]
    pub const fn resource_name(&self) -> &'static str {
        self.resource
    }

    /// The path parameter naming the resource instance, if any.
    #[must_use]
    pub const fn resource_id_param(&self) -> Option<&'static str> {
        self.resource_id_param
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_collection_and_instance_policies() {
        const USERS: RoutePolicy = RoutePolicy::resource("users");
        const USER: RoutePolicy = RoutePolicy::resource("users").with_resource_id("id");

        assert_eq!(USERS.resource_name(), "users");
        assert_eq!(USERS.resource_id_param(), None);
        assert_eq!(USER.resource_id_param(), Some("id"));
    }
}
