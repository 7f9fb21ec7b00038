//! IDs shared by every service: subscriptions, resource groups and arbitrary scopes.

use crate::{resource_id, Segment};

resource_id! {
    /// A subscription, `/subscriptions/{subscriptionId}`
    pub struct SubscriptionId("Subscription") {
        subscription_id => "subscriptionId", "Subscription",
    }
    segments = [
        Segment::static_segment("staticSubscriptions", "subscriptions"),
        Segment::subscription_id("subscriptionId"),
    ];
}

resource_id! {
    /// A resource group, `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
    pub struct ResourceGroupId("Resource Group") {
        subscription_id => "subscriptionId", "Subscription",
        resource_group_name => "resourceGroupName", "Resource Group Name",
    }
    segments = [
        Segment::static_segment("staticSubscriptions", "subscriptions"),
        Segment::subscription_id("subscriptionId"),
        Segment::static_segment("staticResourceGroups", "resourceGroups"),
        Segment::resource_group("resourceGroupName"),
    ];
}

resource_id! {
    /// Any resource ID used as the parent of an extension resource
    pub struct ScopeId("Scope") {
        scope => "scope", "Scope",
    }
    segments = [
        Segment::scope(
            "scope",
            "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/some-resource-group",
        ),
    ];
}

impl ResourceGroupId {
    pub fn subscription(&self) -> SubscriptionId {
        SubscriptionId::new(self.subscription_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceId;

    #[test]
    fn resource_group_round_trips() {
        let id = ResourceGroupId::new("sub", "rg");
        assert_eq!(id.id(), "/subscriptions/sub/resourceGroups/rg");
        assert_eq!(ResourceGroupId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn resource_group_rejects_lower_case_literal() {
        let err = ResourceGroupId::parse("/subscriptions/sub/resourcegroups/rg").unwrap_err();
        assert_eq!(err.segment(), Some("staticResourceGroups"));

        let id = ResourceGroupId::parse_insensitively("/subscriptions/sub/resourcegroups/rg").unwrap();
        assert_eq!(id.id(), "/subscriptions/sub/resourceGroups/rg");
    }

    #[test]
    fn scope_accepts_any_nested_id() {
        let id = ScopeId::parse("/subscriptions/sub/resourceGroups/rg").unwrap();
        assert_eq!(id.scope, "/subscriptions/sub/resourceGroups/rg");
        assert_eq!(id.id(), "/subscriptions/sub/resourceGroups/rg");
    }

    #[test]
    fn constructed_scopes_round_trip() {
        for scope in ["/subscriptions/sub/", "subscriptions/sub", "/subscriptions/sub"] {
            let id = ScopeId::new(scope);
            assert_eq!(id.scope, "/subscriptions/sub");
            assert_eq!(ScopeId::parse(&id.id()).unwrap(), id);
        }
    }

    #[test]
    fn describe_lists_components() {
        let id = ResourceGroupId::new("sub", "rg");
        assert_eq!(
            id.describe(),
            "Resource Group (Subscription: \"sub\"\nResource Group Name: \"rg\")"
        );
    }

    #[test]
    fn subscription_of_resource_group() {
        let id = ResourceGroupId::new("sub", "rg");
        assert_eq!(id.subscription().id(), "/subscriptions/sub");
    }
}
