//! Building blocks of a resource ID template.

const EXAMPLE_SUBSCRIPTION_ID: &str = "12345678-1234-9876-4563-123456789012";
const EXAMPLE_RESOURCE_GROUP: &str = "example-resource-group";

/// The role a segment plays inside a resource ID template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// A fixed literal such as `resourceGroups`
    Static,
    /// A resource provider namespace such as `Microsoft.Relay`
    ResourceProvider,
    /// The subscription the resource lives in
    SubscriptionId,
    /// The resource group the resource lives in
    ResourceGroup,
    /// A name chosen by the user (or the service)
    UserSpecified,
    /// A value restricted to a known set of possible values
    Constant,
    /// A nested resource ID spanning multiple path segments
    Scope,
}

/// A single element of a resource ID template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    name: &'static str,
    kind: SegmentKind,
    fixed_value: Option<&'static str>,
    possible_values: &'static [&'static str],
    example: &'static str,
}

impl Segment {
    pub fn static_segment(name: &'static str, value: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::Static,
            fixed_value: Some(value),
            possible_values: &[],
            example: value,
        }
    }

    pub fn resource_provider(name: &'static str, value: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::ResourceProvider,
            fixed_value: Some(value),
            possible_values: &[],
            example: value,
        }
    }

    pub fn subscription_id(name: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::SubscriptionId,
            fixed_value: None,
            possible_values: &[],
            example: EXAMPLE_SUBSCRIPTION_ID,
        }
    }

    pub fn resource_group(name: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::ResourceGroup,
            fixed_value: None,
            possible_values: &[],
            example: EXAMPLE_RESOURCE_GROUP,
        }
    }

    pub fn user_specified(name: &'static str, example: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::UserSpecified,
            fixed_value: None,
            possible_values: &[],
            example,
        }
    }

    pub fn constant(
        name: &'static str,
        possible_values: &'static [&'static str],
        example: &'static str,
    ) -> Self {
        Self {
            name,
            kind: SegmentKind::Constant,
            fixed_value: None,
            possible_values,
            example,
        }
    }

    /// A scope segment; `example` must be a full ID including its leading `/`.
    pub fn scope(name: &'static str, example: &'static str) -> Self {
        Self {
            name,
            kind: SegmentKind::Scope,
            fixed_value: None,
            possible_values: &[],
            example,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// The literal value of a static or resource provider segment.
    pub fn fixed_value(&self) -> Option<&'static str> {
        self.fixed_value
    }

    pub fn possible_values(&self) -> &'static [&'static str] {
        self.possible_values
    }

    pub fn example(&self) -> &'static str {
        self.example
    }

    /// Whether the segment carries a value supplied by the user or the API.
    pub fn is_value(&self) -> bool {
        !matches!(
            self.kind,
            SegmentKind::Static | SegmentKind::ResourceProvider
        )
    }
}

/// Canonical form of `value` for the segment called `name`.
///
/// Scopes are stored with a leading `/` and no trailing one, as the parser returns them.
pub fn normalize_value(segments: &[Segment], name: &str, value: String) -> String {
    let is_scope = segments
        .iter()
        .any(|segment| segment.name == name && segment.kind == SegmentKind::Scope);
    if !is_scope {
        return value;
    }

    let scope = value.trim_end_matches('/');
    if scope.starts_with('/') {
        scope.to_string()
    } else {
        format!("/{scope}")
    }
}

/// Serialize a template into an ID string, looking up value segments through `value_of`.
///
/// Missing values are rendered as empty segments, which a subsequent parse rejects.
pub fn format_id<'a, F>(segments: &[Segment], value_of: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::new();
    for segment in segments {
        match segment.kind {
            SegmentKind::Static | SegmentKind::ResourceProvider => {
                out.push('/');
                out.push_str(segment.fixed_value.unwrap_or_default());
            }
            SegmentKind::Scope => {
                let scope = value_of(segment.name).unwrap_or_default();
                let scope = scope.trim_end_matches('/');
                if !scope.starts_with('/') {
                    out.push('/');
                }
                out.push_str(scope);
            }
            _ => {
                out.push('/');
                out.push_str(value_of(segment.name).unwrap_or_default());
            }
        }
    }
    out
}

/// Render an example ID for a template, used in error messages.
pub fn example_id(segments: &[Segment]) -> String {
    format_id(segments, |name| {
        segments
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.example)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace_segments() -> Vec<Segment> {
        vec![
            Segment::static_segment("staticSubscriptions", "subscriptions"),
            Segment::subscription_id("subscriptionId"),
            Segment::static_segment("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
            Segment::static_segment("staticProviders", "providers"),
            Segment::resource_provider("staticMicrosoftRelay", "Microsoft.Relay"),
            Segment::static_segment("staticNamespaces", "namespaces"),
            Segment::user_specified("namespaceName", "namespaceValue"),
        ]
    }

    #[test]
    fn example_id_uses_segment_examples() {
        assert_eq!(
            example_id(&namespace_segments()),
            "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.Relay/namespaces/namespaceValue"
        );
    }

    #[test]
    fn format_id_normalizes_scope_slashes() {
        let segments = vec![
            Segment::scope("scope", "/subscriptions/12345678-1234-9876-4563-123456789012"),
            Segment::static_segment("staticProviders", "providers"),
        ];

        let with_slash = format_id(&segments, |_| Some("/subscriptions/abc/"));
        let without_slash = format_id(&segments, |_| Some("subscriptions/abc"));

        assert_eq!(with_slash, "/subscriptions/abc/providers");
        assert_eq!(without_slash, "/subscriptions/abc/providers");
    }

    #[test]
    fn only_scope_values_are_normalized() {
        assert_eq!(
            normalize_value(&namespace_segments(), "namespaceName", "ns/".to_string()),
            "ns/"
        );

        let scoped = vec![Segment::scope("scope", "/subscriptions/12345678-1234-9876-4563-123456789012")];
        assert_eq!(
            normalize_value(&scoped, "scope", "subscriptions/abc//".to_string()),
            "/subscriptions/abc"
        );
    }

    #[test]
    fn value_segments_are_flagged() {
        let flagged: Vec<bool> = namespace_segments().iter().map(Segment::is_value).collect();
        assert_eq!(
            flagged,
            vec![false, true, false, true, false, false, false, true]
        );
    }
}
