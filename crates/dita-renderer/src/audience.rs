//! Audience and delivery-target filtering.

/// Delivery target used when none is configured.
pub const DEFAULT_DELIVERY_TARGET: &str = "KB";

/// Decides whether a map node or table row belongs to web output.
///
/// An element is excluded when its `audience` is `html` or `print`, when
/// `print` is `printonly`, or when it names a non-empty space-separated
/// `deliveryTarget` list that does not contain the configured target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudienceFilter {
    delivery_target: String,
}

impl Default for AudienceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_TARGET)
    }
}

impl AudienceFilter {
    /// Create a filter for the given delivery target.
    #[must_use]
    pub fn new(delivery_target: impl Into<String>) -> Self {
        Self {
            delivery_target: delivery_target.into(),
        }
    }

    /// Configured delivery target.
    #[must_use]
    pub fn delivery_target(&self) -> &str {
        &self.delivery_target
    }

    /// Whether an element with these attribute values is kept.
    #[must_use]
    pub fn is_web_audience(&self, audience: &str, print: &str, delivery_target: &str) -> bool {
        !(audience == "html"
            || audience == "print"
            || print == "printonly"
            || (!delivery_target.is_empty()
                && !delivery_target
                    .split(' ')
                    .any(|target| target == self.delivery_target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_element_is_kept() {
        assert!(AudienceFilter::default().is_web_audience("", "", ""));
    }

    #[test]
    fn test_audience_html_and_print_are_pruned() {
        let filter = AudienceFilter::default();

        assert!(!filter.is_web_audience("html", "", ""));
        assert!(!filter.is_web_audience("print", "", ""));
        assert!(filter.is_web_audience("expert", "", ""));
    }

    #[test]
    fn test_print_only_is_pruned() {
        assert!(!AudienceFilter::default().is_web_audience("", "printonly", ""));
        assert!(AudienceFilter::default().is_web_audience("", "yes", ""));
    }

    #[test]
    fn test_delivery_target_allow_list() {
        let filter = AudienceFilter::default();

        assert!(filter.is_web_audience("", "", "F1 KB PDF"));
        assert!(filter.is_web_audience("", "", "KB"));
        assert!(!filter.is_web_audience("", "", "F1 PDF"));
        assert!(!filter.is_web_audience("", "", "KBX"));
    }

    #[test]
    fn test_printonly_wins_over_allowed_target() {
        assert!(!AudienceFilter::default().is_web_audience("", "printonly", "KB"));
    }

    #[test]
    fn test_custom_delivery_target() {
        let filter = AudienceFilter::new("Web");

        assert!(filter.is_web_audience("", "", "Web PDF"));
        assert!(!filter.is_web_audience("", "", "KB"));
    }
}
