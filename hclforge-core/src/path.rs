//! Path - Template expressions addressing nested configuration values

use crate::template::is_bare_lookup;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
struct Component {
    name: String,
    is_collection: bool,
}

/// Location of a field value inside the configuration, rendered as a
/// template lookup expression.
///
/// A component that follows a collection addresses the collection's first
/// element, so `settings` (a collection) then `ip_filter` becomes
/// `index(settings, 0, "ip_filter")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatePath {
    /// Loop variable the path is rooted at, instead of the configuration root
    base: Option<String>,
    components: Vec<Component>,
}

impl TemplatePath {
    /// Path rooted at a top-level configuration key
    pub fn new(name: impl Into<String>, is_collection: bool) -> Self {
        TemplatePath {
            base: None,
            components: vec![Component {
                name: name.into(),
                is_collection,
            }],
        }
    }

    /// Empty path rooted at loop variable `$variable`
    pub fn within(variable: impl Into<String>) -> Self {
        TemplatePath {
            base: Some(variable.into()),
            components: Vec::new(),
        }
    }

    /// Extend the path by one component, leaving `self` untouched
    pub fn append(&self, name: impl Into<String>, is_collection: bool) -> Self {
        let mut next = self.clone();
        next.components.push(Component {
            name: name.into(),
            is_collection,
        });
        next
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The lookup expression. An empty path renders as the empty string.
    pub fn expression(&self) -> String {
        let mut components = self.components.iter();
        let Some(first) = components.next() else {
            return String::new();
        };

        let mut expr = match &self.base {
            Some(variable) => format!("index(${}, {})", variable, quote(&first.name)),
            None if is_bare_lookup(&first.name) => first.name.clone(),
            None => format!("index(., {})", quote(&first.name)),
        };
        let mut previous_is_collection = first.is_collection;
        for component in components {
            expr = if previous_is_collection {
                format!("index({}, 0, {})", expr, quote(&component.name))
            } else {
                format!("index({}, {})", expr, quote(&component.name))
            };
            previous_is_collection = component.is_collection;
        }
        expr
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_component() {
        assert_eq!(TemplatePath::new("name", false).expression(), "name");
    }

    #[test]
    fn test_reserved_root_names_use_root_index() {
        assert_eq!(TemplatePath::new("end", false).expression(), r#"index(., "end")"#);
        assert_eq!(
            TemplatePath::new("nil", true).append("x", false).expression(),
            r#"index(index(., "nil"), 0, "x")"#
        );
    }

    #[test]
    fn test_nested_components() {
        let path = TemplatePath::new("a", false)
            .append("b", false)
            .append("c", true);
        assert_eq!(path.expression(), r#"index(index(a, "b"), "c")"#);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_component_after_collection_addresses_first_element() {
        let path = TemplatePath::new("settings", true).append("ip_filter", false);
        assert_eq!(path.expression(), r#"index(settings, 0, "ip_filter")"#);

        let deeper = path.append("network", false);
        assert_eq!(
            deeper.expression(),
            r#"index(index(settings, 0, "ip_filter"), "network")"#
        );
    }

    #[test]
    fn test_append_does_not_mutate() {
        let base = TemplatePath::new("a", false);
        let _ = base.append("b", false);
        assert_eq!(base.expression(), "a");
    }

    #[test]
    fn test_empty_path() {
        assert_eq!(TemplatePath::default().expression(), "");
        assert!(TemplatePath::within("item1").is_empty());
        assert_eq!(TemplatePath::within("item1").expression(), "");
    }

    #[test]
    fn test_rooted_at_loop_variable() {
        let path = TemplatePath::within("item1")
            .append("rules", true)
            .append("port", false);
        assert_eq!(
            path.expression(),
            r#"index(index($item1, "rules"), 0, "port")"#
        );
    }
}
