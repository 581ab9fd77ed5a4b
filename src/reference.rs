//! Decomposition of raw reference strings.
//!
//! CakePHP references carry an optional plugin prefix separated by a dot
//! (`Blog.sidebar`, `Vendor/Blog.widgets/card`). Cell references add a
//! `Class::method` suffix whose method maps to a snake_case template name.

use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing dot-segments that name an asset type rather than a path.
const ASSET_EXTENSIONS: [&str; 2] = ["js", "css"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceDescriptor {
    pub plugin: Option<String>,
    pub path: String,
}

impl ReferenceDescriptor {
    /// The key the reference is registered under for a given plugin.
    pub fn qualified(&self, plugin: &str) -> String {
        format!("{}.{}", plugin, self.path)
    }
}

/// Splits `Plugin.path` into its qualifier and remainder.
///
/// A trailing `.js` / `.css` segment is ignored when deciding whether a
/// qualifier is present, so `app.css` has no plugin while `Blog.app.css`
/// belongs to `Blog`.
pub fn split_qualifier(reference: &str) -> ReferenceDescriptor {
    let mut parts: Vec<&str> = reference.split('.').collect();
    if parts.len() > 1 && parts.last().is_some_and(|last| ASSET_EXTENSIONS.contains(last)) {
        parts.pop();
    }

    match parts.split_first() {
        Some((plugin, rest)) if !rest.is_empty() => ReferenceDescriptor {
            plugin: Some(plugin.to_string()),
            path: rest.join("."),
        },
        _ => ReferenceDescriptor {
            plugin: None,
            path: reference.to_string(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentReference {
    pub plugin: Option<String>,
    /// Class path with `/` separators and without the plugin prefix
    pub class_name: String,
    /// Empty when the reference has no `::method` part
    pub method: String,
    /// `class_name/snake_method`, the template location relative to a cell root
    pub template_path: String,
}

/// Splits `Plugin.Class::method` into plugin, class path and method, deriving
/// the template file name from the method.
///
/// References without exactly one `::` degrade to a class-only descriptor.
pub fn split_component_reference(reference: &str) -> ComponentReference {
    static PLUGIN_PREFIX_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\w+)\.").expect("plugin prefix regex"));

    let parts: Vec<&str> = reference.split("::").collect();
    let [class_path, method] = parts.as_slice() else {
        return ComponentReference {
            plugin: None,
            class_name: reference.to_string(),
            method: String::new(),
            template_path: reference.to_string(),
        };
    };

    let class_path = class_path.replace('\\', "/");
    let template_path = format!("{}/{}", class_path, underscore(method));

    match PLUGIN_PREFIX_RE.captures(&class_path) {
        Some(captures) => {
            let prefix_len = captures[0].len();
            ComponentReference {
                plugin: Some(captures[1].to_string()),
                class_name: class_path[prefix_len..].to_string(),
                method: method.to_string(),
                template_path: template_path[prefix_len..].to_string(),
            }
        }
        None => ComponentReference {
            plugin: None,
            class_name: class_path,
            method: method.to_string(),
            template_path,
        },
    }
}

/// `renderWidget` -> `render_widget`
pub fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `render_widget` -> `renderWidget`; a separator at the very start is
/// dropped and the following character lowercased.
pub fn variable_camelize(name: &str) -> String {
    static SEPARATOR_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[-_](\w)").expect("camelize regex"));

    SEPARATOR_RE
        .replace_all(name, |captures: &regex::Captures| {
            let start = captures.get(0).map(|m| m.start()).unwrap_or_default();
            let c = &captures[1];
            if start == 0 {
                c.to_lowercase()
            } else {
                c.to_uppercase()
            }
        })
        .into_owned()
}
