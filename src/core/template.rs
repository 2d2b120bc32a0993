//! Formula templates with `{{version}}`, `{{tarball_url}}`, `{{sha256}}`
//! placeholders, filled in when a release is cut.

use crate::constants;
use anyhow::{bail, Result};
use std::collections::BTreeMap;

/// Values for one release.
#[derive(Debug, Clone)]
pub struct ReleaseValues {
    pub version: String,
    pub tarball_url: String,
    pub sha256: String,
}

impl ReleaseValues {
    fn as_map(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("version", self.version.as_str()),
            ("tarball_url", self.tarball_url.as_str()),
            ("sha256", self.sha256.as_str()),
        ])
    }
}

/// Substitute every placeholder. Unknown keys and unterminated
/// placeholders are errors.
pub fn render(template: &str, values: &ReleaseValues) -> Result<String> {
    let map = values.as_map();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = match after.find("}}") {
            Some(e) => e,
            None => bail!("unterminated placeholder at byte {}", template.len() - rest.len() + start),
        };
        let key = after[..end].trim();
        if !constants::TEMPLATE_KEYS.contains(&key) {
            bail!(
                "unknown placeholder '{{{{{}}}}}' (expected one of: {})",
                key,
                constants::TEMPLATE_KEYS.join(", ")
            );
        }
        let value = map.get(key).copied().unwrap_or_default();
        if value.is_empty() {
            bail!("no value for placeholder '{}'", key);
        }
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> ReleaseValues {
        ReleaseValues {
            version: "2.1.3".into(),
            tarball_url: "https://example.com/v2.1.3.tar.gz".into(),
            sha256: "ab".repeat(32),
        }
    }

    #[test]
    fn test_render_fills_all_keys() {
        let out = render(
            "version = \"{{version}}\"\nurl = \"{{ tarball_url }}\"\nsha256 = \"{{sha256}}\"\n",
            &values(),
        )
        .unwrap();
        assert!(out.contains("version = \"2.1.3\""));
        assert!(out.contains("url = \"https://example.com/v2.1.3.tar.gz\""));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = render("x = \"{{branch}}\"", &values()).unwrap_err();
        assert!(err.to_string().contains("{{branch}}"));
    }

    #[test]
    fn test_unterminated_rejected() {
        assert!(render("x = \"{{version\"", &values()).is_err());
    }

    #[test]
    fn test_empty_value_rejected() {
        let mut v = values();
        v.sha256.clear();
        assert!(render("{{sha256}}", &v).is_err());
    }

    #[test]
    fn test_rendered_template_is_a_valid_formula() {
        let template = include_str!("../../formula/aws-jumpcloud.toml.in");
        let out = render(template, &values()).unwrap();
        let formula = crate::models::formula::Formula::parse(&out).unwrap();
        assert_eq!(formula.name, "aws-jumpcloud");
        assert_eq!(formula.test.expect, "rotate");
    }
}
