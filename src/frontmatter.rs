use crate::fields::{extract_frontmatter_fields, field_value_to_yaml, FieldMap, Patch};
use crate::{Error, Result, VaultPath};

#[derive(Debug, Clone)]
pub(crate) enum Frontmatter<'a> {
    None { body: &'a str },
    Valid { mapping: serde_yaml::Mapping, body: &'a str },
    Broken { error: String },
}

pub(crate) fn split(content: &str) -> Frontmatter<'_> {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Frontmatter::None { body: content };
    };

    // Find a closing fence on its own line, accepting "---\n" and "---\r\n".
    let mut idx = 0usize;
    while idx < rest.len() {
        let line_end = match rest[idx..].find('\n') {
            Some(off) => idx + off + 1,
            None => rest.len(),
        };
        let line = rest[idx..line_end].trim_end_matches(['\r', '\n']);
        if line == "---" {
            let fm_text = &rest[..idx];
            let body = &rest[line_end..];
            return match serde_yaml::from_str::<serde_yaml::Value>(fm_text) {
                Ok(serde_yaml::Value::Mapping(mapping)) => Frontmatter::Valid { mapping, body },
                Ok(serde_yaml::Value::Null) => Frontmatter::Valid {
                    mapping: serde_yaml::Mapping::new(),
                    body,
                },
                Ok(_) => Frontmatter::Broken {
                    error: "frontmatter is not a key-value mapping".to_string(),
                },
                Err(err) => Frontmatter::Broken {
                    error: err.to_string(),
                },
            };
        }
        idx = line_end;
    }

    Frontmatter::Broken {
        error: "frontmatter fence not closed".to_string(),
    }
}

/// Parsed frontmatter fields, or an error for a broken fence/YAML.
pub(crate) fn fields(path: &VaultPath, content: &str) -> Result<FieldMap> {
    match split(content) {
        Frontmatter::None { .. } => Ok(FieldMap::new()),
        Frontmatter::Valid { mapping, .. } => {
            Ok(extract_frontmatter_fields(&serde_yaml::Value::Mapping(mapping)))
        }
        Frontmatter::Broken { error } => Err(Error::frontmatter(path.as_path(), error)),
    }
}

/// Parsed frontmatter fields, or `None` for a broken fence/YAML.
pub(crate) fn fields_lenient(content: &str) -> std::result::Result<FieldMap, String> {
    match split(content) {
        Frontmatter::None { .. } => Ok(FieldMap::new()),
        Frontmatter::Valid { mapping, .. } => {
            Ok(extract_frontmatter_fields(&serde_yaml::Value::Mapping(mapping)))
        }
        Frontmatter::Broken { error } => Err(error),
    }
}

/// Rewrite a note's content with one batch of frontmatter mutations.
///
/// `Some(value)` entries set a key, `None` entries delete it. Unrelated keys
/// keep their value and position; newly set keys append in patch order. When
/// every key is gone the fence itself is dropped, and a note without
/// frontmatter gains one only if the patch actually sets something.
pub(crate) fn apply_patch(path: &VaultPath, content: &str, patch: &Patch) -> Result<String> {
    let (mapping, body) = match split(content) {
        Frontmatter::Broken { error } => {
            return Err(Error::frontmatter(path.as_path(), error));
        }
        Frontmatter::None { body } => (serde_yaml::Mapping::new(), body),
        Frontmatter::Valid { mapping, body } => (mapping, body),
    };

    let mut out = serde_yaml::Mapping::new();
    for (k, v) in &mapping {
        let Some(key) = k.as_str() else {
            out.insert(k.clone(), v.clone());
            continue;
        };
        match patch.get(key) {
            Some(None) => {}
            Some(Some(new)) => {
                out.insert(k.clone(), field_value_to_yaml(new));
            }
            None => {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    for (key, update) in patch {
        let yaml_key = serde_yaml::Value::String(key.clone());
        if let Some(new) = update {
            if !out.contains_key(&yaml_key) {
                out.insert(yaml_key, field_value_to_yaml(new));
            }
        }
    }

    if out.is_empty() {
        return Ok(body.to_string());
    }

    let yaml = serde_yaml::to_string(&serde_yaml::Value::Mapping(out))
        .map_err(|e| Error::frontmatter(path.as_path(), e.to_string()))?;
    Ok(format!("---\n{yaml}---\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;
    use std::path::Path;

    fn vp(s: &str) -> VaultPath {
        VaultPath::try_from(Path::new(s)).unwrap()
    }

    fn patch(entries: &[(&str, Option<FieldValue>)]) -> Patch {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn patch_creates_frontmatter_when_missing() {
        let out = apply_patch(
            &vp("a.md"),
            "# Title\nbody\n",
            &patch(&[("interval", Some(FieldValue::Number(1.0)))]),
        )
        .unwrap();
        assert_eq!(out, "---\ninterval: 1\n---\n# Title\nbody\n");
    }

    #[test]
    fn patch_preserves_unrelated_keys_and_order() {
        let out = apply_patch(
            &vp("a.md"),
            "---\ntitle: Hello\ninterval: 1\ntags: [x]\n---\nbody\n",
            &patch(&[("interval", Some(FieldValue::Number(2.6)))]),
        )
        .unwrap();
        assert_eq!(out, "---\ntitle: Hello\ninterval: 2.6\ntags:\n- x\n---\nbody\n");
    }

    #[test]
    fn deleting_every_key_drops_the_fence() {
        let out = apply_patch(
            &vp("a.md"),
            "---\ninterval: 1\nease: 2.5\n---\nbody\n",
            &patch(&[("interval", None), ("ease", None)]),
        )
        .unwrap();
        assert_eq!(out, "body\n");
    }

    #[test]
    fn delete_only_patch_leaves_bare_note_untouched() {
        let content = "just a body\n";
        let out = apply_patch(&vp("a.md"), content, &patch(&[("interval", None)])).unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn broken_frontmatter_is_an_error() {
        let err = apply_patch(
            &vp("a.md"),
            "---\ntags: [\n---\n",
            &patch(&[("interval", Some(FieldValue::Number(1.0)))]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Frontmatter { .. }));
    }

    #[test]
    fn unclosed_fence_is_broken() {
        assert!(matches!(
            split("---\ninterval: 1\n"),
            Frontmatter::Broken { .. }
        ));
    }
}
