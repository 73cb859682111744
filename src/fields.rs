use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// One batch of metadata mutations: `Some` sets a key, `None` deletes it.
pub type Patch = BTreeMap<String, Option<FieldValue>>;

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// String list view: a scalar string counts as a one-element list.
    pub fn as_string_list(&self) -> Vec<String> {
        match self {
            FieldValue::String(s) => vec![s.clone()],
            FieldValue::List(items) => items
                .iter()
                .filter_map(|it| it.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

pub fn normalize_field_key(key: &str) -> Option<String> {
    let k = key.trim();
    if k.is_empty() {
        return None;
    }
    Some(k.to_lowercase())
}

pub fn yaml_to_field_value(v: &serde_yaml::Value) -> FieldValue {
    match v {
        serde_yaml::Value::Null => FieldValue::Null,
        serde_yaml::Value::Bool(b) => FieldValue::Bool(*b),
        serde_yaml::Value::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(0.0)),
        serde_yaml::Value::String(s) => FieldValue::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            FieldValue::List(seq.iter().map(yaml_to_field_value).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                let Some(k) = k.as_str().and_then(normalize_field_key) else {
                    continue;
                };
                out.insert(k, yaml_to_field_value(v));
            }
            FieldValue::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_field_value(&tagged.value),
    }
}

pub fn field_value_to_yaml(v: &FieldValue) -> serde_yaml::Value {
    match v {
        FieldValue::Null => serde_yaml::Value::Null,
        FieldValue::Bool(b) => serde_yaml::Value::Bool(*b),
        FieldValue::Number(n) => {
            // Whole numbers serialize without a trailing ".0".
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                serde_yaml::Value::Number((*n as i64).into())
            } else {
                serde_yaml::Value::Number((*n).into())
            }
        }
        FieldValue::String(s) => serde_yaml::Value::String(s.clone()),
        FieldValue::List(items) => {
            serde_yaml::Value::Sequence(items.iter().map(field_value_to_yaml).collect())
        }
        FieldValue::Object(map) => {
            let mut out = serde_yaml::Mapping::new();
            for (k, v) in map {
                out.insert(serde_yaml::Value::String(k.clone()), field_value_to_yaml(v));
            }
            serde_yaml::Value::Mapping(out)
        }
    }
}

pub fn extract_frontmatter_fields(fm: &serde_yaml::Value) -> FieldMap {
    let mut out = FieldMap::new();
    let Some(map) = fm.as_mapping() else {
        return out;
    };

    for (k, v) in map {
        let Some(key) = k.as_str().and_then(normalize_field_key) else {
            continue;
        };
        out.insert(key, yaml_to_field_value(v));
    }

    out
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value.into_iter().map(FieldValue::String).collect())
    }
}
