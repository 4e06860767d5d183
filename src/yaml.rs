use std::collections::HashMap;
use crate::context::Context;
use crate::error::ContextError;
use crate::value::Value;
pub use serde_yaml::Value as YamlValue;


impl TryFrom<&YamlValue> for Context {
    type Error = ContextError;

    fn try_from(yaml: &YamlValue) -> Result<Self, Self::Error> {
        match yaml {
            YamlValue::Mapping(mapping) => mapping.iter()
                .map(|(key, value)| {
                    let name = key.as_str()
                        .ok_or(ContextError::NotAnObject("mapping with non-string keys"))?;
                    Ok((name.to_owned(), to_value(name, value)?))
                })
                .collect::<Result<HashMap<_, _>, ContextError>>()
                .map(|values| values.into_iter().collect()),
            // an empty document is an empty context
            YamlValue::Null => Ok(Context::new()),
            _ => Err(ContextError::NotAnObject("yaml scalar or sequence"))
        }
    }
}

fn to_value(name: &str, yaml: &YamlValue) -> Result<Value, ContextError> {
    match yaml {
        YamlValue::Null => Ok(Value::None),
        YamlValue::Bool(b) => Ok(Value::Bool(*b)),
        YamlValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n.as_f64()
                .map(Value::Float)
                .ok_or_else(|| unsupported(name, "number out of range"))
        },
        YamlValue::String(s) => Ok(Value::Str(s.clone())),
        YamlValue::Sequence(seq) => seq.iter()
            .map(|item| to_value(name, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        YamlValue::Mapping(_) => Err(unsupported(name, "mapping")),
        YamlValue::Tagged(_) => Err(unsupported(name, "tagged value")),
    }
}

fn unsupported(name: &str, kind: &'static str) -> ContextError {
    ContextError::Unsupported { name: name.to_owned(), kind }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_to_context() {
        let yaml = serde_yaml::from_str::<YamlValue>(
            "name: Bob\nage: 30\ntasks: [a, b]\nratio: 0.5\n"
        ).unwrap();
        let context = Context::try_from(&yaml).unwrap();
        assert_eq!(context.get("name"), Some(&Value::from("Bob")));
        assert_eq!(context.get("age"), Some(&Value::Int(30)));
        assert_eq!(context.get("tasks"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(context.get("ratio"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn nested_mapping_is_rejected() {
        let yaml = serde_yaml::from_str::<YamlValue>("user: {name: Bob}").unwrap();
        assert!(matches!(
            Context::try_from(&yaml),
            Err(ContextError::Unsupported { kind: "mapping", .. })
        ));
    }
}
