//! Function registry
//!
//! The lookup contract consumed by the evaluator. Concrete function
//! implementations live with the embedding application; this module only
//! owns the process-wide name registry and the invoke surface.
//!
//! Functions may be registered under a package-qualified name
//! (`string.concat`) and referenced through the bare-name alias
//! (`concat`); the first package to claim an alias keeps it.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use conflux_core::DataType;

use crate::error::{Error, Result};

/// Declared signature of a registered function
#[derive(Debug, Clone)]
pub struct Signature {
    /// Parameter types, in order
    pub params: Vec<DataType>,
    /// True when the last parameter repeats
    pub variadic: bool,
}

impl Signature {
    /// Fixed-arity signature.
    pub fn new(params: Vec<DataType>) -> Self {
        Self {
            params,
            variadic: false,
        }
    }

    /// Variadic signature; the last parameter type repeats.
    pub fn variadic(params: Vec<DataType>) -> Self {
        Self {
            params,
            variadic: true,
        }
    }
}

/// A named callable usable inside expressions
pub trait Function: Send + Sync {
    /// Registered name, optionally package-qualified
    fn name(&self) -> &str;

    /// Declared parameter types and variadic flag
    fn signature(&self) -> &Signature;

    /// Invoke with positional arguments already coerced to the declared
    /// parameter types.
    fn eval(&self, args: &[Value]) -> Result<Value>;
}

#[derive(Default)]
struct Registry {
    by_name: HashMap<String, Arc<dyn Function>>,
    aliases: HashMap<String, String>,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

/// Register a function under its declared name.
///
/// Registration happens during initialization, before evaluation traffic
/// begins; registering the same name twice is an error.
pub fn register(function: Arc<dyn Function>) -> Result<()> {
    let name = function.name().to_string();
    let mut registry = REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if registry.by_name.contains_key(&name) {
        return Err(Error::DuplicateFunction { name });
    }
    if let Some((_, bare)) = name.rsplit_once('.') {
        registry
            .aliases
            .entry(bare.to_string())
            .or_insert_with(|| name.clone());
    }
    registry.by_name.insert(name, function);
    Ok(())
}

/// Look a function up by exact name or bare-name alias.
pub fn get(name: &str) -> Option<Arc<dyn Function>> {
    let registry = REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(function) = registry.by_name.get(name) {
        return Some(function.clone());
    }
    registry
        .aliases
        .get(name)
        .and_then(|full| registry.by_name.get(full))
        .cloned()
}

/// True when `name` resolves to a registered function.
pub fn is_registered(name: &str) -> bool {
    get(name).is_some()
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ConcatFn {
        signature: Signature,
    }

    impl Function for ConcatFn {
        fn name(&self) -> &str {
            "string.concat"
        }

        fn signature(&self) -> &Signature {
            &self.signature
        }

        fn eval(&self, args: &[Value]) -> Result<Value> {
            let mut out = String::new();
            for arg in args {
                out.push_str(arg.as_str().unwrap_or_default());
            }
            Ok(Value::String(out))
        }
    }

    fn register_concat() {
        // other tests may have registered it already
        let _ = register(Arc::new(ConcatFn {
            signature: Signature::variadic(vec![DataType::String]),
        }));
    }

    #[test]
    fn test_get_by_qualified_name_and_alias() {
        register_concat();
        assert!(get("string.concat").is_some());
        assert!(get("concat").is_some());
        assert!(get("nope.concat").is_none());
        assert!(is_registered("concat"));
        assert!(!is_registered("shout"));
    }

    #[test]
    fn test_duplicate_registration_errors() {
        register_concat();
        let err = register(Arc::new(ConcatFn {
            signature: Signature::variadic(vec![DataType::String]),
        }))
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateFunction { .. }));
    }

    #[test]
    fn test_invoke_through_registry() {
        register_concat();
        let function = get("concat").unwrap();
        let out = function.eval(&[json!("a"), json!("b")]).unwrap();
        assert_eq!(out, json!("ab"));
    }
}
