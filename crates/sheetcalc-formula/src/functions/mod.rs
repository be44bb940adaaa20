//! Built-in functions

pub mod logical;
pub mod math;
pub mod text;

use crate::evaluator::EvaluationContext;
use ahash::AHashMap;
use sheetcalc_core::Value;
use std::sync::OnceLock;

/// Function implementation signature
///
/// Arguments arrive evaluated, with ranges already flattened. Implementations
/// report problems as error values and never panic.
pub type FunctionImpl = fn(&[Value], &EvaluationContext<'_>) -> Value;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments as written in the formula
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Check if a call with `count` syntactic arguments is allowed
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Global registry of built-in functions (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Fixed table of built-in functions
#[derive(Debug)]
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_aggregate_functions();
        registry.register_logical_functions();
        registry.register_numeric_functions();
        registry.register_text_functions();

        registry
    }

    /// The shared built-in registry
    pub fn builtin() -> &'static FunctionRegistry {
        FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name.to_ascii_uppercase().as_str())
    }

    /// Check if a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered function names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn register(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) {
        self.functions.insert(
            name,
            FunctionDef {
                name,
                min_args,
                max_args,
                implementation,
            },
        );
    }

    fn register_aggregate_functions(&mut self) {
        self.register("SUM", 1, None, math::fn_sum);
        self.register("AVERAGE", 1, None, math::fn_average);
        self.register("COUNT", 1, None, math::fn_count);
        self.register("MIN", 1, None, math::fn_min);
        self.register("MAX", 1, None, math::fn_max);
    }

    fn register_logical_functions(&mut self) {
        self.register("IF", 2, Some(3), logical::fn_if);
        self.register("AND", 1, None, logical::fn_and);
        self.register("OR", 1, None, logical::fn_or);
        self.register("NOT", 1, Some(1), logical::fn_not);
    }

    fn register_numeric_functions(&mut self) {
        self.register("ABS", 1, Some(1), math::fn_abs);
        self.register("ROUND", 1, Some(2), math::fn_round);
        self.register("SQRT", 1, Some(1), math::fn_sqrt);
        self.register("POW", 2, Some(2), math::fn_pow);
    }

    fn register_text_functions(&mut self) {
        self.register("CONCAT", 0, None, text::fn_concat);
        self.register("UPPER", 1, Some(1), text::fn_upper);
        self.register("LOWER", 1, Some(1), text::fn_lower);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// First error among the arguments, if any
pub(crate) fn first_error(args: &[Value]) -> Option<Value> {
    args.iter().find(|v| v.is_error()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let registry = FunctionRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec![
                "ABS", "AND", "AVERAGE", "CONCAT", "COUNT", "IF", "LOWER", "MAX", "MIN", "NOT",
                "OR", "POW", "ROUND", "SQRT", "SUM", "UPPER"
            ]
        );
        assert!(registry.contains("sum"));
        assert!(!registry.contains("VLOOKUP"));
    }

    #[test]
    fn test_arity() {
        let registry = FunctionRegistry::new();
        let round = registry.get("ROUND").unwrap();
        assert!(!round.accepts(0));
        assert!(round.accepts(1));
        assert!(round.accepts(2));
        assert!(!round.accepts(3));
        assert!(registry.get("SUM").unwrap().accepts(40));
    }
}
