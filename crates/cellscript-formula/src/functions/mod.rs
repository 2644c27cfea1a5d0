//! Built-in function catalog

pub mod logical;
pub mod math;
pub mod text;

use crate::error::FormulaResult;
use crate::value::Value;
use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Function implementation signature
pub type FunctionImpl = fn(&[Value]) -> FormulaResult<Value>;

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Range { min: usize, max: usize },
    Variadic,
}

impl Arity {
    /// `(min, max)` bounds, `None` for variadic functions
    pub fn bounds(self) -> Option<(usize, usize)> {
        match self {
            Arity::Fixed(n) => Some((n, n)),
            Arity::Range { min, max } => Some((min, max)),
            Arity::Variadic => None,
        }
    }
}

/// What an argument means, for hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArgumentDescriptor {
    pub name: &'static str,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "type", skip_serializing_if = "Option::is_none")
    )]
    pub type_label: Option<&'static str>,
}

impl ArgumentDescriptor {
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            type_label: None,
        }
    }

    pub const fn typed(name: &'static str, type_label: &'static str) -> Self {
        Self {
            name,
            type_label: Some(type_label),
        }
    }
}

/// Argument descriptors: a fixed list, or a function of the argument index
/// for variadic functions
#[derive(Clone, Copy)]
pub enum Arguments {
    Fixed(&'static [ArgumentDescriptor]),
    Indexed(fn(usize) -> ArgumentDescriptor),
}

impl Arguments {
    /// Descriptor for the zero-based argument `index`
    pub fn get(&self, index: usize) -> Option<ArgumentDescriptor> {
        match self {
            Arguments::Fixed(list) => list.get(index).copied(),
            Arguments::Indexed(describe) => Some(describe(index)),
        }
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arguments::Fixed(list) => f.debug_tuple("Fixed").field(list).finish(),
            Arguments::Indexed(_) => f.debug_tuple("Indexed").finish(),
        }
    }
}

/// Function definition
#[derive(Debug)]
pub struct FunctionDef {
    /// Function name (lowercase, `""` for grouping)
    pub name: &'static str,
    pub arity: Arity,
    pub arguments: Arguments,
    pub description: &'static str,
    /// Replaces the generated `(arg, arg)` part of the overview
    pub overview: Option<&'static str>,
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Signature line such as `to_power(number, exponent)`
    pub fn overview(&self) -> String {
        if let Some(custom) = self.overview {
            return format!("{}{}", self.name, custom);
        }
        let names: Vec<&str> = match self.arguments {
            Arguments::Fixed(list) => list.iter().map(|a| a.name).collect(),
            Arguments::Indexed(describe) => vec![describe(0).name, describe(1).name, "..."],
        };
        format!("{}({})", self.name, names.join(", "))
    }
}

/// Function registry
pub struct FunctionCatalog {
    functions: AHashMap<&'static str, FunctionDef>,
}

/// Name of the identity function that parenthesised groups call
pub const GROUP: &str = "";

static BUILTIN: Lazy<FunctionCatalog> = Lazy::new(FunctionCatalog::new);

const NUMBER: ArgumentDescriptor = ArgumentDescriptor::named("number");

const DIVIDE_ARGS: &[ArgumentDescriptor] = &[
    ArgumentDescriptor::typed("top", "number"),
    ArgumentDescriptor::typed("bottom", "number"),
    ArgumentDescriptor::named("fallback (if dividing by 0)"),
];

const TO_POWER_ARGS: &[ArgumentDescriptor] =
    &[NUMBER, ArgumentDescriptor::typed("exponent", "number")];

const IF_ARGS: &[ArgumentDescriptor] = &[
    ArgumentDescriptor::typed("test", "true/false"),
    ArgumentDescriptor::named("value if true"),
    ArgumentDescriptor::named("value if false"),
];

impl FunctionCatalog {
    /// Create a new catalog with all built-in functions
    pub fn new() -> Self {
        let mut catalog = Self::empty();

        catalog.register_math_functions();
        catalog.register_logical_functions();
        catalog.register_text_functions();

        catalog
    }

    /// A catalog with no functions, for embedding custom sets
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Shared built-in catalog
    pub fn builtin() -> &'static FunctionCatalog {
        &BUILTIN
    }

    /// Look up a function by name (case-sensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Register a function, replacing any previous one with the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Function names users can type, sorted; grouping is excluded
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .functions
            .keys()
            .copied()
            .filter(|name| *name != GROUP)
            .collect();
        names.sort_unstable();
        names
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef {
            name: "add",
            arity: Arity::Variadic,
            arguments: Arguments::Indexed(|_| NUMBER),
            description: "arguments",
            overview: None,
            implementation: math::fn_add,
        });

        self.register(FunctionDef {
            name: "multiply",
            arity: Arity::Variadic,
            arguments: Arguments::Indexed(|_| NUMBER),
            description: "arguments",
            overview: None,
            implementation: math::fn_multiply,
        });

        self.register(FunctionDef {
            name: "divide",
            arity: Arity::Range { min: 2, max: 3 },
            arguments: Arguments::Fixed(DIVIDE_ARGS),
            description: "numbers given fallback",
            overview: None,
            implementation: math::fn_divide,
        });

        self.register(FunctionDef {
            name: "increment",
            arity: Arity::Fixed(1),
            arguments: Arguments::Fixed(&[NUMBER]),
            description: "add 1 to argument",
            overview: None,
            implementation: math::fn_increment,
        });

        self.register(FunctionDef {
            name: "decrement",
            arity: Arity::Fixed(1),
            arguments: Arguments::Fixed(&[NUMBER]),
            description: "subtract 1 from argument",
            overview: None,
            implementation: math::fn_decrement,
        });

        self.register(FunctionDef {
            name: "to_power",
            arity: Arity::Fixed(2),
            arguments: Arguments::Fixed(TO_POWER_ARGS),
            description: "raise a number to a power",
            overview: None,
            implementation: math::fn_to_power,
        });
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef {
            name: "if",
            arity: Arity::Fixed(3),
            arguments: Arguments::Fixed(IF_ARGS),
            description: "condition is true then this else that",
            overview: None,
            implementation: logical::fn_if,
        });

        self.register(FunctionDef {
            name: GROUP,
            arity: Arity::Fixed(1),
            arguments: Arguments::Fixed(&[]),
            description: "",
            overview: None,
            implementation: logical::fn_group,
        });
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef {
            name: "join",
            arity: Arity::Variadic,
            arguments: Arguments::Indexed(|index| {
                if index == 0 {
                    ArgumentDescriptor::typed("separator", "text")
                } else {
                    ArgumentDescriptor::named("text")
                }
            }),
            description: "text with a chosen separator",
            overview: None,
            implementation: text::fn_join,
        });
    }
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::new()
    }
}
