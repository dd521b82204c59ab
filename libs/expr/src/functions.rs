//! Function registry
//!
//! The closed allow-list of callable functions. Uses a compile-time perfect
//! hash map (phf) for O(1) name lookups with zero runtime allocation; the
//! analyzer resolves every call against this registry before evaluation, so
//! nothing outside it is ever reachable from an expression.

use phf::phf_map;

/// Function metadata
#[derive(Debug, Clone, Copy)]
pub struct FunctionMeta {
    pub id: u16,
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
}

macro_rules! meta {
    ($id:expr, $name:expr, $min:expr, $max:expr) => {
        FunctionMeta {
            id: $id,
            name: $name,
            min_args: $min,
            max_args: $max,
        }
    };
}

// Function ids, grouped by concern
pub const FN_ABS: u16 = 0;
pub const FN_ALL: u16 = 1;
pub const FN_ANY: u16 = 2;
pub const FN_LEN: u16 = 3;
pub const FN_MAX: u16 = 4;
pub const FN_MIN: u16 = 5;
pub const FN_ROUND: u16 = 6;
pub const FN_SUM: u16 = 7;
pub const FN_SORTED: u16 = 8;

pub const FN_ENUMERATE: u16 = 20;
pub const FN_FILTER: u16 = 21;
pub const FN_MAP: u16 = 22;
pub const FN_RANGE: u16 = 23;
pub const FN_REVERSED: u16 = 24;
pub const FN_ZIP: u16 = 25;

pub const FN_BOOL: u16 = 40;
pub const FN_DICT: u16 = 41;
pub const FN_FLOAT: u16 = 42;
pub const FN_INT: u16 = 43;
pub const FN_LIST: u16 = 44;
pub const FN_SET: u16 = 45;
pub const FN_STR: u16 = 46;
pub const FN_TUPLE: u16 = 47;
pub const FN_CHR: u16 = 48;
pub const FN_ORD: u16 = 49;

pub const FN_WITHOUT_NA: u16 = 60;
pub const FN_REPLACE_NA: u16 = 61;
pub const FN_IS_NA: u16 = 62;

pub const FN_IS_HET: u16 = 70;
pub const FN_IS_HOM: u16 = 71;
pub const FN_ANY_REF: u16 = 72;
pub const FN_ANY_VAR: u16 = 73;

pub const FN_FOR_EACH_SAMPLE: u16 = 80;
pub const FN_ASC: u16 = 81;
pub const FN_DESC: u16 = 82;

/// Static compile-time function registry using perfect hash map
static FUNCTIONS_BY_NAME: phf::Map<&'static str, FunctionMeta> = phf_map! {
    // Aggregates
    "abs" => meta!(FN_ABS, "abs", 1, Some(1)),
    "all" => meta!(FN_ALL, "all", 1, Some(1)),
    "any" => meta!(FN_ANY, "any", 1, Some(1)),
    "len" => meta!(FN_LEN, "len", 1, Some(1)),
    "max" => meta!(FN_MAX, "max", 1, None),
    "min" => meta!(FN_MIN, "min", 1, None),
    "round" => meta!(FN_ROUND, "round", 1, Some(2)),
    "sum" => meta!(FN_SUM, "sum", 1, Some(2)),
    "sorted" => meta!(FN_SORTED, "sorted", 1, Some(2)),

    // Iterator helpers
    "enumerate" => meta!(FN_ENUMERATE, "enumerate", 1, Some(2)),
    "filter" => meta!(FN_FILTER, "filter", 2, Some(2)),
    "map" => meta!(FN_MAP, "map", 2, None),
    "range" => meta!(FN_RANGE, "range", 1, Some(3)),
    "reversed" => meta!(FN_REVERSED, "reversed", 1, Some(1)),
    "zip" => meta!(FN_ZIP, "zip", 1, None),

    // Constructors
    "bool" => meta!(FN_BOOL, "bool", 1, Some(1)),
    "dict" => meta!(FN_DICT, "dict", 0, Some(1)),
    "float" => meta!(FN_FLOAT, "float", 1, Some(1)),
    "int" => meta!(FN_INT, "int", 1, Some(1)),
    "list" => meta!(FN_LIST, "list", 0, Some(1)),
    "set" => meta!(FN_SET, "set", 0, Some(1)),
    "str" => meta!(FN_STR, "str", 1, Some(1)),
    "tuple" => meta!(FN_TUPLE, "tuple", 0, Some(1)),
    "chr" => meta!(FN_CHR, "chr", 1, Some(1)),
    "ord" => meta!(FN_ORD, "ord", 1, Some(1)),

    // Missing-data helpers
    "without_na" => meta!(FN_WITHOUT_NA, "without_na", 1, Some(1)),
    "replace_na" => meta!(FN_REPLACE_NA, "replace_na", 2, Some(2)),
    "is_na" => meta!(FN_IS_NA, "is_na", 1, Some(1)),

    // Genotype predicates (sample by name or index)
    "is_het" => meta!(FN_IS_HET, "is_het", 1, Some(1)),
    "is_hom" => meta!(FN_IS_HOM, "is_hom", 1, Some(1)),
    "any_ref" => meta!(FN_ANY_REF, "any_ref", 1, Some(1)),
    "any_var" => meta!(FN_ANY_VAR, "any_var", 1, Some(1)),

    // Projection broadcast and sort direction markers
    "for_each_sample" => meta!(FN_FOR_EACH_SAMPLE, "for_each_sample", 1, Some(1)),
    "asc" => meta!(FN_ASC, "asc", 1, Some(1)),
    "desc" => meta!(FN_DESC, "desc", 1, Some(1)),
};

/// Look up a function by name.
pub fn function(name: &str) -> Option<&'static FunctionMeta> {
    FUNCTIONS_BY_NAME.get(name)
}

/// Namespace member: name, min args, max args (`None` = unbounded).
/// A `min_args` of `usize::MAX` marks a constant (attribute, not callable).
pub type NamespaceMember = (&'static str, usize, Option<usize>);

const CONSTANT: usize = usize::MAX;

/// The `math` namespace
pub static MATH_MEMBERS: &[NamespaceMember] = &[
    ("sqrt", 1, Some(1)),
    ("log", 1, Some(2)),
    ("log2", 1, Some(1)),
    ("log10", 1, Some(1)),
    ("exp", 1, Some(1)),
    ("floor", 1, Some(1)),
    ("ceil", 1, Some(1)),
    ("pow", 2, Some(2)),
    ("fabs", 1, Some(1)),
    ("isnan", 1, Some(1)),
    ("isinf", 1, Some(1)),
    ("pi", CONSTANT, None),
    ("e", CONSTANT, None),
    ("tau", CONSTANT, None),
    ("inf", CONSTANT, None),
    ("nan", CONSTANT, None),
];

/// The `statistics` namespace
pub static STATISTICS_MEMBERS: &[NamespaceMember] = &[
    ("mean", 1, Some(1)),
    ("median", 1, Some(1)),
    ("stdev", 1, Some(1)),
    ("variance", 1, Some(1)),
];

/// The `re` namespace
pub static RE_MEMBERS: &[NamespaceMember] = &[
    ("search", 2, Some(2)),
    ("match", 2, Some(2)),
    ("fullmatch", 2, Some(2)),
    ("findall", 2, Some(2)),
    ("sub", 3, Some(4)),
    ("split", 2, Some(3)),
];

/// Member table for a namespace identifier, if it is one.
pub fn namespace(name: &str) -> Option<&'static [NamespaceMember]> {
    match name {
        "math" => Some(MATH_MEMBERS),
        "statistics" => Some(STATISTICS_MEMBERS),
        "re" => Some(RE_MEMBERS),
        _ => None,
    }
}

/// Whether a namespace member is a constant rather than a callable.
pub fn is_namespace_constant(member: &NamespaceMember) -> bool {
    member.1 == CONSTANT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_closed() {
        assert!(function("max").is_some());
        assert!(function("eval").is_none());
        assert!(function("open").is_none());
        assert!(function("__import__").is_none());
    }

    #[test]
    fn namespaces_resolve_members() {
        assert!(namespace("math").unwrap().iter().any(|m| m.0 == "sqrt"));
        assert!(namespace("re").unwrap().iter().any(|m| m.0 == "search"));
        assert!(namespace("os").is_none());
    }
}
