//! Error types.
//!
//! [`HierarchyError`] is a composition-time failure: the declared hierarchy is
//! unusable and must be fixed before any tagged object exists. [`BadCast`] is
//! the only error a query can produce, and only from the checked reference
//! cast.

/// A hierarchy that can not be allocated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    /// The tag of `name` needs more bits than the hierarchy's width.
    #[error(
        "tag overflow in hierarchy `{root}`: `{name}` needs {needed} bits but tags are {width} bits wide"
    )]
    Overflow {
        root: String,
        name: String,
        width: u32,
        needed: u32,
    },

    /// The declarations do not describe a forest.
    #[error("malformed hierarchy: {0}")]
    Malformed(#[from] Malformed),
}

impl HierarchyError {
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// The ways a set of declarations fails to be a single-rooted tree.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    #[error("no root type (every type names a parent)")]
    NoRoot,

    #[error("more than one root type: `{first}` and `{second}`")]
    MultipleRoots { first: String, second: String },

    #[error("empty type name")]
    EmptyName,

    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),

    #[error("a hierarchy rooted at `{0}` is already registered")]
    DuplicateRoot(String),

    #[error("`{parent}` lists `{child}` as a child more than once")]
    DuplicateChild { parent: String, child: String },

    #[error("`{referenced_by}` refers to undeclared type `{name}`")]
    UnknownType { name: String, referenced_by: String },

    #[error("`{child}` names `{parent}` as parent, but `{parent}` does not list it as a child")]
    NotListedByParent { child: String, parent: String },

    #[error("`{parent}` lists `{child}` as a child, but `{child}` does not name it as parent")]
    ParentMismatch { child: String, parent: String },

    #[error("`{0}` is not reachable from the root (cycle in parent links)")]
    Cycle(String),

    #[error("tag width {0} is not in 1..=64")]
    InvalidWidth(u32),
}

/// A checked reference cast whose target is not an ancestor-or-self of the
/// object's dynamic type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("bad cast from `{from}` to `{to}`: tag {actual:#b} does not descend from {target:#b}")]
pub struct BadCast {
    /// Static type of the reference that was cast.
    pub from: &'static str,
    /// Requested target type.
    pub to: &'static str,
    /// Tag found in the object.
    pub actual: u64,
    /// Tag of the target type.
    pub target: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_message_names_type_and_width() {
        let err = HierarchyError::Overflow {
            root: "A".into(),
            name: "N".into(),
            width: 8,
            needed: 11,
        };
        let msg = err.to_string();
        assert!(msg.contains("`N`"));
        assert!(msg.contains("11 bits"));
        assert!(msg.contains("8 bits wide"));
        assert!(err.is_overflow());
        assert!(!err.is_malformed());
    }

    #[test]
    fn malformed_converts_into_hierarchy_error() {
        let err: HierarchyError = Malformed::Cycle("X".into()).into();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("`X`"));
    }

    #[test]
    fn bad_cast_message_shows_tags_in_binary() {
        let err = BadCast {
            from: "A",
            to: "C",
            actual: 0b1001101,
            target: 0b111,
        };
        assert_eq!(
            err.to_string(),
            "bad cast from `A` to `C`: tag 0b1001101 does not descend from 0b111"
        );
    }
}
