//! Lock names derived from entity identities.
//!
//! An entity is identified by its ancestor chain, root first: a comment on a
//! post on a blog is `Blog:7 / Post:"k3Xa" / Comment:12`. Flattening the chain
//! with a separator gives a stable lock name, `Blog:7:Post:k3Xa:Comment:12`.

use std::fmt;

use crate::error::{LockError, LockResult};

/// Separator used by [`derive_default_name`].
pub const DEFAULT_SEPARATOR: &str = ":";

/// Identifier of a single entity within its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// Generated or caller-chosen string key.
    Token(String),
    /// Integer key.
    Numeric(i64),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => f.write_str(token),
            Self::Numeric(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self::Numeric(i64::from(id))
    }
}

impl From<String> for EntityId {
    fn from(token: String) -> Self {
        Self::Token(token)
    }
}

impl From<&str> for EntityId {
    fn from(token: &str) -> Self {
        Self::Token(token.to_string())
    }
}

/// One `(type, id)` link of an identity path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    kind: String,
    id: Option<EntityId>,
}

impl PathElement {
    /// Creates an element for an entity of type `kind` with identifier `id`.
    pub fn new(kind: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    /// Creates an element whose identifier has not been assigned yet.
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Entity type name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Entity identifier, if assigned.
    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }
}

/// Ordered ancestor chain identifying an entity, root first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct IdentityPath {
    elements: Vec<PathElement>,
}

impl IdentityPath {
    /// Creates a path from its elements, root first.
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// Creates a single-element path for a root entity.
    pub fn root(kind: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self::new(vec![PathElement::new(kind, id)])
    }

    /// Returns the path of a child entity of this one.
    pub fn child(&self, kind: impl Into<String>, id: impl Into<EntityId>) -> Self {
        let mut elements = self.elements.clone();
        elements.push(PathElement::new(kind, id));
        Self { elements }
    }

    /// Returns the path of the parent entity, or `None` for a root.
    pub fn parent(&self) -> Option<Self> {
        match self.elements.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Self::new(rest.to_vec())),
            _ => None,
        }
    }

    /// The entity this path identifies.
    pub fn leaf(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Number of elements in the chain.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the path has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements, root first.
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Iterates over the elements, root first.
    pub fn iter(&self) -> std::slice::Iter<'_, PathElement> {
        self.elements.iter()
    }
}

impl FromIterator<PathElement> for IdentityPath {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a IdentityPath {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Domain types that can be locked by identity.
///
/// # Example
///
/// ```rust
/// use ephemeral_lock_core::{Identifiable, IdentityPath, derive_default_name};
///
/// struct Order {
///     customer: String,
///     number: i64,
/// }
///
/// impl Identifiable for Order {
///     fn identity_path(&self) -> IdentityPath {
///         IdentityPath::root("Customer", self.customer.as_str()).child("Order", self.number)
///     }
/// }
///
/// let order = Order { customer: "c8Hq".to_string(), number: 42 };
/// assert_eq!(
///     derive_default_name(&order.identity_path()).unwrap(),
///     "Customer:c8Hq:Order:42"
/// );
/// ```
pub trait Identifiable {
    /// Ancestor chain of this entity, root first.
    fn identity_path(&self) -> IdentityPath;
}

impl Identifiable for IdentityPath {
    fn identity_path(&self) -> IdentityPath {
        self.clone()
    }
}

impl<T: Identifiable + ?Sized> Identifiable for &T {
    fn identity_path(&self) -> IdentityPath {
        (**self).identity_path()
    }
}

/// Flattens an identity path into a lock name.
///
/// Type names and identifiers are interleaved, root first, and joined with
/// `separator`. Tokens are used verbatim; numeric ids are written in base 10.
///
/// # Errors
///
/// Returns [`LockError::InvalidIdentity`] when the path is empty, the
/// separator is empty, a type name is empty or contains the separator, or an
/// element has no usable identifier (missing, empty token, negative number).
pub fn derive_name(path: &IdentityPath, separator: &str) -> LockResult<String> {
    if separator.is_empty() {
        return Err(LockError::InvalidIdentity(
            "separator cannot be empty".to_string(),
        ));
    }
    if path.is_empty() {
        return Err(LockError::InvalidIdentity(
            "identity path cannot be empty".to_string(),
        ));
    }

    let mut parts = Vec::with_capacity(path.len() * 2);
    for (position, element) in path.iter().enumerate() {
        if element.kind.is_empty() {
            return Err(LockError::InvalidIdentity(format!(
                "element {position} has an empty type name"
            )));
        }
        if element.kind.contains(separator) {
            return Err(LockError::InvalidIdentity(format!(
                "type name {:?} contains the separator {separator:?}",
                element.kind
            )));
        }
        let id = match &element.id {
            None => {
                return Err(LockError::InvalidIdentity(format!(
                    "{} at position {position} has no identifier",
                    element.kind
                )));
            }
            Some(EntityId::Token(token)) if token.is_empty() => {
                return Err(LockError::InvalidIdentity(format!(
                    "{} at position {position} has an empty token id",
                    element.kind
                )));
            }
            Some(EntityId::Numeric(id)) if *id < 0 => {
                return Err(LockError::InvalidIdentity(format!(
                    "{} at position {position} has a negative id {id}",
                    element.kind
                )));
            }
            Some(id) => id.to_string(),
        };
        parts.push(element.kind.clone());
        parts.push(id);
    }

    Ok(parts.join(separator))
}

/// [`derive_name`] with the default `:` separator.
pub fn derive_default_name(path: &IdentityPath) -> LockResult<String> {
    derive_name(path, DEFAULT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_path() -> IdentityPath {
        IdentityPath::root("Blog", 7i64)
            .child("Post", "k3Xa")
            .child("Comment", 12i64)
    }

    #[test]
    fn test_flattens_root_first() {
        assert_eq!(
            derive_default_name(&comment_path()).unwrap(),
            "Blog:7:Post:k3Xa:Comment:12"
        );
    }

    #[test]
    fn test_custom_separator() {
        assert_eq!(
            derive_name(&comment_path(), "/").unwrap(),
            "Blog/7/Post/k3Xa/Comment/12"
        );
    }

    #[test]
    fn test_deterministic() {
        let path = comment_path();
        let first = derive_default_name(&path).unwrap();
        for _ in 0..10 {
            assert_eq!(derive_default_name(&path.clone()).unwrap(), first);
        }
    }

    #[test]
    fn test_order_matters() {
        let a = IdentityPath::root("Blog", 1i64).child("Post", 2i64);
        let b = IdentityPath::root("Post", 2i64).child("Blog", 1i64);
        assert_ne!(derive_default_name(&a).unwrap(), derive_default_name(&b).unwrap());
    }

    #[test]
    fn test_numeric_ids_have_no_leading_zeros() {
        let path = IdentityPath::root("Order", 42i64);
        assert_eq!(derive_default_name(&path).unwrap(), "Order:42");
        let zero = IdentityPath::root("Order", 0i64);
        assert_eq!(derive_default_name(&zero).unwrap(), "Order:0");
    }

    #[test]
    fn test_token_and_number_render_alike() {
        // Distinct ids of different types may collide; callers keep them disjoint.
        let numeric = IdentityPath::root("Order", 42i64);
        let token = IdentityPath::root("Order", "42");
        assert_eq!(
            derive_default_name(&numeric).unwrap(),
            derive_default_name(&token).unwrap()
        );
    }

    #[test]
    fn test_empty_path_rejected() {
        let result = derive_default_name(&IdentityPath::default());
        assert!(matches!(result, Err(LockError::InvalidIdentity(_))));
    }

    #[test]
    fn test_missing_id_rejected() {
        let path = IdentityPath::new(vec![
            PathElement::new("Blog", 7i64),
            PathElement::incomplete("Post"),
        ]);
        let result = derive_default_name(&path);
        assert!(matches!(result, Err(LockError::InvalidIdentity(msg)) if msg.contains("Post")));
    }

    #[test]
    fn test_invalid_components_rejected() {
        let cases = [
            IdentityPath::root("", 1i64),
            IdentityPath::root("Bad:Kind", 1i64),
            IdentityPath::root("Order", ""),
            IdentityPath::root("Order", -3i64),
        ];
        for path in cases {
            assert!(
                matches!(derive_default_name(&path), Err(LockError::InvalidIdentity(_))),
                "{path:?} should be rejected"
            );
        }
        assert!(matches!(
            derive_name(&comment_path(), ""),
            Err(LockError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_parent_and_leaf() {
        let path = comment_path();
        assert_eq!(path.len(), 3);
        assert_eq!(path.leaf().unwrap().kind(), "Comment");
        assert_eq!(path.leaf().unwrap().id(), Some(&EntityId::Numeric(12)));

        let parent = path.parent().unwrap();
        assert_eq!(derive_default_name(&parent).unwrap(), "Blog:7:Post:k3Xa");
        assert!(IdentityPath::root("Blog", 7i64).parent().is_none());
    }

    #[test]
    fn test_collect_from_elements() {
        let path: IdentityPath = [PathElement::new("A", 1i64), PathElement::new("B", "x")]
            .into_iter()
            .collect();
        assert_eq!(derive_default_name(&path).unwrap(), "A:1:B:x");
        assert_eq!((&path).into_iter().count(), 2);
    }
}
