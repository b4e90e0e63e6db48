//! Entity types, attributes and foreign keys.
//!
//! All three are plain identifiers that can be declared as constants:
//!
//! ```rust
//! use entisql_domain::{Attribute, EntityType, ForeignKey, Reference};
//!
//! const DEPARTMENT: EntityType = EntityType::new("dept");
//! const DEPARTMENT_ID: Attribute = Attribute::new(DEPARTMENT, "deptno");
//!
//! const EMPLOYEE: EntityType = EntityType::new("emp");
//! const EMPLOYEE_DEPARTMENT: Attribute = Attribute::new(EMPLOYEE, "deptno");
//! const EMPLOYEE_DEPARTMENT_REFS: &[Reference] =
//!     &[Reference::new(EMPLOYEE_DEPARTMENT, DEPARTMENT_ID)];
//! const EMPLOYEE_DEPARTMENT_FK: ForeignKey =
//!     ForeignKey::new(EMPLOYEE, "dept_fk", DEPARTMENT, EMPLOYEE_DEPARTMENT_REFS);
//!
//! assert_eq!(EMPLOYEE_DEPARTMENT_FK.referenced_type(), &DEPARTMENT);
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifies an entity type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityType(Cow<'static, str>);

impl EntityType {
    /// Creates an entity type from a static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates an entity type from an owned name.
    #[must_use]
    pub fn owned(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityType({})", self.0)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies an attribute of an entity type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attribute {
    entity_type: EntityType,
    name: Cow<'static, str>,
}

impl Attribute {
    /// Creates an attribute with a static name.
    #[must_use]
    pub const fn new(entity_type: EntityType, name: &'static str) -> Self {
        Self {
            entity_type,
            name: Cow::Borrowed(name),
        }
    }

    /// Creates an attribute with an owned name.
    #[must_use]
    pub fn owned(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            entity_type,
            name: Cow::Owned(name.into()),
        }
    }

    /// Returns the entity type owning this attribute.
    #[must_use]
    pub const fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Returns the attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({}.{})", self.entity_type, self.name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity_type, self.name)
    }
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The referencing column.
    pub column: Attribute,
    /// The referenced column, part of the referenced primary key.
    pub referenced: Attribute,
}

impl Reference {
    /// Creates a reference from `column` to `referenced`.
    #[must_use]
    pub const fn new(column: Attribute, referenced: Attribute) -> Self {
        Self { column, referenced }
    }
}

/// A foreign key: an attribute holding a referenced entity, backed by one
/// or more referencing columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    attribute: Attribute,
    referenced_type: EntityType,
    references: Cow<'static, [Reference]>,
}

impl ForeignKey {
    /// Creates a foreign key from static references.
    #[must_use]
    pub const fn new(
        entity_type: EntityType,
        name: &'static str,
        referenced_type: EntityType,
        references: &'static [Reference],
    ) -> Self {
        Self {
            attribute: Attribute::new(entity_type, name),
            referenced_type,
            references: Cow::Borrowed(references),
        }
    }

    /// Creates a foreign key from owned references.
    #[must_use]
    pub fn owned(
        entity_type: EntityType,
        name: impl Into<String>,
        referenced_type: EntityType,
        references: Vec<Reference>,
    ) -> Self {
        Self {
            attribute: Attribute::owned(entity_type, name),
            referenced_type,
            references: Cow::Owned(references),
        }
    }

    /// Returns the attribute holding the referenced entity.
    #[must_use]
    pub const fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Returns the referencing entity type.
    #[must_use]
    pub const fn entity_type(&self) -> &EntityType {
        self.attribute.entity_type()
    }

    /// Returns the referenced entity type.
    #[must_use]
    pub const fn referenced_type(&self) -> &EntityType {
        &self.referenced_type
    }

    /// Returns the column pairs, in referenced key order.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Returns true if the key spans more than one column.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.references.len() > 1
    }

    /// Returns the reference for a referencing column.
    #[must_use]
    pub fn reference(&self, column: &Attribute) -> Option<&Reference> {
        self.references.iter().find(|r| &r.column == column)
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.attribute, f)
    }
}
