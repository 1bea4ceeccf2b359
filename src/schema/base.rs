//! Base definitions for schema components
//!
//! Every parsed XSD construct carries an explicit [`ComponentKind`] tag;
//! construct classification is a field comparison, not a type-hierarchy
//! membership test. Per-kind attribute tables declare which attributes
//! are required, which are allowed, and what their defaults are.

use std::fmt;

/// The XSD construct a component was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// `<schema>` root
    Schema,
    /// `<import>`
    Import,
    /// `<include>`
    Include,
    /// `<notation>`
    Notation,
    /// Global or local `<attribute name>`
    AttributeDecl,
    /// `<attribute ref>`
    AttributeRef,
    /// `<attributeGroup name>`
    AttributeGroup,
    /// `<attributeGroup ref>`
    AttributeGroupRef,
    /// `<anyAttribute>`
    AnyAttribute,
    /// Global or local `<element name>`
    ElementDecl,
    /// `<element ref>`
    ElementRef,
    /// `<any>`
    AnyElement,
    /// `<sequence>`
    Sequence,
    /// `<choice>`
    Choice,
    /// `<all>`
    All,
    /// `<group name>`
    ModelGroupDef,
    /// `<group ref>`
    ModelGroupRef,
    /// `<complexType>`
    ComplexType,
    /// `<simpleType>`
    SimpleType,
    /// `<simpleContent>`
    SimpleContent,
    /// `<complexContent>`
    ComplexContent,
    /// `<extension>` inside simpleContent/complexContent
    Extension,
    /// `<restriction>` inside simpleType/simpleContent/complexContent
    Restriction,
    /// `<list>` inside simpleType
    List,
    /// `<union>` inside simpleType
    Union,
}

impl ComponentKind {
    /// True for named definitions entered into schema collections
    pub fn is_definition(self) -> bool {
        matches!(
            self,
            Self::ComplexType | Self::SimpleType | Self::AttributeGroup | Self::ModelGroupDef
        )
    }

    /// True for declarations (elements, attributes, notations)
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            Self::ElementDecl | Self::AttributeDecl | Self::Notation
        )
    }

    /// True for by-reference constructs
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            Self::ElementRef | Self::AttributeRef | Self::AttributeGroupRef | Self::ModelGroupRef
        )
    }

    /// True for content-model groups
    pub fn is_model_group(self) -> bool {
        matches!(
            self,
            Self::Sequence | Self::Choice | Self::All | Self::ModelGroupDef | Self::ModelGroupRef
        )
    }

    /// True for wildcards
    pub fn is_wildcard(self) -> bool {
        matches!(self, Self::AnyElement | Self::AnyAttribute)
    }

    /// Tag name this kind is parsed from
    pub fn tag(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Import => "import",
            Self::Include => "include",
            Self::Notation => "notation",
            Self::AttributeDecl | Self::AttributeRef => "attribute",
            Self::AttributeGroup | Self::AttributeGroupRef => "attributeGroup",
            Self::AnyAttribute => "anyAttribute",
            Self::ElementDecl | Self::ElementRef => "element",
            Self::AnyElement => "any",
            Self::Sequence => "sequence",
            Self::Choice => "choice",
            Self::All => "all",
            Self::ModelGroupDef | Self::ModelGroupRef => "group",
            Self::ComplexType => "complexType",
            Self::SimpleType => "simpleType",
            Self::SimpleContent => "simpleContent",
            Self::ComplexContent => "complexContent",
            Self::Extension => "extension",
            Self::Restriction => "restriction",
            Self::List => "list",
            Self::Union => "union",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Form default for elements and attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormDefault {
    /// Unqualified (default)
    #[default]
    Unqualified,
    /// Qualified
    Qualified,
}

impl FormDefault {
    /// Parse from an attribute value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }

    /// Check if qualified
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified)
    }
}

impl fmt::Display for FormDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qualified => write!(f, "qualified"),
            Self::Unqualified => write!(f, "unqualified"),
        }
    }
}

/// A constraining facet, carried as metadata only and never enforced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    /// Facet name (`pattern`, `enumeration`, ...)
    pub name: String,
    /// The facet's `value` attribute
    pub value: Option<String>,
}

/// Facet tag names accepted inside a restriction
pub const FACET_NAMES: &[&str] = &[
    "enumeration",
    "length",
    "maxExclusive",
    "maxInclusive",
    "maxLength",
    "minExclusive",
    "minInclusive",
    "minLength",
    "pattern",
    "fractionDigits",
    "totalDigits",
    "whiteSpace",
];

/// Default value for an unset attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDefault {
    /// Fixed literal
    Static(&'static str),
    /// Nearest enclosing schema's `attributeFormDefault`
    AttributeFormDefault,
    /// Nearest enclosing schema's `elementFormDefault`
    ElementFormDefault,
    /// Nearest enclosing schema's `blockDefault`
    BlockDefault,
    /// Nearest enclosing schema's `finalDefault`
    FinalDefault,
}

/// Per-kind attribute table: what is required, what is known, what
/// defaults apply when unset
#[derive(Debug)]
pub struct AttrSpec {
    /// Attributes that must be present
    pub required: &'static [&'static str],
    /// All attributes the construct accepts (unknown ones are errors)
    pub allowed: &'static [&'static str],
    /// Defaults applied after structural parsing
    pub defaults: &'static [(&'static str, AttrDefault)],
}

/// Attribute table for a construct kind
pub fn attr_spec(kind: ComponentKind) -> &'static AttrSpec {
    use AttrDefault::*;
    use ComponentKind as K;
    match kind {
        K::Schema => &AttrSpec {
            required: &[],
            allowed: &[
                "id",
                "version",
                "targetNamespace",
                "attributeFormDefault",
                "elementFormDefault",
                "blockDefault",
                "finalDefault",
            ],
            defaults: &[
                ("attributeFormDefault", Static("unqualified")),
                ("elementFormDefault", Static("unqualified")),
            ],
        },
        K::Import => &AttrSpec {
            required: &[],
            allowed: &["id", "namespace", "schemaLocation"],
            defaults: &[],
        },
        K::Include => &AttrSpec {
            required: &["schemaLocation"],
            allowed: &["id", "schemaLocation"],
            defaults: &[],
        },
        K::Notation => &AttrSpec {
            required: &["name", "public"],
            allowed: &["id", "name", "public", "system"],
            defaults: &[],
        },
        K::AttributeDecl => &AttrSpec {
            required: &["name"],
            allowed: &["id", "name", "type", "form", "use", "default", "fixed"],
            defaults: &[("use", Static("optional")), ("form", AttributeFormDefault)],
        },
        K::AttributeRef => &AttrSpec {
            required: &["ref"],
            allowed: &["id", "ref", "use", "default", "fixed"],
            defaults: &[("use", Static("optional"))],
        },
        K::AttributeGroup => &AttrSpec {
            required: &["name"],
            allowed: &["id", "name"],
            defaults: &[],
        },
        K::AttributeGroupRef => &AttrSpec {
            required: &["ref"],
            allowed: &["id", "ref"],
            defaults: &[],
        },
        K::AnyAttribute => &AttrSpec {
            required: &[],
            allowed: &["id", "namespace", "processContents"],
            defaults: &[
                ("namespace", Static("##any")),
                ("processContents", Static("strict")),
            ],
        },
        K::ElementDecl => &AttrSpec {
            required: &["name"],
            allowed: &[
                "id",
                "name",
                "type",
                "form",
                "minOccurs",
                "maxOccurs",
                "default",
                "fixed",
                "nillable",
                "abstract",
                "substitutionGroup",
                "block",
                "final",
            ],
            defaults: &[
                ("minOccurs", Static("1")),
                ("maxOccurs", Static("1")),
                ("nillable", Static("false")),
                ("abstract", Static("false")),
                ("form", ElementFormDefault),
                ("block", BlockDefault),
                ("final", FinalDefault),
            ],
        },
        K::ElementRef => &AttrSpec {
            required: &["ref"],
            allowed: &["id", "ref", "minOccurs", "maxOccurs"],
            defaults: &[("minOccurs", Static("1")), ("maxOccurs", Static("1"))],
        },
        K::AnyElement => &AttrSpec {
            required: &[],
            allowed: &["id", "minOccurs", "maxOccurs", "namespace", "processContents"],
            defaults: &[
                ("minOccurs", Static("1")),
                ("maxOccurs", Static("1")),
                ("namespace", Static("##any")),
                ("processContents", Static("strict")),
            ],
        },
        K::Sequence | K::Choice => &AttrSpec {
            required: &[],
            allowed: &["id", "minOccurs", "maxOccurs"],
            defaults: &[("minOccurs", Static("1")), ("maxOccurs", Static("1"))],
        },
        K::All => &AttrSpec {
            required: &[],
            allowed: &["id", "minOccurs", "maxOccurs"],
            defaults: &[("minOccurs", Static("1")), ("maxOccurs", Static("1"))],
        },
        K::ModelGroupDef => &AttrSpec {
            required: &["name"],
            allowed: &["id", "name"],
            defaults: &[],
        },
        K::ModelGroupRef => &AttrSpec {
            required: &["ref"],
            allowed: &["id", "ref", "minOccurs", "maxOccurs"],
            defaults: &[("minOccurs", Static("1")), ("maxOccurs", Static("1"))],
        },
        K::ComplexType => &AttrSpec {
            required: &[],
            allowed: &["id", "name", "mixed", "abstract", "block", "final"],
            defaults: &[
                ("mixed", Static("false")),
                ("abstract", Static("false")),
                ("block", BlockDefault),
                ("final", FinalDefault),
            ],
        },
        K::SimpleType => &AttrSpec {
            required: &[],
            allowed: &["id", "name", "final"],
            defaults: &[("final", FinalDefault)],
        },
        K::SimpleContent | K::ComplexContent => &AttrSpec {
            required: &[],
            allowed: &["id", "mixed"],
            defaults: &[],
        },
        K::Extension => &AttrSpec {
            required: &["base"],
            allowed: &["id", "base"],
            defaults: &[],
        },
        K::Restriction => &AttrSpec {
            required: &[],
            allowed: &["id", "base"],
            defaults: &[],
        },
        K::List => &AttrSpec {
            required: &[],
            allowed: &["id", "itemType"],
            defaults: &[],
        },
        K::Union => &AttrSpec {
            required: &[],
            allowed: &["id", "memberTypes"],
            defaults: &[],
        },
    }
}

/// Attribute names whose values are QNames to resolve into descriptors
pub const QNAME_ATTRIBUTES: &[&str] = &[
    "type",
    "element",
    "base",
    "ref",
    "substitutionGroup",
    "itemType",
];
