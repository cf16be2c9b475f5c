//! Field - Representation-independent description of one configuration attribute

/// Value shape of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    Map,
    /// Collection of scalars
    Collection,
    /// Nested block, single or repeated
    Object,
}

/// Whether and how a field is emitted into a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    /// Always emitted, rendering fails when the value is missing
    RequiredAlways,
    /// Emitted only when the value is supplied
    OptionalPresent,
    /// Never emitted (computed-only)
    Omitted,
}

impl Presence {
    /// Optional wins over computed. A field with no flags at all is treated as optional.
    pub fn from_flags(required: bool, optional: bool, computed: bool) -> Self {
        if required {
            Presence::RequiredAlways
        } else if optional || !computed {
            Presence::OptionalPresent
        } else {
            Presence::Omitted
        }
    }
}

/// One attribute of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    required: bool,
    optional: bool,
    computed: bool,
    kind: FieldKind,
    is_collection: bool,
    is_set: bool,
    nested_fields: Vec<Field>,
    presence: Presence,
}

impl Field {
    /// A field that carries no nested fields. `Object` kinds are only built
    /// through [`Field::object`].
    pub(crate) fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            required: false,
            optional: true,
            computed: false,
            kind,
            is_collection: kind == FieldKind::Collection,
            is_set: false,
            nested_fields: Vec::new(),
            presence: Presence::OptionalPresent,
        }
    }

    /// A scalar, map or scalar-collection field. Returns `None` for
    /// [`FieldKind::Object`], which needs nested fields.
    pub fn leaf(name: impl Into<String>, kind: FieldKind) -> Option<Self> {
        (kind != FieldKind::Object).then(|| Field::new(name, kind))
    }

    /// A nested block. Returns `None` when there is nothing to nest, since
    /// an object without nested fields cannot be emitted.
    pub fn object(name: impl Into<String>, nested_fields: Vec<Field>) -> Option<Self> {
        if nested_fields.is_empty() {
            return None;
        }
        Some(Field {
            nested_fields: sort_by_name(nested_fields),
            ..Field::new(name, FieldKind::Object)
        })
    }

    /// Mark the field as a collection (list or set)
    pub fn collection(mut self, is_set: bool) -> Self {
        self.is_collection = true;
        self.is_set = is_set;
        self
    }

    pub fn with_flags(mut self, required: bool, optional: bool, computed: bool) -> Self {
        self.required = required;
        self.optional = optional;
        self.computed = computed;
        self.presence = Presence::from_flags(required, optional, computed);
        self
    }

    pub fn required(self) -> Self {
        self.with_flags(true, false, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    pub fn is_map(&self) -> bool {
        self.kind == FieldKind::Map
    }

    pub fn is_object(&self) -> bool {
        self.kind == FieldKind::Object
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    /// Repeated nested block with set semantics
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    pub fn nested_fields(&self) -> &[Field] {
        &self.nested_fields
    }
}

/// Sort fields by name
pub fn sort_by_name(mut fields: Vec<Field>) -> Vec<Field> {
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    fields
}

/// Emission order: required fields before the rest, each group by name
pub fn emission_order(fields: &[Field]) -> Vec<&Field> {
    let mut ordered: Vec<&Field> = fields
        .iter()
        .filter(|f| f.presence != Presence::Omitted)
        .collect();
    ordered.sort_by(|a, b| {
        let rank = |f: &Field| f.presence != Presence::RequiredAlways;
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });
    ordered
}
