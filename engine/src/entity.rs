//! Entity definitions: the immutable shape of one logical table.

/// Prefix of the counter cache key holding a table's version watermark.
pub const VERSION_KEY_PREFIX: &str = "_DATA_VERSION_";

/// Default primary-key field name.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Default soft-delete flag field name.
pub const DEFAULT_DELETED_FIELD: &str = "deleted";

/// Default version field name used by [`EntityDef::with_version`].
pub const DEFAULT_VERSION_FIELD: &str = "version";

/// Quote a single identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Normalize a comma-separated projection into quoted identifiers.
///
/// Rules:
/// - A projection containing `(` is treated as an expression and kept verbatim
/// - Already quoted fields and `*` are kept as is
/// - Dotted names are quoted per segment (`t.name` becomes `` `t`.`name` ``)
/// - An empty projection selects everything
pub fn normalize_fields(fields: &str) -> String {
    if fields.contains('(') {
        return fields.to_string();
    }

    let normalized: Vec<String> = fields
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            if field.starts_with('`') || field == "*" {
                return field.to_string();
            }
            field
                .split('.')
                .map(|part| if part == "*" { part.to_string() } else { quote_ident(part) })
                .collect::<Vec<_>>()
                .join(".")
        })
        .collect();

    if normalized.is_empty() {
        "*".to_string()
    } else {
        normalized.join(",")
    }
}

/// The immutable definition of a logical table.
///
/// Created once at startup and shared read-only for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    table: String,
    id_field: String,
    deleted_field: String,
    version_field: String,
    default_fields: String,
}

impl EntityDef {
    /// Define a table without versioning.
    pub fn new(table: impl Into<String>, default_fields: &str) -> Self {
        Self::builder(table).default_fields(default_fields).build()
    }

    /// Define a table whose rows carry a `version` stamp.
    pub fn with_version(table: impl Into<String>, default_fields: &str) -> Self {
        Self::builder(table)
            .default_fields(default_fields)
            .version_field(DEFAULT_VERSION_FIELD)
            .build()
    }

    /// Start a definition with custom field names.
    pub fn builder(table: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            def: EntityDef {
                table: table.into(),
                id_field: DEFAULT_ID_FIELD.to_string(),
                deleted_field: DEFAULT_DELETED_FIELD.to_string(),
                version_field: String::new(),
                default_fields: "*".to_string(),
            },
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn deleted_field(&self) -> &str {
        &self.deleted_field
    }

    pub fn version_field(&self) -> &str {
        &self.version_field
    }

    /// The normalized default projection.
    pub fn default_fields(&self) -> &str {
        &self.default_fields
    }

    /// Whether deletes only flag rows instead of removing them.
    pub fn soft_delete(&self) -> bool {
        !self.deleted_field.is_empty()
    }

    /// Whether mutations stamp a version.
    pub fn versioned(&self) -> bool {
        !self.version_field.is_empty()
    }

    /// Counter cache key holding this table's watermark.
    pub fn version_key(&self) -> String {
        format!("{}{}", VERSION_KEY_PREFIX, self.table)
    }

    /// `` `deleted`=0 `` when soft delete is enabled.
    pub(crate) fn active_condition(&self) -> Option<String> {
        self.soft_delete()
            .then(|| format!("{}=0", quote_ident(&self.deleted_field)))
    }

    /// Query computing the highest version stored in the table.
    pub(crate) fn max_version_sql(&self) -> String {
        format!(
            "SELECT MAX({}) FROM {}",
            quote_ident(&self.version_field),
            quote_ident(&self.table)
        )
    }
}

/// Builder for [`EntityDef`] with non-default field names.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    def: EntityDef,
}

impl EntityBuilder {
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.def.id_field = name.into();
        self
    }

    /// Set the soft-delete field. An empty name disables soft delete.
    pub fn deleted_field(mut self, name: impl Into<String>) -> Self {
        self.def.deleted_field = name.into();
        self
    }

    /// Set the version field. An empty name disables versioning.
    pub fn version_field(mut self, name: impl Into<String>) -> Self {
        self.def.version_field = name.into();
        self
    }

    pub fn default_fields(mut self, fields: &str) -> Self {
        self.def.default_fields = normalize_fields(fields);
        self
    }

    pub fn build(self) -> EntityDef {
        self.def
    }
}
