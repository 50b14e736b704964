//! Formatter contracts and selection.
//!
//! A format is either **immediate**, rendering rows the pipeline already
//! fetched and formatted, or **deferred**, receiving the compiled queries
//! and deciding itself how to fetch them (usually by handing a URL to a
//! client-side widget).
//!
//! [`FormatRegistry::select`] resolves a requested name in three steps:
//!
//! 1. exact match among built-in and registered formats,
//! 2. the [`ExternalFormatResolver`] hook, if one is installed,
//! 3. a heuristic: `table` for more than one displayed field, else `list`.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use indexmap::IndexMap;
use quarry_common::{FormatError, RenderConfig};
use quarry_sql::compiler::CompiledQuery;
use quarry_sql::executor::RowSet;
use quarry_sql::params::DisplayParams;
use quarry_sql::schema::{FieldDescriptions, FieldType};

use crate::formats::{
    CategoryFormat, CsvFormat, ListFormat, ListStyle, MapFormat, MapService, TableFormat,
    TimelineFormat,
};

/// A format that renders already executed rows.
pub trait ImmediateFormat: Send + Sync {
    /// Format name.
    fn name(&self) -> &str;

    /// Parameters that only make sense once per display. Giving one of
    /// them per query in a compound query is a conflict.
    fn scalar_only_parameters(&self) -> &[&str] {
        &[]
    }

    /// Renders `formatted` rows; `raw` holds the same rows unformatted.
    fn render(
        &self,
        raw: &RowSet,
        formatted: &RowSet,
        fields: &FieldDescriptions,
        params: &DisplayParams,
    ) -> Result<String, FormatError>;
}

/// A format that runs its queries itself.
pub trait DeferredFormat: Send + Sync {
    /// Format name.
    fn name(&self) -> &str;

    /// Renders compiled, not yet executed, queries.
    fn render_by_self_query(
        &self,
        queries: &[CompiledQuery],
        params: &DisplayParams,
        per_query_params: &[DisplayParams],
    ) -> Result<String, FormatError>;
}

/// A selected formatter.
pub enum Formatter {
    /// Renders pre-fetched rows.
    Immediate(Box<dyn ImmediateFormat>),
    /// Fetches for itself.
    Deferred(Box<dyn DeferredFormat>),
}

impl Formatter {
    /// Name of the underlying format.
    pub fn name(&self) -> &str {
        match self {
            Formatter::Immediate(format) => format.name(),
            Formatter::Deferred(format) => format.name(),
        }
    }

    /// Returns true for self-querying formats.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Formatter::Deferred(_))
    }
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_deferred() { "Deferred" } else { "Immediate" };
        write!(f, "{kind}({})", self.name())
    }
}

/// What a format factory or resolver may look at.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    /// Rendering settings.
    pub config: &'a RenderConfig,
    /// Field descriptions of the query being displayed.
    pub field_descriptions: &'a FieldDescriptions,
}

/// Hook consulted for names the registry does not know.
pub trait ExternalFormatResolver: Send + Sync {
    /// Returns a formatter for `name`, or `None` to fall through to the
    /// heuristic.
    fn resolve(&self, name: &str, ctx: &FormatContext<'_>) -> Option<Formatter>;
}

type FormatFactory = Box<dyn Fn(&FormatContext<'_>) -> Formatter + Send + Sync>;

/// Maps format names to formatter factories.
pub struct FormatRegistry {
    config: RenderConfig,
    factories: IndexMap<String, FormatFactory>,
    resolver: Option<Box<dyn ExternalFormatResolver>>,
}

impl FormatRegistry {
    /// Creates a registry holding the built-in formats.
    pub fn new(config: RenderConfig) -> Self {
        let mut registry = Self::empty(config);
        registry.register_builtins();
        registry
    }

    /// Creates a registry with no named formats. Selection still falls
    /// back to `table` or `list`.
    pub fn empty(config: RenderConfig) -> Self {
        Self {
            config,
            factories: IndexMap::new(),
            resolver: None,
        }
    }

    fn register_builtins(&mut self) {
        for (name, style) in [
            ("list", ListStyle::Inline),
            ("ul", ListStyle::Unordered),
            ("ol", ListStyle::Ordered),
        ] {
            self.register(name, move |ctx| {
                Formatter::Immediate(Box::new(ListFormat::new(style, &ctx.config.list_separator)))
            });
        }
        self.register("table", |_| Formatter::Immediate(Box::new(TableFormat)));
        self.register("category", |_| Formatter::Immediate(Box::new(CategoryFormat)));

        // Canvas ids stay unique across every map this registry renders.
        let map_counter = Arc::new(AtomicUsize::new(1));
        for service in [MapService::Google, MapService::OpenLayers] {
            let counter = Arc::clone(&map_counter);
            self.register(service.format_name(), move |ctx| {
                Formatter::Immediate(Box::new(MapFormat::new(
                    service,
                    ctx.config.clone(),
                    Arc::clone(&counter),
                )))
            });
        }

        self.register("csv", |ctx| {
            Formatter::Deferred(Box::new(CsvFormat::new(ctx.config.clone())))
        });
        self.register("timeline", |ctx| {
            Formatter::Deferred(Box::new(TimelineFormat::new(ctx.config.clone())))
        });
    }

    /// Registers a format, replacing any format of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FormatContext<'_>) -> Formatter + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Installs the hook consulted for unknown names.
    pub fn set_resolver(&mut self, resolver: impl ExternalFormatResolver + 'static) {
        self.resolver = Some(Box::new(resolver));
    }

    /// Installs the hook, builder style.
    pub fn with_resolver(mut self, resolver: impl ExternalFormatResolver + 'static) -> Self {
        self.set_resolver(resolver);
        self
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Rendering settings handed to formats.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Selects the formatter for `name`.
    pub fn select(&self, name: Option<&str>, fields: &FieldDescriptions) -> Formatter {
        let ctx = FormatContext {
            config: &self.config,
            field_descriptions: fields,
        };

        if let Some(name) = name {
            if let Some(factory) = self.factories.get(name) {
                tracing::debug!(format = name, "selected registered format");
                return factory(&ctx);
            }
            if let Some(formatter) = self.resolver.as_ref().and_then(|r| r.resolve(name, &ctx)) {
                tracing::debug!(format = name, "selected external format");
                return formatter;
            }
        }

        let fallback = if displayed_field_count(fields) > 1 {
            "table"
        } else {
            "list"
        };
        tracing::debug!(requested = ?name, format = fallback, "falling back to default format");
        match self.factories.get(fallback) {
            Some(factory) => factory(&ctx),
            None if fallback == "table" => Formatter::Immediate(Box::new(TableFormat)),
            None => Formatter::Immediate(Box::new(ListFormat::new(
                ListStyle::Inline,
                &self.config.list_separator,
            ))),
        }
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.factories.keys().collect::<Vec<_>>())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Fields a format shows; lat/lon parts of a coordinates field are not
/// counted.
pub fn displayed_field_count(fields: &FieldDescriptions) -> usize {
    fields
        .values()
        .filter(|d| d.field_type != FieldType::CoordinatesPart)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_sql::schema::FieldDescription;

    fn fields(types: &[(&str, FieldType)]) -> FieldDescriptions {
        types
            .iter()
            .map(|(name, t)| (name.to_string(), FieldDescription::new(*t)))
            .collect()
    }

    struct Calendar;

    impl ImmediateFormat for Calendar {
        fn name(&self) -> &str {
            "calendar"
        }

        fn render(
            &self,
            _raw: &RowSet,
            formatted: &RowSet,
            _fields: &FieldDescriptions,
            _params: &DisplayParams,
        ) -> Result<String, FormatError> {
            Ok(format!("{} events", formatted.len()))
        }
    }

    struct CalendarResolver;

    impl ExternalFormatResolver for CalendarResolver {
        fn resolve(&self, name: &str, _ctx: &FormatContext<'_>) -> Option<Formatter> {
            (name == "calendar").then(|| Formatter::Immediate(Box::new(Calendar)))
        }
    }

    #[test]
    fn test_builtin_names() {
        let registry = FormatRegistry::new(RenderConfig::default());
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["list", "ul", "ol", "table", "category", "googlemaps", "openlayers", "csv", "timeline"]
        );

        let one = fields(&[("Title", FieldType::Page)]);
        assert!(registry.select(Some("csv"), &one).is_deferred());
        assert!(!registry.select(Some("openlayers"), &one).is_deferred());
        assert_eq!(registry.select(Some("ol"), &one).name(), "ol");
    }

    #[test]
    fn test_exact_match_only() {
        let registry = FormatRegistry::new(RenderConfig::default());
        let one = fields(&[("Title", FieldType::Page)]);
        assert_eq!(registry.select(Some("Table"), &one).name(), "list");
        assert_eq!(registry.select(Some(" table"), &one).name(), "list");
    }

    #[test]
    fn test_heuristic_fallback() {
        let registry = FormatRegistry::new(RenderConfig::default());
        let two = fields(&[("Title", FieldType::Page), ("Year", FieldType::Integer)]);
        assert_eq!(registry.select(None, &two).name(), "table");
        assert_eq!(registry.select(Some("nonexistent"), &two).name(), "table");

        let coordinates_only = fields(&[
            ("Where lat", FieldType::CoordinatesPart),
            ("Where lon", FieldType::CoordinatesPart),
            ("Where__full", FieldType::Coordinates),
        ]);
        assert_eq!(registry.select(None, &coordinates_only).name(), "list");

        let empty = FormatRegistry::empty(RenderConfig::default());
        assert_eq!(empty.select(Some("csv"), &two).name(), "table");
    }

    #[test]
    fn test_resolver_before_heuristic() {
        let registry = FormatRegistry::new(RenderConfig::default()).with_resolver(CalendarResolver);
        let two = fields(&[("Title", FieldType::Page), ("Date", FieldType::Date)]);
        assert_eq!(registry.select(Some("calendar"), &two).name(), "calendar");
        assert_eq!(registry.select(Some("agenda"), &two).name(), "table");
    }

    #[test]
    fn test_custom_registration_overrides() {
        let mut registry = FormatRegistry::new(RenderConfig::default());
        registry.register("table", |_| Formatter::Immediate(Box::new(Calendar)));
        let two = fields(&[("Title", FieldType::Page), ("Date", FieldType::Date)]);
        assert_eq!(registry.select(None, &two).name(), "calendar");
        assert!(registry.contains("table"));
    }
}
