use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

const EN_TRANSLATIONS: &str = r#"
# Errors
error-no-files = No files were provided. Attach one or more PDF statements in the "files" field.
error-too-many-files = Too many files: { $count } (maximum { $max }).
error-not-a-pdf = { $filename } is not a PDF document.
error-file-too-large = { $filename } exceeds the maximum allowed size.
error-invalid-format = Unsupported file type: { $file_type }. Use excel, csv or txt.
error-batch-not-found = No completed batch with id { $id }.
error-artifact-not-found = File not found.
error-unrecognized-bank = Bank not recognized in { $filename }.
error-parse = Could not read the statement in { $filename }.
error-timeout = The request took too long and was cancelled.
error-internal = An internal error occurred

# Health
health-status-healthy = Service is healthy
"#;

const ES_TRANSLATIONS: &str = r#"
# Errores
error-no-files = No se recibieron archivos. Adjunta uno o más estados de cuenta PDF en el campo "files".
error-too-many-files = Demasiados archivos: { $count } (máximo { $max }).
error-not-a-pdf = { $filename } no es un documento PDF.
error-file-too-large = { $filename } excede el tamaño máximo permitido.
error-invalid-format = Formato no soportado: { $file_type }. Usa excel, csv o txt.
error-batch-not-found = No existe un lote completado con id { $id }.
error-artifact-not-found = Archivo no encontrado.
error-unrecognized-bank = Banco no reconocido en { $filename }.
error-parse = No se pudo leer el estado de cuenta { $filename }.
error-timeout = La solicitud tardó demasiado y fue cancelada.
error-internal = Ocurrió un error interno

# Salud
health-status-healthy = El servicio está funcionando
"#;

/// Internationalization service using Fluent (thread-safe)
pub struct I18n {
    bundles: RwLock<HashMap<String, FluentBundle<FluentResource>>>,
    default_locale: String,
}

impl I18n {
    /// Create a new i18n service with embedded English and Spanish translations
    pub fn new(default_locale: &str) -> Self {
        let i18n = Self {
            bundles: RwLock::new(HashMap::new()),
            default_locale: default_locale.to_string(),
        };

        for (locale, content) in [("en", EN_TRANSLATIONS), ("es", ES_TRANSLATIONS)] {
            if let Err(e) = i18n.add_locale(locale, content) {
                warn!(locale, error = %e, "Failed to load embedded translations");
            }
        }

        i18n
    }

    /// Add a locale with translations
    pub fn add_locale(&self, locale: &str, content: &str) -> Result<(), String> {
        let lang_id: LanguageIdentifier = locale
            .parse()
            .map_err(|e| format!("Invalid locale '{}': {}", locale, e))?;

        let resource = FluentResource::try_new(content.to_string())
            .map_err(|(_, errors)| format!("Failed to parse Fluent resource: {:?}", errors))?;

        let mut bundle = FluentBundle::new_concurrent(vec![lang_id]);
        bundle
            .add_resource(resource)
            .map_err(|errors| format!("Failed to add resource to bundle: {:?}", errors))?;

        let mut bundles = self.bundles.write().unwrap_or_else(PoisonError::into_inner);
        bundles.insert(locale.to_string(), bundle);

        debug!(locale = %locale, "Loaded translations");

        Ok(())
    }

    /// Pick the first loaded language from an `Accept-Language` header value.
    pub fn negotiate(&self, accept_language: Option<&str>) -> String {
        let bundles = self.bundles.read().unwrap_or_else(PoisonError::into_inner);

        accept_language
            .into_iter()
            .flat_map(|header| header.split(','))
            .filter_map(|entry| {
                let tag = entry.split(';').next()?.trim();
                let language = tag.split(['-', '_']).next()?.to_ascii_lowercase();
                (!language.is_empty()).then_some(language)
            })
            .find(|language| bundles.contains_key(language))
            .unwrap_or_else(|| self.default_locale.clone())
    }

    /// Get a translated message
    pub fn get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        // Try requested locale, fall back to default, fall back to key
        self.try_get(locale, key, args)
            .or_else(|| self.try_get(&self.default_locale, key, args))
            .unwrap_or_else(|| key.to_string())
    }

    /// Try to get a translation from a specific locale
    fn try_get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let bundles = self.bundles.read().unwrap_or_else(PoisonError::into_inner);
        let bundle = bundles.get(locale)?;
        let message = bundle.get_message(key)?;
        let pattern = message.value()?;

        let mut errors = vec![];
        let result = bundle.format_pattern(pattern, args, &mut errors);

        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting errors");
        }

        Some(result.to_string())
    }

    /// Get a translated message with arguments
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (k, v) in args {
            fluent_args.set(*k, *v);
        }
        self.get(locale, key, Some(&fluent_args))
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("es")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_message() {
        let i18n = I18n::default();

        assert_eq!(i18n.get("en", "error-internal", None), "An internal error occurred");
        assert_eq!(i18n.get("es", "error-internal", None), "Ocurrió un error interno");
    }

    #[test]
    fn test_format_message() {
        let i18n = I18n::default();

        let msg = i18n.format("es", "error-unrecognized-bank", &[("filename", "enero.pdf")]);
        // Fluent wraps placeables in U+2068 / U+2069 isolation marks
        assert_eq!(msg, "Banco no reconocido en \u{2068}enero.pdf\u{2069}.");
    }

    #[test]
    fn test_locales_define_the_same_messages() {
        let ids = |resource: &str| -> Vec<String> {
            let mut ids: Vec<String> = resource
                .lines()
                .filter(|line| !line.starts_with('#'))
                .filter_map(|line| line.split_once(" = ").map(|(id, _)| id.to_string()))
                .collect();
            ids.sort();
            ids
        };

        let en = ids(EN_TRANSLATIONS);
        assert_eq!(en, ids(ES_TRANSLATIONS));
        assert!(en.iter().all(|id| id.starts_with("error-") || id.starts_with("health-")));
    }

    #[test]
    fn test_fallback_to_key() {
        let i18n = I18n::default();

        let msg = i18n.get("en", "nonexistent-key", None);
        assert_eq!(msg, "nonexistent-key");
    }

    #[test]
    fn test_negotiate_locale() {
        let i18n = I18n::new("es");

        assert_eq!(i18n.negotiate(Some("en-US,en;q=0.9")), "en");
        assert_eq!(i18n.negotiate(Some("fr-FR, es-MX;q=0.8")), "es");
        assert_eq!(i18n.negotiate(Some("de")), "es");
        assert_eq!(i18n.negotiate(None), "es");
    }
}
