//! Generated delivery artifact for widget translations.
//!
//! Widgets are third-party embeds whose text cannot be written back through
//! any store API, so translations ship as a standalone script that replaces
//! matching text nodes in the live page at load time. Matching is exact
//! string equality on trimmed text-node content — deliberately naive, and
//! not safe for a source text that appears in two contexts needing
//! different translations.

use crate::request::TranslationResult;

/// Render the replacement script for a set of widget translation results.
///
/// Each original text maps verbatim to its translation. Results whose
/// translation equals the source (echo fallbacks) are included too; they
/// are harmless no-op replacements.
pub fn replacement_script(results: &[TranslationResult]) -> String {
    let mut map = serde_json::Map::new();
    for result in results {
        map.insert(
            result.request.original_text.clone(),
            serde_json::Value::String(result.translated_text.clone()),
        );
    }
    let table = serde_json::Value::Object(map).to_string();

    format!(
        r#"(function () {{
  var translations = {table};
  function walk(node) {{
    if (node.nodeType === 3) {{
      var key = node.textContent.trim();
      if (Object.prototype.hasOwnProperty.call(translations, key)) {{
        node.textContent = translations[key];
      }}
      return;
    }}
    for (var i = 0; i < node.childNodes.length; i++) {{
      walk(node.childNodes[i]);
    }}
  }}
  if (document.readyState === 'loading') {{
    document.addEventListener('DOMContentLoaded', function () {{ walk(document.body); }});
  }} else {{
    walk(document.body);
  }}
}})();
"#,
        table = table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ContentField, TranslationRequest, TranslationResult};

    fn make_result(original: &str, translated: &str) -> TranslationResult {
        TranslationResult {
            request: TranslationRequest {
                source_id: "w-1".to_string(),
                field: ContentField::WidgetText(0),
                original_text: original.to_string(),
                has_markup: false,
                original_markup: None,
                ordinal: 0,
            },
            translated_text: translated.to_string(),
        }
    }

    #[test]
    fn test_script_maps_original_to_translation() {
        let script = replacement_script(&[
            make_result("Free shipping!", "¡Envío gratis!"),
            make_result("Shop now", "Compra ahora"),
        ]);

        assert!(script.contains(r#""Free shipping!":"¡Envío gratis!""#));
        assert!(script.contains(r#""Shop now":"Compra ahora""#));
    }

    #[test]
    fn test_script_escapes_quotes_and_newlines() {
        let script = replacement_script(&[make_result("Say \"hi\"\nnow", "Di \"hola\"\nahora")]);

        // serde_json escaping keeps the script syntactically valid.
        assert!(script.contains(r#""Say \"hi\"\nnow""#));
        assert!(script.contains(r#""Di \"hola\"\nahora""#));
    }

    #[test]
    fn test_script_walks_text_nodes_on_load() {
        let script = replacement_script(&[make_result("Hello", "Hola")]);

        assert!(script.contains("nodeType === 3"));
        assert!(script.contains("DOMContentLoaded"));
        assert!(script.contains("textContent"));
    }

    #[test]
    fn test_empty_results_still_produce_valid_scaffold() {
        let script = replacement_script(&[]);
        assert!(script.contains("var translations = {}"));
    }
}
