// Language code mapping between the translation model (FLORES-200) and the
// OCR engine (BCP-47).

/// Map a FLORES-200 code to the BCP-47 tag the OCR collaborator understands.
pub fn flores_to_bcp47(code: &str) -> Option<&'static str> {
    match code {
        "eng_Latn" => Some("en"),
        "fra_Latn" => Some("fr"),
        "deu_Latn" => Some("de"),
        "spa_Latn" => Some("es"),
        "ita_Latn" => Some("it"),
        "por_Latn" => Some("pt"),
        "rus_Cyrl" => Some("ru"),
        "jpn_Jpan" => Some("ja"),
        "kor_Hang" => Some("ko"),
        "zho_Hans" => Some("zh-Hans"),
        "zho_Hant" => Some("zh-Hant"),
        "arb_Arab" => Some("ar"),
        "nld_Latn" => Some("nl"),
        "pol_Latn" => Some("pl"),
        "tur_Latn" => Some("tr"),
        "vie_Latn" => Some("vi"),
        "tha_Thai" => Some("th"),
        "ukr_Cyrl" => Some("uk"),
        "ces_Latn" => Some("cs"),
        "swe_Latn" => Some("sv"),
        _ => None,
    }
}

/// The language code actually used for cache keys and translation calls.
///
/// "auto" resolves to a fixed English assumption rather than real detection;
/// auto-detect was never implemented at the translation layer and this floor
/// is preserved deliberately.
pub fn effective_source(code: &str) -> &str {
    if code == "auto" {
        "eng_Latn"
    } else {
        code
    }
}

/// The BCP-47 tag used to initialize the OCR engine for a configured source
/// language ("auto" and unmapped codes fall back to English).
pub fn ocr_language_tag(source: &str) -> &'static str {
    if source == "auto" {
        return "en";
    }
    flores_to_bcp47(source).unwrap_or("en")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flores_mapping() {
        assert_eq!(flores_to_bcp47("eng_Latn"), Some("en"));
        assert_eq!(flores_to_bcp47("jpn_Jpan"), Some("ja"));
        assert_eq!(flores_to_bcp47("zho_Hans"), Some("zh-Hans"));
        assert_eq!(flores_to_bcp47("xx_Nope"), None);
    }

    #[test]
    fn test_effective_source_floor() {
        assert_eq!(effective_source("auto"), "eng_Latn");
        assert_eq!(effective_source("deu_Latn"), "deu_Latn");
    }

    #[test]
    fn test_ocr_tag_fallback() {
        assert_eq!(ocr_language_tag("auto"), "en");
        assert_eq!(ocr_language_tag("fra_Latn"), "fr");
        assert_eq!(ocr_language_tag("xx_Nope"), "en");
    }
}
