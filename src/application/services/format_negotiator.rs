//! Accept-header format negotiation.

use crate::domain::entities::FormatPreference;

/// Picks the output format and quality for a request.
///
/// Preferences are scanned in configured order; the first whose format name
/// appears anywhere in the `Accept` header wins. A missing header, or one
/// naming none of the configured formats, falls back to the first
/// preference. Returns `None` only when no formats are configured at all.
#[must_use]
pub fn negotiate_format(
    preferences: &[FormatPreference],
    accept: Option<&str>,
) -> Option<FormatPreference> {
    let accept = accept.unwrap_or("");
    preferences
        .iter()
        .find(|pref| accept.contains(pref.format.name()))
        .or_else(|| preferences.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::OutputFormat;
    use test_case::test_case;

    fn webp_first() -> Vec<FormatPreference> {
        vec![
            FormatPreference::new(OutputFormat::Webp, 65),
            FormatPreference::new(OutputFormat::Avif, 45),
        ]
    }

    #[test_case(Some("image/avif,image/webp,*/*;q=0.8"), OutputFormat::Webp ; "preference_order_beats_accept_order")]
    #[test_case(Some("image/avif"), OutputFormat::Avif ; "second_preference_matches")]
    #[test_case(Some("text/html"), OutputFormat::Webp ; "no_match_falls_back_to_first")]
    #[test_case(None, OutputFormat::Webp ; "missing_header_falls_back_to_first")]
    fn test_negotiation(accept: Option<&str>, expected: OutputFormat) {
        let pref = negotiate_format(&webp_first(), accept).unwrap();
        assert_eq!(pref.format, expected);
    }

    #[test]
    fn test_quality_rides_with_the_format() {
        let pref = negotiate_format(&webp_first(), Some("image/avif")).unwrap();
        assert_eq!(pref.quality, 45);
    }

    #[test]
    fn test_configured_order_is_authoritative() {
        let avif_first = vec![
            FormatPreference::new(OutputFormat::Avif, 45),
            FormatPreference::new(OutputFormat::Webp, 65),
        ];
        let pref = negotiate_format(&avif_first, Some("image/webp,image/avif")).unwrap();
        assert_eq!(pref.format, OutputFormat::Avif);
    }

    #[test]
    fn test_empty_preferences_yield_none() {
        assert!(negotiate_format(&[], Some("image/webp")).is_none());
    }
}
