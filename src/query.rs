use crate::models::MediaQuery;

/// Subtitle language searched for on the listing site.
pub const LISTING_LANGUAGE: &str = "chi";

/// Builds the listing URL for a query.
///
/// The catalog id wins over the free-text name. Callers make sure at least
/// one of them is usable.
pub fn listing_url(base_url: &str, query: &MediaQuery) -> String {
    let base = base_url.trim_end_matches('/');
    match query.identifier.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(identifier) => {
            let identifier = identifier.trim();
            let numeric = identifier.strip_prefix("tt").unwrap_or(identifier);
            format!("{base}/zh/search/imdbid-{numeric}/sublanguageid-{LISTING_LANGUAGE}")
        }
        None => format!(
            "{base}/zh/search/moviename-{}/sublanguageid-{LISTING_LANGUAGE}",
            urlencoding::encode(&search_keyword(query))
        ),
    }
}

fn search_keyword(query: &MediaQuery) -> String {
    match query.year {
        Some(year) => format!("{} {}", query.display_name, year),
        None => query.display_name.clone(),
    }
}
