use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{MediaQuery, SubtitleCandidate};

lazy_static! {
    static ref SEASON_WORDING: Regex = Regex::new(r"(?i)season|第|季").unwrap();
}

/// Candidates that match `query`, in listing order.
///
/// Without a catalog id the title has to read exactly `"{name} ({year})"`.
/// A requested season or episode must equal the candidate's labels; a
/// season or episode of 0 is matched literally, not treated as absent.
pub fn filter_candidates<'a>(
    candidates: &'a [SubtitleCandidate],
    query: &MediaQuery,
) -> Vec<&'a SubtitleCandidate> {
    let expected_title = (!query.has_identifier()).then(|| expected_title(query));
    let season = query.season.map(|s| s.to_string());
    let episode = query.episode.map(|e| e.to_string());

    candidates
        .iter()
        .filter(|c| expected_title.as_ref().map_or(true, |t| &c.title == t))
        .filter(|c| {
            season
                .as_ref()
                .map_or(true, |s| &normalize_season(&c.season_label) == s)
        })
        .filter(|c| episode.as_ref().map_or(true, |e| &c.episode_number == e))
        .collect()
}

fn expected_title(query: &MediaQuery) -> String {
    let year = query.year.map(|y| y.to_string()).unwrap_or_default();
    format!("{} ({})", query.display_name, year)
}

/// "Season 1" -> "1"
pub fn normalize_season(label: &str) -> String {
    SEASON_WORDING.replace_all(label, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(season: &str, episode: &str, title: &str) -> SubtitleCandidate {
        SubtitleCandidate {
            season_label: season.to_string(),
            episode_number: episode.to_string(),
            title: title.to_string(),
            description: format!("{title}.srt"),
            download_link: format!("https://example.org/download/{season}-{episode}"),
        }
    }

    fn tv_query(season: Option<u32>, episode: Option<u32>) -> MediaQuery {
        MediaQuery {
            identifier: Some("tt1234567".to_string()),
            display_name: "Show".to_string(),
            year: None,
            season,
            episode,
        }
    }

    #[test]
    fn test_normalize_season() {
        assert_eq!(normalize_season("Season 1"), "1");
        assert_eq!(normalize_season("  season 12 "), "12");
        assert_eq!(normalize_season("第 3 季"), "3");
        assert_eq!(normalize_season(""), "");
    }

    #[test]
    fn test_season_and_episode_must_match() {
        let candidates = vec![
            candidate("Season 1", "1", "Pilot"),
            candidate("Season 1", "2", "Second"),
            candidate("Season 2", "2", "Other"),
            candidate("", "", "Unlabelled"),
        ];
        let matched = filter_candidates(&candidates, &tv_query(Some(1), Some(2)));

        assert_eq!(matched, vec![&candidates[1]]);
    }

    #[test]
    fn test_season_only() {
        let candidates = vec![
            candidate("Season 1", "1", "A"),
            candidate("Season 2", "1", "B"),
            candidate("Season 1", "3", "C"),
        ];
        let matched = filter_candidates(&candidates, &tv_query(Some(1), None));
        assert_eq!(matched, vec![&candidates[0], &candidates[2]]);
    }

    #[test]
    fn test_identifier_query_skips_title_check() {
        let candidates = vec![candidate("", "", "Anything"), candidate("", "", "Else")];
        let matched = filter_candidates(&candidates, &tv_query(None, None));
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_keyword_query_requires_exact_title() {
        let candidates = vec![
            candidate("", "", "Foo (2020)"),
            candidate("", "", "Foo  (2020)"),
            candidate("", "", "Foo (2021)"),
            candidate("", "", "foo (2020)"),
            candidate("", "", "Foo (2020)"),
        ];
        let query = MediaQuery {
            identifier: None,
            display_name: "Foo".to_string(),
            year: Some(2020),
            season: None,
            episode: None,
        };
        let matched = filter_candidates(&candidates, &query);
        assert_eq!(matched, vec![&candidates[0], &candidates[4]]);
    }

    #[test]
    fn test_season_zero_is_matched_literally() {
        let candidates = vec![
            candidate("Season 0", "1", "Special"),
            candidate("Season 1", "1", "Pilot"),
        ];
        let matched = filter_candidates(&candidates, &tv_query(Some(0), None));
        assert_eq!(matched, vec![&candidates[0]]);
    }

    #[test]
    fn test_filtering_is_repeatable() {
        let candidates = vec![
            candidate("Season 1", "2", "A"),
            candidate("Season 1", "3", "B"),
        ];
        let query = tv_query(Some(1), Some(2));
        let first = filter_candidates(&candidates, &query);
        let second = filter_candidates(&candidates, &query);
        assert_eq!(first, second);
        assert_eq!(candidates.len(), 2);
    }
}
