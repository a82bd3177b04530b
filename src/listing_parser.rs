use anyhow::Result;
use lazy_static::lazy_static;
use reqwest::Url;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info};

use crate::error::SubtitleError;
use crate::models::SubtitleCandidate;

lazy_static! {
    static ref ROW_SELECTOR: Selector =
        Selector::parse("#search_results > tbody > tr:not([style])").unwrap();
    static ref SEASON_SELECTOR: Selector =
        Selector::parse(r#"span[id^="season-"] > a > b"#).unwrap();
    static ref EPISODE_SELECTOR: Selector =
        Selector::parse(r#"span[itemprop="episodeNumber"]"#).unwrap();
    static ref TITLE_SELECTOR: Selector = Selector::parse("strong > a.bnone").unwrap();
    static ref FIRST_CELL_SELECTOR: Selector = Selector::parse("td:nth-child(1)").unwrap();
    static ref PLAIN_LINK_SELECTOR: Selector = Selector::parse("td:nth-child(5) > a").unwrap();
    static ref NAME_SELECTOR: Selector = Selector::parse(r#"span[itemprop="name"]"#).unwrap();
    static ref SEASON_LINK_SELECTOR: Selector =
        Selector::parse(r#"a[href^="/download/"]"#).unwrap();
}

/// Season group the parser is currently inside of.
///
/// A season marker row moves the machine into `ActiveSeason`; it stays
/// there, relabelled by later markers, until the document ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SeasonContext {
    #[default]
    NoActiveSeason,
    ActiveSeason(String),
}

impl SeasonContext {
    pub fn enter(&mut self, label: String) {
        *self = SeasonContext::ActiveSeason(label);
    }

    pub fn label(&self) -> &str {
        match self {
            SeasonContext::NoActiveSeason => "",
            SeasonContext::ActiveSeason(label) => label,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SeasonContext::ActiveSeason(_))
    }
}

/// What a single listing row turned out to be.
#[derive(Debug)]
pub enum ListingRow<'a> {
    SeasonMarker(String),
    Entry(ElementRef<'a>),
}

impl<'a> ListingRow<'a> {
    pub fn classify(row: ElementRef<'a>) -> Self {
        let season = select_text(row, &SEASON_SELECTOR);
        if season.is_empty() {
            ListingRow::Entry(row)
        } else {
            ListingRow::SeasonMarker(season)
        }
    }
}

/// Parses opensubtitles.org search result pages.
pub struct ListingParser {
    base: Url,
}

impl ListingParser {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base: Url::parse(base_url)?,
        })
    }

    /// Candidates in document order; season marker rows never become
    /// candidates.
    pub fn parse(&self, html: &str) -> Vec<SubtitleCandidate> {
        let document = Html::parse_document(html);
        let mut context = SeasonContext::default();
        let mut results = Vec::new();

        for row in document.select(&ROW_SELECTOR) {
            match ListingRow::classify(row) {
                ListingRow::SeasonMarker(label) => {
                    debug!("Entering season group: {}", label);
                    context.enter(label);
                }
                ListingRow::Entry(row) => match self.parse_entry(row, &context) {
                    Ok(candidate) => results.push(candidate),
                    Err(e) => debug!("Skipping row: {}", e),
                },
            }
        }

        info!("Found {} subtitle entries", results.len());
        results
    }

    fn parse_entry(
        &self,
        row: ElementRef<'_>,
        context: &SeasonContext,
    ) -> Result<SubtitleCandidate, SubtitleError> {
        let episode_number = select_text(row, &EPISODE_SELECTOR);
        let title = select_text(row, &TITLE_SELECTOR);

        // Grouped and plain listings keep description and link in different cells
        let (description, href) = if context.is_active() {
            (
                select_text(row, &NAME_SELECTOR),
                select_href(row, &SEASON_LINK_SELECTOR),
            )
        } else {
            (
                plain_description(row),
                select_href(row, &PLAIN_LINK_SELECTOR),
            )
        };

        let href = href.ok_or_else(|| {
            SubtitleError::ParseAnomaly(format!("no download link in row '{}'", title))
        })?;
        let download_link = self.base.join(href).map_err(|e| {
            SubtitleError::ParseAnomaly(format!("unresolvable link '{}': {}", href, e))
        })?;

        Ok(SubtitleCandidate {
            season_label: context.label().to_string(),
            episode_number,
            title,
            description,
            download_link: download_link.to_string(),
        })
    }
}

/// Second line of the first cell, which holds the subtitle filename under
/// the movie title. Falls back to the whole cell text.
fn plain_description(row: ElementRef<'_>) -> String {
    let Some(cell) = row.select(&FIRST_CELL_SELECTOR).next() else {
        return String::new();
    };
    let mut lines = text_lines(cell);
    if lines.len() > 1 {
        lines.swap_remove(1)
    } else {
        lines.join(" ")
    }
}

fn select_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .map(|e| squash_whitespace(&e.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn select_href<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<&'a str> {
    element
        .select(selector)
        .find_map(|e| e.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
}

/// Visible text split on `<br>` and block boundaries, whitespace squashed,
/// blank lines dropped.
fn text_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut buffer = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => buffer.push_str(text),
            Node::Element(e) if matches!(e.name(), "br" | "div" | "p") => buffer.push('\n'),
            _ => {}
        }
    }

    buffer
        .lines()
        .map(squash_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.opensubtitles.org";

    fn wrap(rows: &str) -> String {
        format!(
            r#"<html><body><table id="search_results"><tbody>
            <tr class="head"><th>Name</th><th>CD</th><th>Uploaded</th><th>DL</th><th>Format</th></tr>
            {rows}
            </tbody></table></body></html>"#
        )
    }

    fn plain_row(id: u32, title: &str, file: &str) -> String {
        format!(
            r#"<tr id="name{id}" onclick="servOC({id})">
              <td id="main{id}"><strong><a class="bnone" href="/zh/subtitles/{id}">{title}</a></strong><br/>
                {file}<br/><a href="/zh/ssearch/idmovie-1">Watch online</a></td>
              <td>1CD</td><td>2020-01-01</td><td>12x</td>
              <td><a href="/zh/subtitleserve/sub/{id}">srt</a></td>
            </tr>"#
        )
    }

    fn season_row(number: u32) -> String {
        format!(
            r#"<tr><td colspan="9"><span id="season-{number}"><a href="/zh/ssearch/season-{number}"><b>Season {number}</b></a></span></td></tr>"#
        )
    }

    fn episode_row(id: u32, episode: u32, title: &str, file: &str) -> String {
        format!(
            r#"<tr itemprop="episode">
              <td><span itemprop="episodeNumber">{episode}</span>.
                <strong><a class="bnone" href="/zh/subtitles/{id}">{title}</a></strong></td>
              <td><span itemprop="name">{file}</span></td>
              <td><a href="/download/s/sublanguageid-chi/pimdbid-{id}">dl</a></td>
            </tr>"#
        )
    }

    #[test]
    fn test_parse_plain_listing() {
        let html = wrap(&format!(
            "{}{}",
            plain_row(1, "Foo (2020)", "Foo.2020.1080p.BluRay.srt"),
            plain_row(2, "Foo (2020)", "Foo.2020.WEB.chs.srt")
        ));
        let parser = ListingParser::new(BASE).unwrap();
        let results = parser.parse(&html);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].season_label, "");
        assert_eq!(results[0].episode_number, "");
        assert_eq!(results[0].title, "Foo (2020)");
        assert_eq!(results[0].description, "Foo.2020.1080p.BluRay.srt");
        assert_eq!(
            results[0].download_link,
            "https://www.opensubtitles.org/zh/subtitleserve/sub/1"
        );
        assert_eq!(results[1].description, "Foo.2020.WEB.chs.srt");
    }

    #[test]
    fn test_season_markers_are_not_candidates() {
        let html = wrap(&format!(
            "{}{}{}{}{}",
            season_row(1),
            episode_row(11, 1, "Pilot", "show.s01e01.srt"),
            episode_row(12, 2, "Second", "show.s01e02.srt"),
            season_row(2),
            episode_row(21, 1, "Return", "show.s02e01.srt"),
        ));
        let parser = ListingParser::new(BASE).unwrap();
        let results = parser.parse(&html);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].season_label, "Season 1");
        assert_eq!(results[1].season_label, "Season 1");
        assert_eq!(results[2].season_label, "Season 2");
        assert_eq!(results[1].episode_number, "2");
        assert_eq!(results[1].title, "Second");
        assert_eq!(results[1].description, "show.s01e02.srt");
        assert_eq!(
            results[1].download_link,
            "https://www.opensubtitles.org/download/s/sublanguageid-chi/pimdbid-12"
        );
    }

    #[test]
    fn test_rows_before_first_season_have_empty_label() {
        let html = wrap(&format!(
            "{}{}{}",
            plain_row(1, "Foo", "foo.srt"),
            season_row(3),
            episode_row(31, 4, "Late", "late.srt"),
        ));
        let results = ListingParser::new(BASE).unwrap().parse(&html);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].season_label, "");
        assert_eq!(results[1].season_label, "Season 3");
    }

    #[test]
    fn test_styled_rows_are_skipped() {
        let hidden = r#"<tr style="display:none"><td><strong><a class="bnone" href="/x">Hidden</a></strong></td>
            <td></td><td></td><td></td><td><a href="/zh/subtitleserve/sub/99">srt</a></td></tr>"#;
        let html = wrap(&format!("{}{}", hidden, plain_row(1, "Foo", "foo.srt")));
        let results = ListingParser::new(BASE).unwrap().parse(&html);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Foo");
    }

    #[test]
    fn test_rows_without_link_are_dropped() {
        let no_link = r#"<tr><td><strong><a class="bnone" href="/x">Broken</a></strong></td><td>1CD</td></tr>"#;
        let html = wrap(&format!("{}{}", no_link, plain_row(5, "Foo", "foo.srt")));
        let results = ListingParser::new(BASE).unwrap().parse(&html);

        assert_eq!(results.len(), 1);
        assert!(results[0].download_link.ends_with("/sub/5"));
    }

    #[test]
    fn test_document_without_results_table() {
        let results = ListingParser::new(BASE)
            .unwrap()
            .parse("<html><body><p>No results</p></body></html>");
        assert!(results.is_empty());
    }

    #[test]
    fn test_season_context_transitions() {
        let mut context = SeasonContext::default();
        assert!(!context.is_active());
        assert_eq!(context.label(), "");

        context.enter("Season 1".to_string());
        assert_eq!(context, SeasonContext::ActiveSeason("Season 1".to_string()));

        context.enter("Season 2".to_string());
        assert!(context.is_active());
        assert_eq!(context.label(), "Season 2");
    }

    #[test]
    fn test_text_lines_split_on_br() {
        let html = Html::parse_fragment("<div><b> Title  (2020) </b><br>\n  file.srt <br/></div>");
        let div = html.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert_eq!(text_lines(div), vec!["Title (2020)", "file.srt"]);
    }
}
