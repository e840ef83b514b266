//! Fuel price announcement parsing.
//!
//! Works on the raw HTML of the news agency search page and article page;
//! fetching lives with the callers so this stays pure and testable.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::fuel::{FuelPriceSnapshot, FuelType};

pub const DEFAULT_SOURCE_NAME: &str = "WAM (Emirates News Agency)";

/// Article-text labels and the fuel type each one announces.
pub const FUEL_LABELS: [(&str, FuelType); 4] = [
    ("special 95", FuelType::Petrol),
    ("super 98", FuelType::Super),
    ("e-plus 91", FuelType::Eplus),
    ("diesel", FuelType::Diesel),
];

const LABEL_WINDOW_CHARS: usize = 100;
const AED_WINDOW_CHARS: usize = 7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArticleLink {
    pub title: String,
    pub date: String,
    pub link: String,
}

static CARD_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<[a-zA-Z]+[^>]*class="(?:[^"]*\s)?card(?:\s[^"]*)?"[^>]*>"#).unwrap()
});
static CARD_TITLE: Lazy<Regex> = Lazy::new(|| class_open_tag("card-title"));
static ITEM_DATE: Lazy<Regex> = Lazy::new(|| class_open_tag("item-date"));
static ARTICLE_BODY: Lazy<Regex> = Lazy::new(|| class_open_tag("article-body"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());
static ANCHOR_HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<a\s[^>]*href="([^"]*)""#).unwrap());
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p(?:\s[^>]*)?>(.*?)</p>").unwrap());
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static DECIMAL_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+[,.]\d+)").unwrap());

/// Opening tag of any element carrying `class`; group 1 is the tag name.
fn class_open_tag(class: &str) -> Regex {
    let pattern = format!(
        r#"<([a-zA-Z][a-zA-Z0-9]*)\b[^>]*class="(?:[^"]*\s)?{}(?:\s[^"]*)?"[^>]*>"#,
        regex::escape(class)
    );
    Regex::new(&pattern).unwrap()
}

/// Inner markup of the first element matched by `open`, up to that
/// element's own closing tag. Unclosed elements run to the end of `html`.
fn element_inner<'a>(open: &Regex, html: &'a str) -> Option<&'a str> {
    let captures = open.captures(html)?;
    let name = captures.get(1)?.as_str();
    let start = captures.get(0)?.end();

    let mut depth = 0usize;
    for tag in TAG.captures_iter(&html[start..]) {
        if !tag[2].eq_ignore_ascii_case(name) {
            continue;
        }
        if tag[1].is_empty() {
            depth += 1;
        } else if depth == 0 {
            let end = start + tag.get(0).map(|found| found.start()).unwrap_or(0);
            return Some(&html[start..end]);
        } else {
            depth -= 1;
        }
    }
    Some(&html[start..])
}

fn text_content(fragment: &str) -> String {
    let stripped = MARKUP.replace_all(fragment, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Result cards from the search page. Cards missing a title, date or link
/// are skipped.
pub fn parse_search_results(html: &str) -> Vec<ArticleLink> {
    let body = match html.find("search-results") {
        Some(position) => &html[position..],
        None => html,
    };

    let starts: Vec<usize> = CARD_OPEN.find_iter(body).map(|found| found.start()).collect();
    let mut links = Vec::with_capacity(starts.len());
    for (index, start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(body.len());
        let card = &body[*start..end];

        let title = element_inner(&CARD_TITLE, card).map(text_content);
        let date = element_inner(&ITEM_DATE, card).map(text_content);
        let link = ANCHOR_HREF.captures(card).map(|captures| captures[1].trim().to_string());

        match (title, date, link) {
            (Some(title), Some(date), Some(link))
                if !title.is_empty() && !date.is_empty() && !link.is_empty() =>
            {
                links.push(ArticleLink { title, date, link });
            }
            _ => debug!(event_name = "fuel.scrape.card_skipped", "incomplete search card"),
        }
    }
    links
}

pub fn is_price_announcement(title: &str) -> bool {
    let title = title.to_lowercase();
    (title.contains("fuel price") || title.contains("petrol price"))
        && (title.contains("announce") || title.contains("set"))
}

/// Most recent announcement, ordered by the date text as published. Equal
/// dates resolve to the card listed first.
pub fn latest_announcement(links: Vec<ArticleLink>) -> Option<ArticleLink> {
    links
        .into_iter()
        .rev()
        .filter(|link| is_price_announcement(&link.title))
        .max_by(|left, right| left.date.cmp(&right.date))
}

/// Prefixes site-relative links with `origin`.
pub fn absolute_url(origin: &str, link: &str) -> String {
    if link.starts_with("http") {
        link.to_string()
    } else {
        format!("{}{}", origin.trim_end_matches('/'), link)
    }
}

/// Scheme and host of `url`, e.g. `https://wam.ae`.
pub fn origin_of(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.trim_end_matches('/').to_string();
    };
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    format!("{}{}", &url[..scheme_end + 3], &rest[..host_end])
}

/// Paragraph text of the article body, joined by spaces. `None` when the
/// page has no article body.
pub fn article_text(html: &str) -> Option<String> {
    let body = element_inner(&ARTICLE_BODY, html)?;
    let text = PARAGRAPH
        .captures_iter(body)
        .map(|captures| text_content(&captures[1]))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(text)
}

fn char_window(text: &str, start: usize, chars: usize) -> &str {
    let end = text[start..]
        .char_indices()
        .nth(chars)
        .map(|(offset, _)| start + offset)
        .unwrap_or(text.len());
    &text[start..end]
}

fn price_after_label(segment: &str) -> Option<Decimal> {
    if let Some(aed) = segment.find("aed") {
        let window = char_window(segment, aed + 3, AED_WINDOW_CHARS);
        let found = window.split_whitespace().find_map(|word| {
            let digits = word.replace('.', "");
            if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) {
                Decimal::from_str(word).ok()
            } else {
                None
            }
        });
        if found.is_some() {
            return found;
        }
    }

    DECIMAL_NUMBER
        .captures(segment)
        .and_then(|captures| Decimal::from_str(&captures[1].replace(',', ".")).ok())
}

/// Prices per fuel type found in `article_text`. Zero prices are dropped and
/// `None` is returned when nothing was found.
pub fn extract_prices(
    article_text: &str,
    date: DateTime<Utc>,
    source: &str,
) -> Option<FuelPriceSnapshot> {
    let lowered = article_text.to_lowercase();
    let mut prices = BTreeMap::new();

    for (label, fuel_type) in FUEL_LABELS {
        let Some(position) = lowered.find(label) else {
            continue;
        };
        let segment = char_window(&lowered, position, LABEL_WINDOW_CHARS);
        match price_after_label(segment) {
            Some(price) if !price.is_zero() => {
                info!(
                    event_name = "fuel.extract.price_found",
                    fuel_type = fuel_type.as_str(),
                    price = %price,
                    "fuel price found"
                );
                prices.insert(fuel_type, price);
            }
            _ => debug!(
                event_name = "fuel.extract.price_missing",
                fuel_type = fuel_type.as_str(),
                "label present without a price"
            ),
        }
    }

    if prices.is_empty() {
        warn!(event_name = "fuel.extract.empty", "no fuel prices in article text");
        return None;
    }
    Some(FuelPriceSnapshot { prices, date, source: source.to_string() })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        absolute_url, article_text, extract_prices, latest_announcement, origin_of,
        parse_search_results, ArticleLink, DEFAULT_SOURCE_NAME,
    };
    use crate::domain::fuel::FuelType;

    const SEARCH_PAGE: &str = r#"
        <html><body>
        <nav class="card">not a result</nav>
        <div class="search-results">
          <div class="card result">
            <h5 class="card-title">UAE fuel prices announced for March</h5>
            <span class="item-date">2025-02-28</span>
            <a href="/en/article/march-fuel">Read</a>
          </div>
          <div class="card">
            <h5 class="card-title">Fuel Price Committee sets April prices</h5>
            <span class="item-date">2025-03-31</span>
            <a href="https://wam.ae/en/article/april-fuel">Read</a>
          </div>
          <div class="card">
            <h5 class="card-title">Weather update</h5>
            <span class="item-date">2025-04-01</span>
            <a href="/en/article/weather">Read</a>
          </div>
          <div class="card">
            <h5 class="card-title">Petrol price announcement</h5>
          </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn search_page_yields_complete_cards_only() {
        let links = parse_search_results(SEARCH_PAGE);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].title, "UAE fuel prices announced for March");
        assert_eq!(links[0].link, "/en/article/march-fuel");
    }

    #[test]
    fn latest_announcement_ignores_unrelated_titles() {
        let latest = latest_announcement(parse_search_results(SEARCH_PAGE)).expect("announcement");
        assert_eq!(latest.date, "2025-03-31");
        assert_eq!(latest.link, "https://wam.ae/en/article/april-fuel");

        let unrelated = vec![ArticleLink {
            title: "Fuel prices rise worldwide".to_string(),
            date: "2025-01-01".to_string(),
            link: "/x".to_string(),
        }];
        assert_eq!(latest_announcement(unrelated), None);
    }

    #[test]
    fn nested_markup_inside_card_titles_is_kept() {
        let page = r#"<div class="search-results">
            <div class="card">
              <h5 class="card-title"><span class="tag">UAE</span> fuel prices announced for May</h5>
              <span class="item-date"><time>2025-04-30</time></span>
              <a href="/en/article/may-fuel">Read</a>
            </div>
          </div>"#;

        let links = parse_search_results(page);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "UAE fuel prices announced for May");
        assert_eq!(links[0].date, "2025-04-30");
        let latest = latest_announcement(links).expect("announcement");
        assert_eq!(latest.link, "/en/article/may-fuel");
    }

    #[test]
    fn equal_dates_pick_the_first_listed_card() {
        let card = |link: &str| ArticleLink {
            title: "Fuel prices announced for June".to_string(),
            date: "2025-05-31".to_string(),
            link: link.to_string(),
        };
        let latest = latest_announcement(vec![card("/first"), card("/second")]).expect("latest");
        assert_eq!(latest.link, "/first");
    }

    #[test]
    fn relative_links_get_source_origin() {
        let origin = origin_of("https://wam.ae/en/search?query=fuel+prices");
        assert_eq!(origin, "https://wam.ae");
        assert_eq!(absolute_url(&origin, "/en/article/1"), "https://wam.ae/en/article/1");
        assert_eq!(absolute_url(&origin, "https://other.ae/a"), "https://other.ae/a");
    }

    #[test]
    fn article_body_paragraphs_are_joined() {
        let html = r#"<div class="header"><p>menu</p></div>
            <div class="article-body"><p>Super 98 <b>petrol</b> will cost AED 2.73.</p>
            <p>Diesel &amp; more.</p></div>"#;
        assert_eq!(
            article_text(html).as_deref(),
            Some("Super 98 petrol will cost AED 2.73. Diesel & more.")
        );
        assert_eq!(article_text("<p>no body</p>"), None);
    }

    #[test]
    fn paragraphs_after_the_article_body_are_ignored() {
        let html = r#"<div class="article-body">
              <div class="lead"><p>Super 98 will cost AED 2.58.</p></div>
              <p>Rates apply from 1 June.</p>
            </div>
            <aside><p>Last month diesel was AED 2.68.</p></aside>"#;

        let text = article_text(html).expect("article body");
        assert_eq!(text, "Super 98 will cost AED 2.58. Rates apply from 1 June.");
        let snapshot = extract_prices(&text, Utc::now(), DEFAULT_SOURCE_NAME).expect("prices");
        assert!(!snapshot.prices.contains_key(&FuelType::Diesel));
    }

    #[test]
    fn prices_follow_aed_marker_or_decimal_pattern() {
        let text = "The Super 98 petrol will cost AED 2.73 per litre, Special 95 will be \
                    2,61 a litre and E-Plus 91 AED 2.54. Diesel will be charged at AED 2.82.";
        let snapshot = extract_prices(text, Utc::now(), DEFAULT_SOURCE_NAME).expect("prices");

        assert_eq!(snapshot.prices[&FuelType::Super], Decimal::new(273, 2));
        assert_eq!(snapshot.prices[&FuelType::Petrol], Decimal::new(261, 2));
        assert_eq!(snapshot.prices[&FuelType::Eplus], Decimal::new(254, 2));
        assert_eq!(snapshot.prices[&FuelType::Diesel], Decimal::new(282, 2));
        assert_eq!(snapshot.source, DEFAULT_SOURCE_NAME);
    }

    #[test]
    fn zero_prices_and_missing_labels_yield_nothing() {
        assert!(extract_prices("Diesel costs AED 0.00 today", Utc::now(), "t").is_none());
        assert!(extract_prices("no fuel mentioned", Utc::now(), "t").is_none());
    }
}
