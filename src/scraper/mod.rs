pub mod http_client;
pub mod links;
pub mod table;

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{Category, RaceTable};
use crate::schema::{CategorySchema, LinkQuirk, RACE_RESULT_MARKER, schema_for};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use self::links::{UrlSet, extract_links};
use self::table::extract_race_table;

// ── Fetch trait ───────────────────────────────────────────────────────────────

/// Swappable page source: HTTP in production, canned pages in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ScrapeResult<String>;
}

// ── formula1.com results site ─────────────────────────────────────────────────

pub struct ResultsSite<F> {
    fetcher: F,
    base_url: Url,
}

impl<F: PageFetcher> ResultsSite<F> {
    pub fn new(fetcher: F, base_url: &str) -> ScrapeResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ScrapeError::Parse(format!("bad base URL {:?}: {}", base_url, e)))?;
        Ok(Self { fetcher, base_url })
    }

    /// Season listing page, e.g. `/en/results.html/2021/races.html`.
    pub fn listing_url(&self, season: &str) -> ScrapeResult<String> {
        self.page_url(&format!("/en/results.html/{}/races.html", season))
    }

    /// Absolute URL for a link target found on the site.
    pub fn page_url(&self, href: &str) -> ScrapeResult<String> {
        self.base_url
            .join(href)
            .map(String::from)
            .map_err(|e| ScrapeError::Parse(format!("bad link {:?}: {}", href, e)))
    }

    async fn fetch_links(&self, href: &str) -> ScrapeResult<Vec<Option<String>>> {
        let url = self.page_url(href)?;
        let html = self.fetcher.fetch(&url).await?;
        Ok(extract_links(&html))
    }

    /// Race-result pages of a season, in listing order.
    ///
    /// An empty set is a valid answer for seasons without published results.
    pub async fn race_urls(&self, season: &str) -> ScrapeResult<UrlSet> {
        let listing = self.listing_url(season)?;
        info!("Fetching {} race listing ({})", season, listing);

        let links = self.fetch_links(&listing).await?;
        let mut urls = UrlSet::new();
        urls.extend_matching(links, &[season, RACE_RESULT_MARKER]);

        if urls.is_empty() {
            warn!("{}: no race-result links on listing page", season);
        }
        info!("{}: {} races", season, urls.len());
        Ok(urls)
    }

    /// Per-race pages of `category` for a season, in race order.
    pub async fn category_urls(&self, season: &str, category: Category) -> ScrapeResult<UrlSet> {
        let races = self.race_urls(season).await?;
        let schema = schema_for(category);
        if category == Category::RaceResults {
            return Ok(races);
        }

        let mut urls = UrlSet::new();
        for race in races.iter() {
            let links = self.fetch_links(race).await?;
            let added = urls.extend_matching(links, &[season, schema.url_marker]);
            debug!("{}: +{} {} links", race, added, category);
        }

        apply_quirks(&mut urls, &schema, season);
        info!("{} {}: {} pages", season, category, urls.len());
        Ok(urls)
    }

    /// Fetch one race page and parse its results table.
    pub async fn race_table(&self, href: &str, schema: &CategorySchema) -> ScrapeResult<RaceTable> {
        let url = self.page_url(href)?;
        let html = self.fetcher.fetch(&url).await?;
        let table = extract_race_table(href, &html, schema)?;
        debug!("{}: {} rows", table.url, table.row_count());
        Ok(table)
    }
}

fn apply_quirks(urls: &mut UrlSet, schema: &CategorySchema, season: &str) {
    if schema.has_quirk(LinkQuirk::DropIndexLink) {
        let index = urls
            .iter()
            .find(|u| schema.is_index_link(u, season))
            .map(str::to_string);
        match index.and_then(|link| urls.remove(&link).map(|pos| (link, pos))) {
            Some((link, 0)) => debug!("Dropping {} index link {}", schema.category, link),
            Some((link, pos)) => warn!(
                "{}: index link {} found at position {} instead of first; dropped",
                schema.category, link, pos
            ),
            None => warn!("{}: no season index link among race pages", schema.category),
        }
    }
}

// ── Test fixtures ─────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    const LISTING: &str = "/en/results.html/2021/races.html";

    fn site(pages: StaticPages) -> ResultsSite<StaticPages> {
        ResultsSite::new(pages, BASE).unwrap()
    }

    #[test]
    fn test_race_urls_filter_and_dedupe() {
        let bahrain = race_href(1064, "bahrain", "race-result");
        let old = "/en/results.html/2020/races/1045/bahrain/race-result.html";
        let pages = StaticPages::default().with(
            LISTING,
            anchors(&[&bahrain, old, &bahrain, "/en/results.html/2021/drivers.html"]),
        );

        let urls = tokio_test::block_on(site(pages).race_urls("2021")).unwrap();
        assert_eq!(urls.into_vec(), vec![bahrain]);
    }

    #[test]
    fn test_race_urls_empty_season_is_ok() {
        let pages = StaticPages::default().with(LISTING, anchors(&["/en/latest.html"]));
        let urls = tokio_test::block_on(site(pages).race_urls("2021")).unwrap();
        assert!(urls.is_empty());
    }

    #[test]
    fn test_listing_fetch_failure() {
        let err = tokio_test::block_on(site(StaticPages::default()).race_urls("2021")).unwrap_err();
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_category_urls_dedupe_across_season() {
        let r1 = race_href(1064, "bahrain", "race-result");
        let r2 = race_href(1065, "italy", "race-result");
        let q1 = race_href(1064, "bahrain", "qualifying");
        let q2 = race_href(1065, "italy", "qualifying");
        let pages = StaticPages::default()
            .with(LISTING, anchors(&[&r1, &r2]))
            .with(&r1, anchors(&[&q1, &r1, &q2]))
            .with(&r2, anchors(&[&q2, &q1, "/en/results.html/2020/races/1/x/qualifying.html"]));

        let urls = site(pages).category_urls("2021", Category::Qualifying).await.unwrap();
        assert_eq!(urls.into_vec(), vec![q1, q2]);
    }

    #[tokio::test]
    async fn test_race_results_delegates_without_extra_fetches() {
        let r1 = race_href(1064, "bahrain", "race-result");
        let pages = StaticPages::default().with(LISTING, anchors(&[&r1]));
        let site = site(pages);

        let urls = site.category_urls("2021", Category::RaceResults).await.unwrap();
        assert_eq!(urls.into_vec(), vec![r1]);
        assert_eq!(site.fetcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fastest_laps_drops_index_link() {
        let index = "/en/results.html/2021/fastest-laps.html";
        let r1 = race_href(1064, "bahrain", "race-result");
        let r2 = race_href(1065, "italy", "race-result");
        let f1 = race_href(1064, "bahrain", "fastest-laps");
        let f2 = race_href(1065, "italy", "fastest-laps");
        let pages = StaticPages::default()
            .with(LISTING, anchors(&[&r1, &r2]))
            .with(&r1, anchors(&[index, &f1]))
            .with(&r2, anchors(&[index, &f2]));

        let urls = site(pages).category_urls("2021", Category::FastestLaps).await.unwrap();
        assert_eq!(urls.into_vec(), vec![f1, f2]);
    }

    #[tokio::test]
    async fn test_fastest_laps_drops_index_link_anywhere() {
        let index = "/en/results.html/2021/fastest-laps.html";
        let r1 = race_href(1064, "bahrain", "race-result");
        let r2 = race_href(1065, "italy", "race-result");
        let f1 = race_href(1064, "bahrain", "fastest-laps");
        let f2 = race_href(1065, "italy", "fastest-laps");
        let pages = StaticPages::default()
            .with(LISTING, anchors(&[&r1, &r2]))
            .with(&r1, anchors(&[&f1, index]))
            .with(&r2, anchors(&[index, &f2]));

        let urls = site(pages).category_urls("2021", Category::FastestLaps).await.unwrap();
        assert_eq!(urls.into_vec(), vec![f1, f2]);
    }

    #[tokio::test]
    async fn test_fastest_laps_without_index_link_keeps_races() {
        let r1 = race_href(1064, "bahrain", "race-result");
        let f1 = race_href(1064, "bahrain", "fastest-laps");
        let pages = StaticPages::default()
            .with(LISTING, anchors(&[&r1]))
            .with(&r1, anchors(&[&f1]));

        let urls = site(pages).category_urls("2021", Category::FastestLaps).await.unwrap();
        assert_eq!(urls.into_vec(), vec![f1]);
    }

    #[tokio::test]
    async fn test_index_drop_is_fastest_laps_only() {
        let r1 = race_href(1064, "bahrain", "race-result");
        let index = "/en/results.html/2021/starting-grid.html";
        let g1 = race_href(1064, "bahrain", "starting-grid");
        let pages = StaticPages::default()
            .with(LISTING, anchors(&[&r1]))
            .with(&r1, anchors(&[index, &g1]));

        let urls = site(pages).category_urls("2021", Category::StartingGrid).await.unwrap();
        assert_eq!(urls.into_vec(), vec![index.to_string(), g1]);
    }

    #[tokio::test]
    async fn test_race_page_fetch_failure_is_fatal() {
        let r1 = race_href(1064, "bahrain", "race-result");
        let r2 = race_href(1065, "italy", "race-result");
        let pages = StaticPages::default()
            .with(LISTING, anchors(&[&r1, &r2]))
            .with(&r1, anchors(&[&race_href(1064, "bahrain", "qualifying")]));

        let err = site(pages)
            .category_urls("2021", Category::Qualifying)
            .await
            .unwrap_err();
        assert!(err.is_fetch());
    }
}
