//! Naver Finance scrapers: theme index, theme member tables, market-cap
//! listing. All pages are EUC-KR HTML; parsing is split into pure functions
//! over the fetched text so it tests offline.

use crate::config::ScraperConfig;
use crate::models::{MarketCapRow, ThemeListRow, ThemeMembership};
use crate::scraper::cleaner::{clean_price_diff, clean_text, pad_code, parse_count, parse_pct, parse_price};
use crate::scraper::http_client::HttpClient;
use anyhow::{Context, Result};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

fn sel(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow::anyhow!("selector {}: {:?}", s, e))
}

pub struct NaverScraper {
    client: HttpClient,
    base_url: String,
    theme_pages: u32,
    market_cap_page_limit: u32,
}

impl NaverScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url: config.naver_base_url.trim_end_matches('/').to_string(),
            theme_pages: config.theme_pages,
            market_cap_page_limit: config.market_cap_page_limit,
        })
    }

    // ── Theme index ───────────────────────────────────────────────────────────

    /// Scrape every theme index page (1..=theme_pages).
    pub async fn fetch_theme_list(&self) -> Result<Vec<ThemeListRow>> {
        let mut all = Vec::new();
        for page in 1..=self.theme_pages {
            let url = format!("{}/sise/theme.naver?&page={}", self.base_url, page);
            info!("Fetching theme index page {} ({})", page, url);

            let html = self
                .client
                .get_text_euckr(&url)
                .await
                .with_context(|| format!("Failed to fetch theme index page {}", page))?;

            let rows = parse_theme_index(&html)?;
            debug!("  page {}: {} themes", page, rows.len());
            all.extend(rows);
        }
        info!("Theme index: {} themes total", all.len());
        Ok(all)
    }

    // ── Theme members ─────────────────────────────────────────────────────────

    /// Scrape each theme's member table, in the order the index listed them.
    pub async fn fetch_theme_members(
        &self,
        themes: &[ThemeListRow],
    ) -> Result<Vec<ThemeMembership>> {
        let mut all = Vec::new();
        for (i, theme) in themes.iter().enumerate() {
            let url = format!(
                "{}/sise/sise_group_detail.naver?type=theme&no={}",
                self.base_url, theme.detail_no
            );
            info!("[{}/{}] {} ({})", i + 1, themes.len(), theme.theme, url);

            let html = self
                .client
                .get_text_euckr(&url)
                .await
                .with_context(|| format!("Failed to fetch theme detail '{}'", theme.theme))?;

            let members = parse_theme_detail(&html, &theme.theme, theme.change_pct)?;
            if members.is_empty() {
                warn!("{}: no member rows found", theme.theme);
            }
            all.extend(members);
        }
        info!("Theme members: {} edges total", all.len());
        Ok(all)
    }

    // ── Market-cap listing ────────────────────────────────────────────────────

    /// Scrape the market-cap listing for KOSPI (sosok=0) and KOSDAQ (sosok=1),
    /// paging until a page yields no rows.
    pub async fn fetch_market_cap(&self) -> Result<Vec<MarketCapRow>> {
        let mut all = Vec::new();
        for sosok in 0..=1u32 {
            let segment = if sosok == 0 { "KOSPI" } else { "KOSDAQ" };
            for page in 1..=self.market_cap_page_limit {
                let url = format!(
                    "{}/sise/sise_market_sum.naver?sosok={}&page={}",
                    self.base_url, sosok, page
                );
                debug!("Fetching market-cap page: {}", url);

                let html = self
                    .client
                    .get_text_euckr(&url)
                    .await
                    .with_context(|| format!("Failed to fetch market-cap page {} ({})", page, segment))?;

                let rows = parse_market_cap_page(&html, segment)?;
                if rows.is_empty() {
                    debug!("{} page {} empty — stopping pagination", segment, page);
                    break;
                }
                all.extend(rows);
            }
        }
        info!("Market-cap listing: {} rows total", all.len());
        Ok(all)
    }
}

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Theme index page: `table.type_1`, two header rows, first cell links to the
/// detail page (`no=` query value), second cell is the theme's change%.
pub fn parse_theme_index(html: &str) -> Result<Vec<ThemeListRow>> {
    let doc = Html::parse_document(html);
    let row_sel = sel("table.type_1 tr")?;
    let td_sel = sel("td")?;
    let a_sel = sel("a")?;

    let mut rows = Vec::new();
    for tr in doc.select(&row_sel) {
        let tds: Vec<_> = tr.select(&td_sel).collect();
        if tds.len() < 2 {
            continue;
        }
        let Some(link) = tds[0].select(&a_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(no) = href.split("no=").nth(1) else {
            continue;
        };

        let theme = clean_text(&link.text().collect::<String>());
        if theme.is_empty() {
            continue;
        }

        rows.push(ThemeListRow {
            theme,
            change_pct: parse_pct(&tds[1].text().collect::<String>()),
            detail_no: no.split('&').next().unwrap_or(no).to_string(),
        });
    }
    Ok(rows)
}

/// Theme detail page: `table.type_5`, member name links carry `code=` in the
/// href, the inclusion blurb sits in `p.info_txt` of the second cell.
pub fn parse_theme_detail(
    html: &str,
    theme: &str,
    theme_change_pct: Option<f64>,
) -> Result<Vec<ThemeMembership>> {
    let doc = Html::parse_document(html);
    let row_sel = sel("table.type_5 tr")?;
    let td_sel = sel("td")?;
    let a_sel = sel("a")?;
    let reason_sel = sel("p.info_txt")?;

    let mut members = Vec::new();
    for tr in doc.select(&row_sel) {
        let tds: Vec<_> = tr.select(&td_sel).collect();
        if tds.len() < 8 {
            continue;
        }
        let Some(link) = tds[0].select(&a_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(raw_code) = href.split("code=").nth(1) else {
            continue;
        };

        let reason = tds[1]
            .select(&reason_sel)
            .next()
            .map(|p| clean_text(&p.text().collect::<String>()))
            .unwrap_or_default();

        members.push(ThemeMembership {
            theme: theme.to_string(),
            theme_change_pct,
            code: pad_code(raw_code.split('&').next().unwrap_or(raw_code)),
            name: clean_text(&link.text().collect::<String>()),
            price_diff: clean_price_diff(&tds[3].text().collect::<String>()),
            change_pct: parse_pct(&tds[4].text().collect::<String>()),
            volume: parse_count(&tds[7].text().collect::<String>()),
            inclusion_reason: reason,
        });
    }
    Ok(members)
}

/// Market-cap listing page: `table.type_2 tbody tr`, placeholder rows have a
/// single cell and are skipped.
pub fn parse_market_cap_page(html: &str, segment: &str) -> Result<Vec<MarketCapRow>> {
    let doc = Html::parse_document(html);
    let row_sel = sel("table.type_2 tbody tr")?;
    let td_sel = sel("td")?;
    let a_sel = sel("a")?;

    let mut rows = Vec::new();
    for tr in doc.select(&row_sel) {
        let tds: Vec<_> = tr.select(&td_sel).collect();
        if tds.len() <= 1 {
            continue;
        }
        let Some(link) = tds.get(1).and_then(|td| td.select(&a_sel).next()) else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(raw_code) = href.split("code=").nth(1) else {
            continue;
        };

        let cell = |i: usize| {
            tds.get(i)
                .map(|td| td.text().collect::<String>())
                .unwrap_or_default()
        };

        rows.push(MarketCapRow {
            code: pad_code(raw_code.split('&').next().unwrap_or(raw_code)),
            name: clean_text(&link.text().collect::<String>()),
            segment: segment.to_string(),
            price: parse_price(&cell(2)),
            price_diff: clean_price_diff(&cell(3)),
            change_pct: parse_pct(&cell(4)),
            volume: parse_count(&cell(9)),
            per: parse_price(&cell(10)),
        });
    }
    Ok(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const THEME_INDEX: &str = r#"
    <table class="type_1">
      <tr><th>테마명</th><th>전일대비</th></tr>
      <tr><td colspan="2">구분선</td></tr>
      <tr>
        <td><a href="/sise/sise_group_detail.naver?type=theme&no=62">2차전지</a></td>
        <td>+2.41%</td>
      </tr>
      <tr>
        <td><a href="/sise/sise_group_detail.naver?type=theme&no=442">AI 반도체</a></td>
        <td>-0.85%</td>
      </tr>
    </table>"#;

    #[test]
    fn test_parse_theme_index() {
        let rows = parse_theme_index(THEME_INDEX).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].theme, "2차전지");
        assert_eq!(rows[0].detail_no, "62");
        assert_eq!(rows[0].change_pct, Some(2.41));
        assert_eq!(rows[1].theme, "AI 반도체");
        assert_eq!(rows[1].change_pct, Some(-0.85));
    }

    const THEME_DETAIL: &str = r#"
    <table class="type_5">
      <tr><th>종목명</th></tr>
      <tr><td colspan="8">헤더</td></tr>
      <tr>
        <td><a href="/item/main.naver?code=5930">삼성전자</a></td>
        <td><p class="info_txt">반도체 대장주</p></td>
        <td>53,100</td>
        <td>상승
            600</td>
        <td>+1.14%</td>
        <td>52,800</td>
        <td>53,400</td>
        <td>12,345,678</td>
      </tr>
    </table>"#;

    #[test]
    fn test_parse_theme_detail() {
        let members = parse_theme_detail(THEME_DETAIL, "반도체", Some(1.5)).unwrap();
        assert_eq!(members.len(), 1);
        let m = &members[0];
        assert_eq!(m.theme, "반도체");
        assert_eq!(m.theme_change_pct, Some(1.5));
        assert_eq!(m.code, "005930"); // padded from "5930"
        assert_eq!(m.name, "삼성전자");
        assert_eq!(m.price_diff, "+ 600");
        assert_eq!(m.change_pct, Some(1.14));
        assert_eq!(m.volume, Some(12_345_678));
        assert_eq!(m.inclusion_reason, "반도체 대장주");
    }

    const MARKET_CAP: &str = r#"
    <table class="type_2">
      <tbody>
        <tr><td>빈 행</td></tr>
        <tr>
          <td>1</td>
          <td><a href="/item/main.naver?code=005930">삼성전자</a></td>
          <td>53,100</td>
          <td>상승 600</td>
          <td>+1.14%</td>
          <td>100</td><td>5,969,782</td><td>317,040</td><td>52.68</td>
          <td>12,345,678</td>
          <td>10.55</td>
        </tr>
      </tbody>
    </table>"#;

    #[test]
    fn test_parse_market_cap_page() {
        let rows = parse_market_cap_page(MARKET_CAP, "KOSPI").unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.code, "005930");
        assert_eq!(r.name, "삼성전자");
        assert_eq!(r.segment, "KOSPI");
        assert_eq!(r.price, Some(53_100.0));
        assert_eq!(r.change_pct, Some(1.14));
        assert_eq!(r.volume, Some(12_345_678));
        assert_eq!(r.per, Some(10.55));
    }

    #[test]
    fn test_empty_page_has_no_rows() {
        let rows = parse_market_cap_page("<table class=\"type_2\"><tbody></tbody></table>", "KOSDAQ")
            .unwrap();
        assert!(rows.is_empty());
    }
}
