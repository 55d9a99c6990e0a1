//! Sitemap and robots.txt generation.
//!
//! Indexable routes go into a `<urlset>` with `xhtml:link` hreflang
//! alternates. Sites with more URLs than one sitemap may hold are split into
//! numbered files referenced from a `<sitemapindex>`.
//!
//! ```text
//! output_dir/
//! ├── sitemap.xml        # urlset, or sitemapindex when split
//! ├── sitemap-1.xml      # only when split
//! └── robots.txt
//! ```

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::config::SiteConfig;
use crate::routes::Route;

/// Sitemap protocol limit on URLs per file.
pub const MAX_URLS_PER_SITEMAP: usize = 50_000;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// A generated sitemap file, relative to the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapFile {
    pub name: String,
    pub xml: String,
}

type XmlWriter = Writer<Vec<u8>>;

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> Result<(), Box<dyn Error>> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn hreflang_link(w: &mut XmlWriter, hreflang: &str, href: &str) -> Result<(), Box<dyn Error>> {
    let link = BytesStart::new("xhtml:link").with_attributes([
        ("rel", "alternate"),
        ("hreflang", hreflang),
        ("href", href),
    ]);
    w.write_event(Event::Empty(link))?;
    Ok(())
}

fn new_writer() -> Result<XmlWriter, Box<dyn Error>> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(w)
}

fn finish(w: XmlWriter) -> Result<String, Box<dyn Error>> {
    let mut xml = String::from_utf8(w.into_inner())?;
    xml.push('\n');
    Ok(xml)
}

/// Render one `<urlset>` document.
fn urlset(routes: &[&Route], site: &SiteConfig) -> Result<String, Box<dyn Error>> {
    let mut w = new_writer()?;
    let root = BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS), ("xmlns:xhtml", XHTML_NS)]);
    w.write_event(Event::Start(root))?;

    for route in routes {
        w.write_event(Event::Start(BytesStart::new("url")))?;
        text_element(&mut w, "loc", &route.url(site))?;
        if let Some(lastmod) = route.lastmod {
            text_element(&mut w, "lastmod", &lastmod.format("%Y-%m-%d").to_string())?;
        }
        text_element(&mut w, "changefreq", route.changefreq.as_str())?;
        text_element(&mut w, "priority", &format!("{:.1}", route.priority))?;
        for alt in &route.alternates {
            hreflang_link(&mut w, alt.lang.html_lang(), &site.url(&alt.path))?;
        }
        if let Some(x_default) = route.x_default(site.default_language) {
            hreflang_link(&mut w, "x-default", &site.url(&x_default.path))?;
        }
        w.write_event(Event::End(BytesEnd::new("url")))?;
    }

    w.write_event(Event::End(BytesEnd::new("urlset")))?;
    finish(w)
}

/// Render a `<sitemapindex>` pointing at the numbered sitemaps.
fn sitemap_index(files: &[SitemapFile], site: &SiteConfig) -> Result<String, Box<dyn Error>> {
    let mut w = new_writer()?;
    let root = BytesStart::new("sitemapindex").with_attributes([("xmlns", SITEMAP_NS)]);
    w.write_event(Event::Start(root))?;
    for file in files {
        w.write_event(Event::Start(BytesStart::new("sitemap")))?;
        text_element(&mut w, "loc", &site.url(&format!("/{}", file.name)))?;
        w.write_event(Event::End(BytesEnd::new("sitemap")))?;
    }
    w.write_event(Event::End(BytesEnd::new("sitemapindex")))?;
    finish(w)
}

/// Build the sitemap files for all indexable routes.
pub fn build_sitemap(routes: &[Route], site: &SiteConfig) -> Result<Vec<SitemapFile>, Box<dyn Error>> {
    build_sitemap_with_limit(routes, site, MAX_URLS_PER_SITEMAP)
}

fn build_sitemap_with_limit(
    routes: &[Route],
    site: &SiteConfig,
    max_urls: usize,
) -> Result<Vec<SitemapFile>, Box<dyn Error>> {
    let indexable: Vec<&Route> = routes.iter().filter(|r| r.indexable).collect();
    if indexable.len() <= max_urls {
        return Ok(vec![SitemapFile {
            name: "sitemap.xml".to_string(),
            xml: urlset(&indexable, site)?,
        }]);
    }

    let mut files = indexable
        .chunks(max_urls.max(1))
        .enumerate()
        .map(|(i, chunk)| -> Result<SitemapFile, Box<dyn Error>> {
            Ok(SitemapFile {
                name: format!("sitemap-{}.xml", i + 1),
                xml: urlset(chunk, site)?,
            })
        })
        .collect::<Result<Vec<_>, Box<dyn Error>>>()?;
    let index = SitemapFile {
        name: "sitemap.xml".to_string(),
        xml: sitemap_index(&files, site)?,
    };
    files.insert(0, index);
    Ok(files)
}

/// `robots.txt` allowing everything but the admin UI.
pub fn build_robots(site: &SiteConfig) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /admin\n\nSitemap: {}\n",
        site.url("/sitemap.xml")
    )
}

/// Write the sitemap file(s) under `output_dir`, returning the URL count.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_sitemap(
    routes: &[Route],
    site: &SiteConfig,
    output_dir: &Path,
) -> Result<usize, Box<dyn Error>> {
    let files = build_sitemap(routes, site)?;
    for file in &files {
        fs::write(output_dir.join(&file.name), &file.xml).await?;
    }
    let urls = routes.iter().filter(|r| r.indexable).count();
    info!(urls, files = files.len(), "Wrote sitemap");
    Ok(urls)
}

#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_robots(site: &SiteConfig, output_dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::write(output_dir.join("robots.txt"), build_robots(site)).await?;
    info!("Wrote robots.txt");
    Ok(())
}
