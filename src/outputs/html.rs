//! Static HTML pre-rendering.
//!
//! Each route becomes a complete HTML document: SEO head (canonical,
//! hreflang alternates, Open Graph, JSON-LD), a crawlable pre-rendered body
//! inside the SPA mount point, and the `window.__INITIAL_DATA__` blob the
//! client bundle hydrates from.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── index.html               # pt home
//! ├── 404.html
//! ├── blog/
//! │   ├── index.html
//! │   └── {slug}/index.html
//! └── en/
//!     ├── index.html
//!     └── blog/{slug}/index.html
//! ```

use futures::stream::{self, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AssetsConfig, Config, SiteConfig};
use crate::models::{Lang, Post};
use crate::outputs::json::LocalizedPost;
use crate::routes::{self, Route, RouteKind};
use crate::utils::html_escape;

const WRITE_CONCURRENCY: usize = 16;

/// Interface strings of the pre-rendered markup.
struct Labels {
    blog: &'static str,
    page: &'static str,
    category: &'static str,
    tag: &'static str,
    newer: &'static str,
    older: &'static str,
    min_read: &'static str,
    not_found_title: &'static str,
    not_found_body: &'static str,
}

const LABELS_PT: Labels = Labels {
    blog: "Blog",
    page: "Página",
    category: "Categoria",
    tag: "Tag",
    newer: "Mais recentes",
    older: "Mais antigos",
    min_read: "min de leitura",
    not_found_title: "Página não encontrada",
    not_found_body: "O conteúdo que você procura não existe ou foi movido.",
};

const LABELS_EN: Labels = Labels {
    blog: "Blog",
    page: "Page",
    category: "Category",
    tag: "Tag",
    newer: "Newer posts",
    older: "Older posts",
    min_read: "min read",
    not_found_title: "Page not found",
    not_found_body: "The page you are looking for does not exist or has moved.",
};

const LABELS_ES: Labels = Labels {
    blog: "Blog",
    page: "Página",
    category: "Categoría",
    tag: "Etiqueta",
    newer: "Más recientes",
    older: "Más antiguos",
    min_read: "min de lectura",
    not_found_title: "Página no encontrada",
    not_found_body: "El contenido que buscas no existe o se ha movido.",
};

fn labels(lang: Lang) -> &'static Labels {
    match lang {
        Lang::Pt => &LABELS_PT,
        Lang::En => &LABELS_EN,
        Lang::Es => &LABELS_ES,
    }
}

/// Everything page rendering needs besides the route itself.
pub struct PageContext<'a> {
    pub site: &'a SiteConfig,
    pub assets: &'a AssetsConfig,
    posts: HashMap<&'a str, &'a Post>,
}

impl<'a> PageContext<'a> {
    pub fn new(config: &'a Config, posts: &'a [Post]) -> Self {
        Self {
            site: &config.site,
            assets: &config.assets,
            posts: posts.iter().map(|p| (p.id.as_str(), p)).collect(),
        }
    }

    fn post(&self, id: &str) -> Option<&'a Post> {
        self.posts.get(id).copied()
    }
}

/// Head and body pieces that vary by route kind.
struct PageMeta {
    title: String,
    description: Option<String>,
    og_type: &'static str,
    image: Option<String>,
    json_ld: Option<Value>,
    body: String,
    data: Value,
}

/// Serialize a value for embedding inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

fn post_list(route: &Route, ctx: &PageContext) -> (String, Vec<Value>) {
    let labels = labels(route.lang);
    let mut html = String::from("<ul class=\"post-list\">\n");
    let mut data = Vec::new();
    for id in &route.listing {
        let Some(summary) = ctx.post(id).and_then(|p| p.summary(route.lang)) else {
            continue;
        };
        let href = routes::post_path(route.lang, &summary.slug, ctx.site);
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a>",
            html_escape(&href),
            html_escape(&summary.title)
        ));
        if let Some(excerpt) = &summary.excerpt {
            html.push_str(&format!("<p>{}</p>", html_escape(excerpt)));
        }
        html.push_str(&format!(
            "<small>{} {}</small></li>\n",
            summary.reading_minutes, labels.min_read
        ));
        data.push(json!(summary));
    }
    html.push_str("</ul>\n");
    (html, data)
}

fn pagination(route: &Route, page: usize, total_pages: usize, site: &SiteConfig) -> String {
    let labels = labels(route.lang);
    let mut nav = String::new();
    if page > 1 {
        nav.push_str(&format!(
            "<a rel=\"prev\" href=\"{}\">{}</a>",
            routes::blog_path(route.lang, page - 1, site),
            labels.newer
        ));
    }
    if page < total_pages {
        nav.push_str(&format!(
            "<a rel=\"next\" href=\"{}\">{}</a>",
            routes::blog_path(route.lang, page + 1, site),
            labels.older
        ));
    }
    if nav.is_empty() {
        nav
    } else {
        format!("<nav class=\"pagination\">{nav}</nav>\n")
    }
}

fn listing_meta(route: &Route, ctx: &PageContext, heading: String, title: String) -> PageMeta {
    let (list, posts) = post_list(route, ctx);
    PageMeta {
        title,
        description: ctx.site.description(route.lang).map(str::to_string),
        og_type: "website",
        image: None,
        json_ld: None,
        body: format!("<h1>{}</h1>\n{list}", html_escape(&heading)),
        data: json!({ "posts": posts }),
    }
}

fn not_found_meta(lang: Lang, site: &SiteConfig) -> PageMeta {
    let labels = labels(lang);
    PageMeta {
        title: format!("{} | {}", labels.not_found_title, site.name),
        description: None,
        og_type: "website",
        image: None,
        json_ld: None,
        body: format!(
            "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"{}\">{}</a></p>\n",
            labels.not_found_title,
            labels.not_found_body,
            routes::home_path(lang, site),
            html_escape(&site.name)
        ),
        data: json!({}),
    }
}

fn post_meta(route: &Route, post: &Post, ctx: &PageContext) -> Option<PageMeta> {
    let content = post.content(route.lang)?;
    let labels = labels(route.lang);
    let site = ctx.site;

    let mut body = String::from("<article>\n");
    body.push_str(&format!("<h1>{}</h1>\n", html_escape(&content.title)));
    if let Some(published) = post.published_at {
        body.push_str(&format!(
            "<time datetime=\"{}\">{}</time>\n",
            published.to_rfc3339(),
            published.format("%Y-%m-%d")
        ));
    }
    if let Some(cat) = &post.category {
        body.push_str(&format!(
            "<a class=\"category\" href=\"{}\">{}</a>\n",
            html_escape(&routes::category_path(route.lang, &cat.slug, site)),
            html_escape(&cat.name)
        ));
    }
    // body HTML comes from the CMS and is embedded as-is
    body.push_str(&content.body);
    body.push('\n');
    if !post.tags.is_empty() {
        body.push_str(&format!("<ul class=\"tags\" aria-label=\"{}\">", labels.tag));
        for tag in &post.tags {
            body.push_str(&format!(
                "<li><a href=\"{}\">#{}</a></li>",
                html_escape(&routes::tag_path(route.lang, &tag.slug, site)),
                html_escape(&tag.name)
            ));
        }
        body.push_str("</ul>\n");
    }
    body.push_str("</article>\n");

    let url = route.url(site);
    let mut ld = json!({
        "@context": "https://schema.org",
        "@type": "BlogPosting",
        "headline": content.title,
        "inLanguage": route.lang.html_lang(),
        "mainEntityOfPage": url,
        "url": url,
    });
    if let Some(description) = content.seo_description() {
        ld["description"] = json!(description);
    }
    if let Some(published) = post.published_at {
        ld["datePublished"] = json!(published.to_rfc3339());
    }
    if let Some(modified) = post.last_modified() {
        ld["dateModified"] = json!(modified.to_rfc3339());
    }
    if let Some(author) = &post.author {
        ld["author"] = json!({ "@type": "Person", "name": author });
    }
    if let Some(image) = &post.cover_image {
        ld["image"] = json!(absolute(image, site));
    }

    Some(PageMeta {
        title: format!("{} | {}", content.seo_title(), site.name),
        description: content.seo_description().map(str::to_string),
        og_type: "article",
        image: post.cover_image.as_deref().map(|i| absolute(i, site)),
        json_ld: Some(ld),
        body,
        data: json!({ "post": LocalizedPost::new(post, route.lang) }),
    })
}

/// Root-relative asset paths become absolute for Open Graph and JSON-LD.
fn absolute(path: &str, site: &SiteConfig) -> String {
    if path.starts_with('/') {
        site.url(path)
    } else {
        path.to_string()
    }
}

fn page_meta(route: &Route, ctx: &PageContext) -> PageMeta {
    let site = ctx.site;
    let labels = labels(route.lang);
    match &route.kind {
        RouteKind::Home => {
            let mut meta = listing_meta(route, ctx, site.name.clone(), site.name.clone());
            meta.json_ld = Some(json!({
                "@context": "https://schema.org",
                "@type": "WebSite",
                "name": site.name,
                "url": route.url(site),
                "inLanguage": route.lang.html_lang(),
            }));
            meta
        }
        RouteKind::BlogIndex { page, total_pages } => {
            let heading = if *page > 1 {
                format!("{} · {} {page}", labels.blog, labels.page)
            } else {
                labels.blog.to_string()
            };
            let title = format!("{heading} | {}", site.name);
            let mut meta = listing_meta(route, ctx, heading, title);
            meta.body.push_str(&pagination(route, *page, *total_pages, site));
            meta.data["page"] = json!(page);
            meta.data["totalPages"] = json!(total_pages);
            meta
        }
        RouteKind::Post { id } => match ctx.post(id).and_then(|p| post_meta(route, p, ctx)) {
            Some(meta) => meta,
            None => {
                warn!(path = %route.path, %id, "Post route without matching post");
                not_found_meta(route.lang, site)
            }
        },
        RouteKind::Category { name, .. } => {
            let heading = format!("{}: {name}", labels.category);
            let title = format!("{heading} | {}", site.name);
            listing_meta(route, ctx, heading, title)
        }
        RouteKind::Tag { name, .. } => {
            let heading = format!("{}: {name}", labels.tag);
            let title = format!("{heading} | {}", site.name);
            listing_meta(route, ctx, heading, title)
        }
        RouteKind::Static { page } => PageMeta {
            title: format!("{} | {}", page.title(route.lang), site.name),
            description: site.description(route.lang).map(str::to_string),
            og_type: "website",
            image: None,
            json_ld: None,
            body: format!("<h1>{}</h1>\n", html_escape(page.title(route.lang))),
            data: json!({}),
        },
        RouteKind::NotFound => not_found_meta(route.lang, site),
    }
}

/// Render one route to a full HTML document.
pub fn render_page(route: &Route, ctx: &PageContext) -> String {
    let site = ctx.site;
    let meta = page_meta(route, ctx);
    let url = route.url(site);

    let mut head = String::new();
    head.push_str("<meta charset=\"utf-8\">\n");
    head.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    head.push_str(&format!("<title>{}</title>\n", html_escape(&meta.title)));
    if let Some(description) = &meta.description {
        head.push_str(&format!(
            "<meta name=\"description\" content=\"{}\">\n",
            html_escape(description)
        ));
    }
    if route.indexable {
        head.push_str(&format!("<link rel=\"canonical\" href=\"{}\">\n", html_escape(&url)));
    } else {
        head.push_str("<meta name=\"robots\" content=\"noindex\">\n");
    }
    for alt in &route.alternates {
        head.push_str(&format!(
            "<link rel=\"alternate\" hreflang=\"{}\" href=\"{}\">\n",
            alt.lang.html_lang(),
            html_escape(&site.url(&alt.path))
        ));
    }
    if let Some(x_default) = route.x_default(site.default_language) {
        head.push_str(&format!(
            "<link rel=\"alternate\" hreflang=\"x-default\" href=\"{}\">\n",
            html_escape(&site.url(&x_default.path))
        ));
    }

    let og = [
        ("og:site_name", Some(site.name.clone())),
        ("og:type", Some(meta.og_type.to_string())),
        ("og:title", Some(meta.title.clone())),
        ("og:description", meta.description.clone()),
        ("og:url", Some(url)),
        ("og:locale", Some(route.lang.og_locale().to_string())),
        ("og:image", meta.image.clone()),
    ];
    for (property, content) in og {
        if let Some(content) = content {
            head.push_str(&format!(
                "<meta property=\"{property}\" content=\"{}\">\n",
                html_escape(&content)
            ));
        }
    }
    for alt in route.alternates.iter().filter(|a| a.lang != route.lang) {
        head.push_str(&format!(
            "<meta property=\"og:locale:alternate\" content=\"{}\">\n",
            alt.lang.og_locale()
        ));
    }
    if let Some(ld) = &meta.json_ld {
        head.push_str(&format!(
            "<script type=\"application/ld+json\">{}</script>\n",
            script_json(ld)
        ));
    }
    if let Some(stylesheet) = &ctx.assets.stylesheet {
        head.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">\n", html_escape(stylesheet)));
    }

    let mut data = meta.data;
    data["route"] = json!(route);
    data["lang"] = json!(route.lang);

    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n{head}</head>\n<body>\n\
         <div id=\"root\">\n{body}</div>\n\
         <script>window.__INITIAL_DATA__ = {data};</script>\n\
         <script type=\"module\" src=\"{script}\"></script>\n\
         </body>\n</html>\n",
        lang = route.lang.html_lang(),
        body = meta.body,
        data = script_json(&data),
        script = html_escape(&ctx.assets.script),
    )
}

/// Render and write every route under `output_dir`, returning the number of
/// pages written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), routes = routes.len()))]
pub async fn write_pages(
    routes: &[Route],
    ctx: &PageContext<'_>,
    output_dir: &Path,
) -> Result<usize, Box<dyn Error>> {
    let results: Vec<Result<(), String>> = stream::iter(routes)
        .map(|route| async move {
            let path = output_dir.join(route.output_file());
            let html = render_page(route, ctx);
            let write = async {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&path, html).await
            };
            match write.await {
                Ok(()) => {
                    debug!(path = %path.display(), "Wrote page");
                    Ok(())
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to write page");
                    Err(route.path.clone())
                }
            }
        })
        .buffer_unordered(WRITE_CONCURRENCY)
        .collect()
        .await;

    let failed: Vec<String> = results.into_iter().filter_map(Result::err).collect();
    if !failed.is_empty() {
        return Err(format!("failed to write {} page(s), first: {}", failed.len(), failed[0]).into());
    }
    info!(pages = routes.len(), "Wrote HTML pages");
    Ok(routes.len())
}
