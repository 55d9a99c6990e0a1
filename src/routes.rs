//! Static route generation.
//!
//! Turns the normalized post list into every page the site serves, per
//! language, with hreflang alternates and the sitemap metadata each page
//! carries. The HTML and sitemap writers only consume [`Route`]s.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use crate::config::SiteConfig;
use crate::models::{Lang, Post, Taxonomy};

/// Pages that exist in every language and carry no post data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticPage {
    About,
    Contact,
    Privacy,
}

impl StaticPage {
    pub const ALL: [StaticPage; 3] = [StaticPage::About, StaticPage::Contact, StaticPage::Privacy];

    /// Localized path segment.
    pub fn segment(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (StaticPage::About, Lang::Pt | Lang::Es) => "sobre",
            (StaticPage::About, Lang::En) => "about",
            (StaticPage::Contact, Lang::Pt) => "contato",
            (StaticPage::Contact, Lang::En) => "contact",
            (StaticPage::Contact, Lang::Es) => "contacto",
            (StaticPage::Privacy, Lang::Pt) => "privacidade",
            (StaticPage::Privacy, Lang::En) => "privacy",
            (StaticPage::Privacy, Lang::Es) => "privacidad",
        }
    }

    pub fn title(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (StaticPage::About, Lang::Pt) => "Sobre",
            (StaticPage::About, Lang::En) => "About",
            (StaticPage::About, Lang::Es) => "Acerca de",
            (StaticPage::Contact, Lang::Pt) => "Contato",
            (StaticPage::Contact, Lang::En) => "Contact",
            (StaticPage::Contact, Lang::Es) => "Contacto",
            (StaticPage::Privacy, Lang::Pt) => "Política de Privacidade",
            (StaticPage::Privacy, Lang::En) => "Privacy Policy",
            (StaticPage::Privacy, Lang::Es) => "Política de Privacidad",
        }
    }
}

fn category_segment(lang: Lang) -> &'static str {
    match lang {
        Lang::Pt | Lang::Es => "categoria",
        Lang::En => "category",
    }
}

fn tag_segment(lang: Lang) -> &'static str {
    match lang {
        Lang::Pt | Lang::En => "tag",
        Lang::Es => "etiqueta",
    }
}

fn page_segment(lang: Lang) -> &'static str {
    match lang {
        Lang::Pt | Lang::Es => "pagina",
        Lang::En => "page",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Changefreq {
    Daily,
    Weekly,
    Yearly,
    Never,
}

impl Changefreq {
    pub fn as_str(self) -> &'static str {
        match self {
            Changefreq::Daily => "daily",
            Changefreq::Weekly => "weekly",
            Changefreq::Yearly => "yearly",
            Changefreq::Never => "never",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteKind {
    Home,
    BlogIndex { page: usize, total_pages: usize },
    Post { id: String },
    Category { slug: String, name: String },
    Tag { slug: String, name: String },
    Static { page: StaticPage },
    NotFound,
}

/// The same page in another language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternate {
    pub lang: Lang,
    pub path: String,
}

/// One generated page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Site path, always starting with `/`, no trailing slash except home.
    pub path: String,
    pub lang: Lang,
    pub kind: RouteKind,
    /// Includes the route itself when it has any.
    pub alternates: Vec<Alternate>,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: Changefreq,
    pub priority: f32,
    pub indexable: bool,
    /// Ids of the posts this page lists, in display order.
    pub listing: Vec<String>,
}

impl Route {
    /// File the page is written to, relative to the output directory.
    pub fn output_file(&self) -> PathBuf {
        match self.path.trim_matches('/') {
            "" => PathBuf::from("index.html"),
            "404" => PathBuf::from("404.html"),
            rel => PathBuf::from(rel).join("index.html"),
        }
    }

    pub fn url(&self, site: &SiteConfig) -> String {
        site.url(&self.path)
    }

    /// Target of the `x-default` hreflang: the default-language version, or
    /// the first alternate.
    pub fn x_default(&self, default: Lang) -> Option<&Alternate> {
        self.alternates
            .iter()
            .find(|a| a.lang == default)
            .or_else(|| self.alternates.first())
    }
}

/// Path prefix for a language: empty for the unprefixed default language.
pub fn lang_prefix(lang: Lang, site: &SiteConfig) -> String {
    if lang == site.default_language && !site.prefix_default_language {
        String::new()
    } else {
        format!("/{}", lang.code())
    }
}

pub fn home_path(lang: Lang, site: &SiteConfig) -> String {
    let prefix = lang_prefix(lang, site);
    if prefix.is_empty() { "/".to_string() } else { prefix }
}

pub fn blog_path(lang: Lang, page: usize, site: &SiteConfig) -> String {
    let prefix = lang_prefix(lang, site);
    if page <= 1 {
        format!("{prefix}/blog")
    } else {
        format!("{prefix}/blog/{}/{page}", page_segment(lang))
    }
}

pub fn post_path(lang: Lang, slug: &str, site: &SiteConfig) -> String {
    format!("{}/blog/{slug}", lang_prefix(lang, site))
}

pub fn category_path(lang: Lang, slug: &str, site: &SiteConfig) -> String {
    format!("{}/{}/{slug}", lang_prefix(lang, site), category_segment(lang))
}

pub fn tag_path(lang: Lang, slug: &str, site: &SiteConfig) -> String {
    format!("{}/{}/{slug}", lang_prefix(lang, site), tag_segment(lang))
}

pub fn static_path(page: StaticPage, lang: Lang, site: &SiteConfig) -> String {
    format!("{}/{}", lang_prefix(lang, site), page.segment(lang))
}

/// Posts of one language grouped the way listing pages need them.
struct LangIndex<'a> {
    posts: Vec<&'a Post>,
    categories: BTreeMap<String, (Taxonomy, Vec<&'a Post>)>,
    tags: BTreeMap<String, (Taxonomy, Vec<&'a Post>)>,
}

impl<'a> LangIndex<'a> {
    fn build(visible: &[&'a Post], lang: Lang) -> Self {
        let posts: Vec<&Post> = visible
            .iter()
            .copied()
            .filter(|p| p.content(lang).is_some())
            .collect();
        let mut categories: BTreeMap<String, (Taxonomy, Vec<&Post>)> = BTreeMap::new();
        let mut tags: BTreeMap<String, (Taxonomy, Vec<&Post>)> = BTreeMap::new();
        for &post in &posts {
            if let Some(cat) = &post.category {
                categories
                    .entry(cat.slug.clone())
                    .or_insert_with(|| (cat.clone(), Vec::new()))
                    .1
                    .push(post);
            }
            for tag in &post.tags {
                tags.entry(tag.slug.clone())
                    .or_insert_with(|| (tag.clone(), Vec::new()))
                    .1
                    .push(post);
            }
        }
        Self {
            posts,
            categories,
            tags,
        }
    }

    fn total_pages(&self, per_page: usize) -> usize {
        self.posts.len().div_ceil(per_page.max(1)).max(1)
    }
}

fn newest(posts: &[&Post]) -> Option<DateTime<Utc>> {
    posts.iter().filter_map(|p| p.last_modified()).max()
}

fn ids(posts: &[&Post]) -> Vec<String> {
    posts.iter().map(|p| p.id.clone()).collect()
}

/// Generate every route of the site.
///
/// Drafts are left out unless `site.include_drafts`. A post only gets a
/// page in the languages it has an explicit translation for.
#[instrument(level = "info", skip_all, fields(posts = posts.len()))]
pub fn generate_routes(posts: &[Post], site: &SiteConfig) -> Vec<Route> {
    let visible: Vec<&Post> = posts
        .iter()
        .filter(|p| p.published || site.include_drafts)
        .collect();
    let indexes: Vec<(Lang, LangIndex)> = site
        .languages
        .iter()
        .map(|&lang| (lang, LangIndex::build(&visible, lang)))
        .collect();
    let per_page = site.posts_per_page.max(1);

    let every_lang = |path_for: &dyn Fn(Lang) -> String| -> Vec<Alternate> {
        site.languages
            .iter()
            .map(|&lang| Alternate {
                lang,
                path: path_for(lang),
            })
            .collect()
    };

    let mut routes = Vec::new();
    for (lang, index) in &indexes {
        let lang = *lang;

        let home_listed = &index.posts[..per_page.min(index.posts.len())];
        routes.push(Route {
            path: home_path(lang, site),
            lang,
            kind: RouteKind::Home,
            alternates: every_lang(&|l: Lang| home_path(l, site)),
            lastmod: newest(home_listed),
            changefreq: Changefreq::Daily,
            priority: 1.0,
            indexable: true,
            listing: ids(home_listed),
        });

        let total_pages = index.total_pages(per_page);
        for page in 1..=total_pages {
            let start = ((page - 1) * per_page).min(index.posts.len());
            let end = (page * per_page).min(index.posts.len());
            let chunk = &index.posts[start..end];
            let alternates = indexes
                .iter()
                .filter(|(_, other)| other.total_pages(per_page) >= page)
                .map(|(l, _)| Alternate {
                    lang: *l,
                    path: blog_path(*l, page, site),
                })
                .collect();
            routes.push(Route {
                path: blog_path(lang, page, site),
                lang,
                kind: RouteKind::BlogIndex { page, total_pages },
                alternates,
                lastmod: newest(chunk),
                changefreq: Changefreq::Daily,
                priority: if page == 1 { 0.8 } else { 0.5 },
                indexable: true,
                listing: ids(chunk),
            });
        }

        for post in &index.posts {
            let Some(content) = post.content(lang) else {
                continue;
            };
            let alternates = site
                .languages
                .iter()
                .filter_map(|&l| {
                    post.content(l).map(|c| Alternate {
                        lang: l,
                        path: post_path(l, &c.slug, site),
                    })
                })
                .collect();
            routes.push(Route {
                path: post_path(lang, &content.slug, site),
                lang,
                kind: RouteKind::Post { id: post.id.clone() },
                alternates,
                lastmod: post.last_modified(),
                changefreq: Changefreq::Weekly,
                priority: if post.featured { 0.9 } else { 0.7 },
                indexable: true,
                listing: Vec::new(),
            });
        }

        for (slug, (taxonomy, listed)) in &index.categories {
            let alternates = indexes
                .iter()
                .filter(|(_, other)| other.categories.contains_key(slug))
                .map(|(l, _)| Alternate {
                    lang: *l,
                    path: category_path(*l, slug, site),
                })
                .collect();
            routes.push(Route {
                path: category_path(lang, slug, site),
                lang,
                kind: RouteKind::Category {
                    slug: slug.clone(),
                    name: taxonomy.name.clone(),
                },
                alternates,
                lastmod: newest(listed),
                changefreq: Changefreq::Weekly,
                priority: 0.5,
                indexable: true,
                listing: ids(listed),
            });
        }

        for (slug, (taxonomy, listed)) in &index.tags {
            let alternates = indexes
                .iter()
                .filter(|(_, other)| other.tags.contains_key(slug))
                .map(|(l, _)| Alternate {
                    lang: *l,
                    path: tag_path(*l, slug, site),
                })
                .collect();
            routes.push(Route {
                path: tag_path(lang, slug, site),
                lang,
                kind: RouteKind::Tag {
                    slug: slug.clone(),
                    name: taxonomy.name.clone(),
                },
                alternates,
                lastmod: newest(listed),
                changefreq: Changefreq::Weekly,
                priority: 0.5,
                indexable: true,
                listing: ids(listed),
            });
        }

        for page in StaticPage::ALL {
            routes.push(Route {
                path: static_path(page, lang, site),
                lang,
                kind: RouteKind::Static { page },
                alternates: every_lang(&|l: Lang| static_path(page, l, site)),
                lastmod: None,
                changefreq: Changefreq::Yearly,
                priority: 0.3,
                indexable: true,
                listing: Vec::new(),
            });
        }
    }

    routes.push(Route {
        path: "/404".to_string(),
        lang: site.default_language,
        kind: RouteKind::NotFound,
        alternates: Vec::new(),
        lastmod: None,
        changefreq: Changefreq::Never,
        priority: 0.0,
        indexable: false,
        listing: Vec::new(),
    });

    let mut seen = HashSet::new();
    routes.retain(|route| {
        if seen.insert(route.path.clone()) {
            true
        } else {
            warn!(path = %route.path, kind = ?route.kind, "Duplicate route path; dropping");
            false
        }
    });

    info!(
        routes = routes.len(),
        visible_posts = visible.len(),
        languages = site.languages.len(),
        "Generated routes"
    );
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostContent;
    use chrono::TimeZone;

    fn content(title: &str, slug: &str) -> PostContent {
        PostContent {
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: None,
            body: "<p>body</p>".to_string(),
            meta_title: None,
            meta_description: None,
            reading_minutes: 1,
        }
    }

    fn post(id: &str, langs: &[(Lang, &str)], day: u32) -> Post {
        Post {
            id: id.to_string(),
            translations: langs
                .iter()
                .map(|(l, slug)| (*l, content(slug, slug)))
                .collect(),
            category: Taxonomy::new("Ciência"),
            tags: vec![],
            cover_image: None,
            author: None,
            published_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()),
            updated_at: None,
            published: true,
            featured: false,
        }
    }

    fn find<'a>(routes: &'a [Route], path: &str) -> &'a Route {
        routes
            .iter()
            .find(|r| r.path == path)
            .unwrap_or_else(|| panic!("no route {path}"))
    }

    #[test]
    fn test_paths_per_language() {
        let site = SiteConfig::default();
        assert_eq!(home_path(Lang::Pt, &site), "/");
        assert_eq!(home_path(Lang::En, &site), "/en");
        assert_eq!(blog_path(Lang::Es, 3, &site), "/es/blog/pagina/3");
        assert_eq!(blog_path(Lang::En, 2, &site), "/en/blog/page/2");
        assert_eq!(category_path(Lang::En, "science", &site), "/en/category/science");
        assert_eq!(tag_path(Lang::Es, "ia", &site), "/es/etiqueta/ia");
        assert_eq!(static_path(StaticPage::Privacy, Lang::Pt, &site), "/privacidade");

        let prefixed = SiteConfig {
            prefix_default_language: true,
            ..SiteConfig::default()
        };
        assert_eq!(home_path(Lang::Pt, &prefixed), "/pt");
        assert_eq!(post_path(Lang::Pt, "ola", &prefixed), "/pt/blog/ola");
    }

    #[test]
    fn test_output_file() {
        let site = SiteConfig::default();
        let routes = generate_routes(&[], &site);
        assert_eq!(find(&routes, "/").output_file(), PathBuf::from("index.html"));
        assert_eq!(
            find(&routes, "/en/blog").output_file(),
            PathBuf::from("en/blog/index.html")
        );
        assert_eq!(find(&routes, "/404").output_file(), PathBuf::from("404.html"));
    }

    #[test]
    fn test_empty_site_still_has_shell_pages() {
        let site = SiteConfig::default();
        let routes = generate_routes(&[], &site);
        // home + blog + 3 static per language, plus 404
        assert_eq!(routes.len(), 3 * 5 + 1);
        let not_found = find(&routes, "/404");
        assert!(!not_found.indexable);
        assert!(not_found.alternates.is_empty());
    }

    #[test]
    fn test_post_alternates_use_each_language_slug() {
        let site = SiteConfig::default();
        let posts = vec![post("p1", &[(Lang::Pt, "ola"), (Lang::En, "hello")], 3)];
        let routes = generate_routes(&posts, &site);

        let pt = find(&routes, "/blog/ola");
        assert_eq!(pt.kind, RouteKind::Post { id: "p1".to_string() });
        assert_eq!(
            pt.alternates,
            vec![
                Alternate { lang: Lang::Pt, path: "/blog/ola".to_string() },
                Alternate { lang: Lang::En, path: "/en/blog/hello".to_string() },
            ]
        );
        assert_eq!(pt.priority, 0.7);
        assert!(routes.iter().all(|r| !r.path.starts_with("/es/blog/")));
    }

    #[test]
    fn test_pagination_and_listing() {
        let site = SiteConfig {
            posts_per_page: 2,
            ..SiteConfig::default()
        };
        let posts: Vec<Post> = (1..=5)
            .map(|i| post(&format!("p{i}"), &[(Lang::Pt, format!("post-{i}").as_str())], i))
            .collect();
        let routes = generate_routes(&posts, &site);

        let first = find(&routes, "/blog");
        assert_eq!(first.kind, RouteKind::BlogIndex { page: 1, total_pages: 3 });
        assert_eq!(first.listing, vec!["p1", "p2"]);
        assert_eq!(first.priority, 0.8);

        let last = find(&routes, "/blog/pagina/3");
        assert_eq!(last.listing, vec!["p5"]);
        assert_eq!(last.priority, 0.5);
        // other languages only have page 1
        assert_eq!(last.alternates.len(), 1);
        assert_eq!(find(&routes, "/blog").alternates.len(), 3);

        assert_eq!(find(&routes, "/").listing.len(), 2);
    }

    #[test]
    fn test_taxonomy_routes_and_lastmod() {
        let site = SiteConfig::default();
        let mut a = post("a", &[(Lang::Pt, "a"), (Lang::En, "a-en")], 1);
        a.tags = vec![Taxonomy::new("Espaço").unwrap()];
        let mut b = post("b", &[(Lang::Pt, "b")], 9);
        b.updated_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let routes = generate_routes(&[a, b], &site);

        let cat = find(&routes, "/categoria/ciencia");
        assert_eq!(cat.listing, vec!["a", "b"]);
        assert_eq!(cat.lastmod, Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(cat.alternates.len(), 2);

        let tag = find(&routes, "/en/tag/espaco");
        assert_eq!(
            tag.kind,
            RouteKind::Tag { slug: "espaco".to_string(), name: "Espaço".to_string() }
        );
        assert!(routes.iter().all(|r| r.path != "/es/categoria/ciencia"));
    }

    #[test]
    fn test_home_lastmod_only_counts_listed_posts() {
        let site = SiteConfig {
            posts_per_page: 1,
            ..SiteConfig::default()
        };
        let new = post("new", &[(Lang::Pt, "new")], 9);
        let mut old = post("old", &[(Lang::Pt, "old")], 1);
        old.updated_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let routes = generate_routes(&[new, old], &site);

        let home = find(&routes, "/");
        assert_eq!(home.listing, vec!["new"]);
        assert_eq!(home.lastmod, Some(Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap()));
        let second = find(&routes, "/blog/pagina/2");
        assert_eq!(second.lastmod, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_drafts_excluded_unless_enabled() {
        let mut draft = post("d", &[(Lang::Pt, "rascunho")], 2);
        draft.published = false;
        let posts = vec![draft];

        let site = SiteConfig::default();
        let routes = generate_routes(&posts, &site);
        assert!(routes.iter().all(|r| r.path != "/blog/rascunho"));

        let site = SiteConfig {
            include_drafts: true,
            ..SiteConfig::default()
        };
        let routes = generate_routes(&posts, &site);
        find(&routes, "/blog/rascunho");
    }

    #[test]
    fn test_featured_priority_and_x_default() {
        let site = SiteConfig::default();
        let mut p = post("f", &[(Lang::En, "only-en")], 4);
        p.featured = true;
        let routes = generate_routes(&[p], &site);
        let route = find(&routes, "/en/blog/only-en");
        assert_eq!(route.priority, 0.9);
        assert_eq!(route.x_default(Lang::Pt).unwrap().path, "/en/blog/only-en");
        assert_eq!(route.url(&site), "https://seommerce.shop/en/blog/only-en");
    }

    #[test]
    fn test_duplicate_paths_are_dropped() {
        let site = SiteConfig::default();
        let posts = vec![post("x", &[(Lang::Pt, "same")], 1), post("y", &[(Lang::Pt, "same")], 2)];
        let routes = generate_routes(&posts, &site);
        let matching: Vec<_> = routes.iter().filter(|r| r.path == "/blog/same").collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].kind, RouteKind::Post { id: "x".to_string() });
    }
}
