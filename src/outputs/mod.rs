//! Output generation for the static site.
//!
//! # Submodules
//!
//! - [`html`]: Pre-renders one HTML document per route
//! - [`json`]: Writes the post data files the SPA and admin UI read
//! - [`sitemap`]: Writes `sitemap.xml` (split when large) and `robots.txt`
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── index.html
//! ├── 404.html
//! ├── blog/{slug}/index.html
//! ├── en/...
//! ├── es/...
//! ├── api/
//! │   ├── posts.json
//! │   └── {lang}/posts.json
//! ├── sitemap.xml
//! └── robots.txt
//! ```

pub mod html;
pub mod json;
pub mod sitemap;
