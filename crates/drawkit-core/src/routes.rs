//! Page navigation.
//!
//! Three pages plus a root redirect:
//!
//! | path        | target          |
//! |-------------|-----------------|
//! | `/`         | redirect `/draw` |
//! | `/draw`     | Draw page       |
//! | `/verify`   | Verify page     |
//! | `/passport` | Passport page   |
//!
//! Views are produced by a [`ViewLoader`] the first time a page is visited and
//! cached by the [`Navigator`] for the rest of the session.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Page {
    Draw,
    Verify,
    Passport,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Draw, Page::Verify, Page::Passport];

    /// Route name.
    pub fn name(self) -> &'static str {
        match self {
            Page::Draw => "Draw",
            Page::Verify => "Verify",
            Page::Passport => "Passport",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Page::Draw => "/draw",
            Page::Verify => "/verify",
            Page::Passport => "/passport",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Redirect(&'static str),
    Page(Page),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: Option<&'static str>,
    pub target: RouteTarget,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches '{0}'")]
    NotFound(String),
    #[error("redirect loop starting at '{0}'")]
    RedirectLoop(String),
}

/// Outcome of resolving a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub page: Page,
    /// Path of the matched page route.
    pub path: &'static str,
    /// Set when the requested path redirected here.
    pub redirected_from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let mut routes = vec![Route {
            path: "/",
            name: None,
            target: RouteTarget::Redirect(Page::Draw.path()),
        }];
        routes.extend(Page::ALL.iter().map(|&page| Route {
            path: page.path(),
            name: Some(page.name()),
            target: RouteTarget::Page(page),
        }));
        Self { routes }
    }
}

impl RouteTable {
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Match `path` and follow redirects to a page.
    ///
    /// Matching ignores query and fragment, a trailing slash and letter case.
    pub fn resolve(&self, path: &str) -> Result<Resolved, RouteError> {
        let requested = normalize_path(path);
        let mut current = requested.clone();

        for _ in 0..=MAX_REDIRECTS {
            let route = self
                .find(&current)
                .ok_or_else(|| RouteError::NotFound(path.to_string()))?;
            match route.target {
                RouteTarget::Page(page) => {
                    let redirected_from = (current != requested).then(|| requested.clone());
                    return Ok(Resolved {
                        page,
                        path: route.path,
                        redirected_from,
                    });
                }
                RouteTarget::Redirect(to) => current = normalize_path(to),
            }
        }
        Err(RouteError::RedirectLoop(path.to_string()))
    }

    fn find(&self, normalized: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.path.eq_ignore_ascii_case(normalized))
    }
}

fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Produces the view for a page on first visit.
pub trait ViewLoader {
    type View;

    fn load(&self, page: Page) -> Self::View;
}

/// Route table plus a per-session view cache.
pub struct Navigator<L: ViewLoader> {
    table: RouteTable,
    loader: L,
    views: HashMap<Page, L::View>,
}

impl<L: ViewLoader> Navigator<L> {
    pub fn new(table: RouteTable, loader: L) -> Self {
        Self {
            table,
            loader,
            views: HashMap::new(),
        }
    }

    /// Resolve `path` and return the (possibly freshly loaded) view.
    pub fn navigate(&mut self, path: &str) -> Result<(Resolved, &L::View), RouteError> {
        let resolved = self.table.resolve(path)?;
        if let Some(from) = &resolved.redirected_from {
            log::debug!("redirect {from} -> {}", resolved.path);
        }
        let loader = &self.loader;
        let view = self.views.entry(resolved.page).or_insert_with(|| {
            log::debug!("loading view for {}", resolved.page);
            loader.load(resolved.page)
        });
        Ok((resolved, view))
    }

    pub fn is_loaded(&self, page: Page) -> bool {
        self.views.contains_key(&page)
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}
