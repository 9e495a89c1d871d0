//! `drawkit routes` — print the page table and walk navigations through it.

use drawkit_client::endpoints;
use drawkit_core::{Navigator, Page, RouteTable, RouteTarget, ViewLoader};

/// Placeholder job id in listed routes.
const JOB_ID: &str = "JOB_ID";

/// What a page talks to, built once per page per session.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub title: &'static str,
    pub endpoints: Vec<String>,
}

pub struct SummaryLoader;

impl ViewLoader for SummaryLoader {
    type View = PageSummary;

    fn load(&self, page: Page) -> PageSummary {
        match page {
            Page::Draw => PageSummary {
                title: "Run a draw and watch it progress",
                endpoints: vec![
                    format!("POST {}", endpoints::START_DRAW),
                    format!("WS   {}", endpoints::draw_ws(JOB_ID)),
                    format!("GET  {}", endpoints::draw_result(JOB_ID)),
                    format!("GET  {}", endpoints::draw_bits(JOB_ID)),
                ],
            },
            Page::Verify => PageSummary {
                title: "Audit a bit sequence or number list",
                endpoints: vec![
                    format!("POST {}", endpoints::AUDIT),
                    format!("POST {}", endpoints::START_NIST),
                    format!("WS   {}", endpoints::audit_ws(JOB_ID)),
                    format!("GET  {}", endpoints::nist_report(JOB_ID)),
                ],
            },
            Page::Passport => PageSummary {
                title: "Draw passport: result, fingerprint and test report",
                endpoints: vec![format!("GET  {}", endpoints::draw_result(JOB_ID))],
            },
        }
    }
}

pub fn run(navigate: &[String]) {
    let mut navigator = Navigator::new(RouteTable::default(), SummaryLoader);

    if navigate.is_empty() {
        print_table(navigator.table());
        return;
    }

    let mut failed = false;
    for path in navigate {
        let cached = navigator
            .table()
            .resolve(path)
            .map(|r| navigator.is_loaded(r.page))
            .unwrap_or(false);
        match navigator.navigate(path) {
            Ok((resolved, view)) => {
                let via = resolved
                    .redirected_from
                    .as_deref()
                    .map(|from| format!(" (redirected from {from})"))
                    .unwrap_or_default();
                let state = if cached { "cached" } else { "loaded" };
                println!("{path} -> {} [{}]{via}, view {state}", resolved.path, resolved.page);
                println!("    {}", view.title);
                for endpoint in &view.endpoints {
                    println!("    {endpoint}");
                }
            }
            Err(e) => {
                println!("{path} -> {e}");
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
}

fn print_table(table: &RouteTable) {
    println!("{:<12} {:<10} TARGET", "PATH", "NAME");
    for route in table.routes() {
        let target = match route.target {
            RouteTarget::Page(page) => page.to_string(),
            RouteTarget::Redirect(to) => format!("-> {to}"),
        };
        println!("{:<12} {:<10} {target}", route.path, route.name.unwrap_or("-"));
    }
}
