use scholarstream_cache::QueryState;
use scholarstream_core::Scholarship;
use scholarstream_http::ScholarshipFilter;

use super::all_scholarships;
use crate::context::AppContext;
use crate::derive::{self, FeeOrder, Page};
use crate::keys;
use crate::scope::PageScope;

pub const CATALOG_PAGE_SIZE: usize = 8;

/// Local UI state of the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogParams {
    /// What is typed in the search box.
    pub search_input: String,
    /// The last submitted search.
    pub search: String,
    pub country: Option<String>,
    /// Only scholarships the signed-in user applied to.
    pub mine_only: bool,
    pub sort: Option<FeeOrder>,
    pub page: usize,
}

impl Default for CatalogParams {
    fn default() -> Self {
        Self {
            search_input: String::new(),
            search: String::new(),
            country: None,
            mine_only: false,
            sort: None,
            page: 1,
        }
    }
}

/// Searchable, filterable, paginated scholarship list.
pub struct ScholarshipCatalog {
    ctx: AppContext,
    scope: PageScope,
    params: CatalogParams,
}

impl ScholarshipCatalog {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            scope: PageScope::new(),
            params: CatalogParams::default(),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    pub fn params(&self) -> &CatalogParams {
        &self.params
    }

    pub fn set_search_input(&mut self, text: impl Into<String>) {
        self.params.search_input = text.into();
    }

    /// Apply the typed search and go back to the first page.
    pub fn submit_search(&mut self) {
        self.params.search = self.params.search_input.trim().to_string();
        self.params.page = 1;
    }

    pub fn set_country(&mut self, country: Option<String>) {
        self.params.country = country.filter(|c| !c.trim().is_empty());
        self.params.page = 1;
    }

    pub fn set_mine_only(&mut self, mine_only: bool) {
        self.params.mine_only = mine_only;
        self.params.page = 1;
    }

    pub fn set_sort(&mut self, sort: Option<FeeOrder>) {
        self.params.sort = sort;
    }

    pub fn set_page(&mut self, page: usize) {
        self.params.page = page.max(1);
    }

    /// Server-side filter for the current parameters. The "mine only" toggle
    /// has no effect for anonymous visitors.
    pub fn filter(&self) -> ScholarshipFilter {
        let mut filter = ScholarshipFilter::default();
        if !self.params.search.is_empty() {
            filter = filter.search(self.params.search.clone());
        }
        if let Some(country) = &self.params.country {
            filter = filter.country(country.clone());
        }
        if self.params.mine_only {
            if let Some(identity) = self.ctx.session().identity() {
                filter = filter.email(identity.email);
            }
        }
        filter
    }

    pub async fn load(&self) -> QueryState<Page<Scholarship>> {
        let filter = self.filter();
        let api = self.ctx.api().clone();
        let key = keys::scholarships(&filter);
        let sort = self.params.sort;
        let page = self.params.page;
        self.scope
            .read(self.ctx.query(key, move || async move { api.scholarships(&filter).await }))
            .await
            .map(|list: Vec<Scholarship>| {
                let ordered = match sort {
                    Some(order) => derive::sort_by_fee(&list, order, |s| s.tuition_fees.as_deref()),
                    None => list,
                };
                derive::paginate(&ordered, page, CATALOG_PAGE_SIZE)
            })
    }

    /// Options for the country filter, from the unfiltered list.
    pub async fn countries(&self) -> QueryState<Vec<String>> {
        all_scholarships(&self.ctx, &self.scope)
            .await
            .map(|all| derive::unique_countries(&all))
    }
}
