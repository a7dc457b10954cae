//! Client-side search and paging over collections already in memory.

/// Types that can be matched by a free-text search box.
pub trait Searchable {
    /// The text fields the search term is matched against.
    fn search_fields(&self) -> Vec<&str>;
}

/// Items where any search field contains `term`, ignoring case. A blank
/// term matches everything.
pub fn filter_matching<'a, T: Searchable>(items: &'a [T], term: &str) -> Vec<&'a T> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// `ceil(count / page_size)`, with zero items giving zero pages.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// One page of a filtered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a, T> {
    pub items: Vec<&'a T>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Search term plus current page for a client-side table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPager {
    page_size: usize,
    page: usize,
    search: String,
}

impl ClientPager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
            search: String::new(),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Changing the term always returns to the first page.
    pub fn set_search(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term != self.search {
            self.search = term;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self) {
        self.page += 1;
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Filter, then cut out the current page. The page is clamped to the
    /// last page so a shrinking result set never shows an empty page.
    pub fn apply<'a, T: Searchable>(&mut self, items: &'a [T]) -> PageView<'a, T> {
        let matching = filter_matching(items, &self.search);
        let total = matching.len();
        let pages = total_pages(total, self.page_size);
        self.page = self.page.clamp(1, pages.max(1));
        let start = (self.page - 1) * self.page_size;
        let items = matching.into_iter().skip(start).take(self.page_size).collect();
        PageView {
            items,
            page: self.page,
            total_pages: pages,
            total,
        }
    }
}
