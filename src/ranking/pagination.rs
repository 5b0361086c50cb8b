use serde::Serialize;

/// Requested page number as given by a caller. Zero, negative or
/// non-numeric requests mean page 1; past-the-end means the last page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PageRequest {
    #[default]
    First,
    Last,
    Number(usize),
}

impl PageRequest {
    pub fn parse(page: &str) -> Self {
        match page.trim() {
            "last" => PageRequest::Last,
            text => match text.parse::<usize>() {
                Ok(0) | Err(_) => PageRequest::First,
                Ok(n) => PageRequest::Number(n),
            },
        }
    }

    /// Clamp to 1..=num_pages
    pub fn resolve(self, num_pages: usize) -> usize {
        match self {
            PageRequest::First => 1,
            PageRequest::Last => num_pages,
            PageRequest::Number(n) => n.clamp(1, num_pages),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
    pub page_size: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// An empty listing still has one (empty) page
    pub fn paginate(items: Vec<T>, request: PageRequest, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total = items.len();
        let num_pages = total.div_ceil(page_size).max(1);
        let number = request.resolve(num_pages);

        let items = items
            .into_iter()
            .skip((number - 1) * page_size)
            .take(page_size)
            .collect();

        Page { number, num_pages, total, page_size, items }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            page_size: self.page_size,
            items: self.items.into_iter().map(f).collect(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}
