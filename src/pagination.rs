use tracing::trace;

/// Maximum number of page buttons offered for navigation.
pub const WINDOW_SIZE: usize = 5;

/// One page of a sequence plus what is needed to draw pagination controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub window: Vec<usize>,
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// Page numbers to offer around `current_page`, at most [`WINDOW_SIZE`] of them.
///
/// The window keeps a constant length at the boundaries and centers the
/// current page otherwise.
pub fn page_window(total_pages: usize, current_page: usize) -> Vec<usize> {
    let first = if total_pages <= WINDOW_SIZE || current_page <= 3 {
        1
    } else if current_page >= total_pages - 1 {
        total_pages - (WINDOW_SIZE - 1)
    } else {
        current_page - 2
    };
    let len = total_pages.min(WINDOW_SIZE);
    (first..first + len).collect()
}

/// Slice out page `current_page` (1 based). Pages outside `1..=total_pages`
/// are empty.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, current_page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);
    let page_items = match current_page.checked_sub(1) {
        Some(idx) => {
            let begin = idx.saturating_mul(page_size).min(items.len());
            let end = begin.saturating_add(page_size).min(items.len());
            items[begin..end].to_vec()
        }
        None => Vec::new(),
    };
    Page {
        items: page_items,
        total_pages,
        window: page_window(total_pages, current_page),
    }
}

/// Page size and current page of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    current_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Pagination {
    /// A page size of 0 is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current_page: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self, len: usize) -> usize {
        total_pages(len, self.page_size)
    }

    /// Moves to `page` if it exists. Returns whether the page changed.
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) -> bool {
        if page < 1 || page > total_pages {
            trace!("Ignoring page {page}, only {total_pages} pages");
            return false;
        }
        let changed = self.current_page != page;
        self.current_page = page;
        changed
    }

    pub fn previous(&mut self, total_pages: usize) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page, total_pages),
            None => false,
        }
    }

    pub fn next(&mut self, total_pages: usize) -> bool {
        self.go_to_page(self.current_page + 1, total_pages)
    }

    /// Pull the current page back into `1..=max(1, total_pages)`.
    pub fn clamp(&mut self, total_pages: usize) {
        let clamped = self.current_page.clamp(1, total_pages.max(1));
        if clamped != self.current_page {
            trace!("Clamping page {} to {clamped}", self.current_page);
            self.current_page = clamped;
        }
    }

    pub fn page<T: Clone>(&self, items: &[T]) -> Page<T> {
        paginate(items, self.page_size, self.current_page)
    }
}
