/// Drives page-by-page retrieval against one endpoint. The remote reports no
/// explicit pagination links; a short page (fewer records than the page size)
/// is the termination signal. An endpoint whose total is an exact multiple of
/// the page size costs one extra request that returns an empty page.
#[derive(Debug)]
pub struct Paginator {
    page: u32,
    page_size: u32,
    done: bool,
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            // A zero page size would make every empty page look full.
            page_size: page_size.max(1),
            done: false,
        }
    }

    /// The next page number to fetch, or `None` once a short page was seen.
    pub fn next_page(&mut self) -> Option<u32> {
        if self.done {
            None
        } else {
            Some(self.page)
        }
    }

    pub fn record_page(&mut self, returned: usize) {
        if (returned as u64) < u64::from(self.page_size) {
            self.done = true;
        } else {
            self.page += 1;
        }
    }
}
