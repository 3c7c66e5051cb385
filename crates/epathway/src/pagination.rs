/// Hard ceiling on result pages processed in one run, whatever the portal reports.
pub const MAX_PAGES: u32 = 50;

/// Page bookkeeping for the results grid.
///
/// The counter starts at 1 and is advanced before a page is processed, so
/// while page `n` is being extracted [`Paginator::counter`] reads `n + 1`,
/// which is also the number of the next page to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    counter: u32,
    page_count: u32,
    processed: u32,
}

impl Paginator {
    /// A missing or unreadable page count is treated as a single page.
    pub fn new(page_count: Option<u32>) -> Self {
        Self {
            counter: 1,
            page_count: page_count.filter(|&n| n > 0).unwrap_or(1),
            processed: 0,
        }
    }

    /// Marks the start of a page and returns its 1-based number.
    pub fn begin_page(&mut self) -> u32 {
        self.counter += 1;
        self.processed += 1;
        self.processed
    }

    /// The next page to postback for, or `None` once the reported count or
    /// [`MAX_PAGES`] has been reached.
    pub fn next_page(&self) -> Option<u32> {
        if self.counter > self.page_count {
            return None;
        }
        if self.processed >= MAX_PAGES {
            log::warn!(
                "Stopping after {} pages; the portal reported {}",
                self.processed,
                self.page_count
            );
            return None;
        }
        Some(self.counter)
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn processed(&self) -> u32 {
        self.processed
    }
}

/// Postback target for the pager link of `page`.
pub fn page_event_target(page: u32) -> String {
    format!("ctl00$MainContent$cusResultsGrid$repWebGrid$ctl00$grdWebGridTabularView$ctl{page:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drives a paginator the way the scraper does and returns the pages processed.
    fn walk(page_count: Option<u32>) -> Vec<u32> {
        let mut paginator = Paginator::new(page_count);
        let mut pages = Vec::new();
        loop {
            pages.push(paginator.begin_page());
            if paginator.next_page().is_none() {
                break;
            }
        }
        pages
    }

    #[test]
    fn test_page_1_of_3_plans_three_pages() {
        assert_eq!(walk(Some(3)), vec![1, 2, 3]);
    }

    #[test]
    fn test_counter_runs_one_ahead() {
        let mut paginator = Paginator::new(Some(3));
        assert_eq!(paginator.counter(), 1);
        assert_eq!(paginator.begin_page(), 1);
        assert_eq!(paginator.counter(), 2);
        assert_eq!(paginator.next_page(), Some(2));
        assert_eq!(paginator.begin_page(), 2);
        assert_eq!(paginator.next_page(), Some(3));
        assert_eq!(paginator.begin_page(), 3);
        assert_eq!(paginator.counter(), 4);
        assert_eq!(paginator.next_page(), None);
    }

    #[test]
    fn test_missing_page_count_defaults_to_one() {
        assert_eq!(walk(None), vec![1]);
        assert_eq!(walk(Some(0)), vec![1]);
        assert_eq!(Paginator::new(None).page_count(), 1);
    }

    #[test]
    fn test_page_ceiling() {
        let pages = walk(Some(10_000));
        assert_eq!(pages.len(), MAX_PAGES as usize);
        assert_eq!(pages.last(), Some(&MAX_PAGES));

        assert_eq!(walk(Some(MAX_PAGES)).len(), MAX_PAGES as usize);
        assert_eq!(walk(Some(MAX_PAGES + 1)).len(), MAX_PAGES as usize);
    }

    #[test]
    fn test_page_event_target() {
        assert_eq!(
            page_event_target(2),
            "ctl00$MainContent$cusResultsGrid$repWebGrid$ctl00$grdWebGridTabularView$ctl02"
        );
        assert_eq!(
            page_event_target(12),
            "ctl00$MainContent$cusResultsGrid$repWebGrid$ctl00$grdWebGridTabularView$ctl12"
        );
    }
}
