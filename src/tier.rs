/// Every preview has exactly this many pages, whatever the source length.
pub const PREVIEW_PAGE_COUNT: usize = 5;

/// How many real pages a preview reveals and how many it replaces with
/// locked placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTier {
    pub revealed: usize,
    pub locked: usize,
    pub total: usize,
}

impl PageTier {
    fn new(revealed: usize) -> Self {
        Self {
            revealed,
            locked: PREVIEW_PAGE_COUNT - revealed,
            total: PREVIEW_PAGE_COUNT,
        }
    }

    /// Tier after copying: pages that failed to copy become locked pages so
    /// the preview length does not change.
    pub fn reconcile(&self, copied: usize) -> Self {
        Self::new(copied.min(self.revealed))
    }
}

pub fn select_tier(total_source_pages: usize) -> PageTier {
    let revealed = match total_source_pages {
        0..=11 => 1,
        12..=25 => 2,
        26..=50 => 3,
        _ => 4,
    };
    PageTier::new(revealed)
}
