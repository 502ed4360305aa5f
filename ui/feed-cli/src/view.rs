use sf_pager::PaginationState;
use std::io::{self, Write};

pub(crate) const LOADING_LINE: &str = "Loading more posts...";
pub(crate) const END_LINE: &str = "You've reached the end!";

/// Incremental text rendering of the feed. Each call prints only what changed since the
/// previous one.
#[derive(Debug, Default)]
pub(crate) struct FeedView {
    printed: usize,
    was_loading: bool,
    scroll_pages: u32,
}

impl FeedView {
    /// Id of the last item written, which the terminal treats as the visible tail.
    pub(crate) fn render<W: Write>(
        &mut self,
        state: &PaginationState,
        out: &mut W,
    ) -> io::Result<Option<u64>> {
        if state.is_loading && !self.was_loading {
            writeln!(out, "{LOADING_LINE}")?;
        }
        self.was_loading = state.is_loading;

        for item in state.items.iter().skip(self.printed) {
            writeln!(out, "({}) {}", item.id, item.title)?;
            writeln!(out, "    {}", item.body.replace('\n', "\n    "))?;
        }
        self.printed = state.items.len();

        if state.scroll_pages_loaded != self.scroll_pages {
            self.scroll_pages = state.scroll_pages_loaded;
            writeln!(out, "Infinite Scroll Pages Loaded: {}", self.scroll_pages)?;
        }

        out.flush()?;
        Ok(state.items.last().map(|item| item.id))
    }

    /// Writes the closing line once nothing more will load. Returns whether the feed is done.
    pub(crate) fn finish<W: Write>(&self, state: &PaginationState, out: &mut W) -> io::Result<bool> {
        if state.is_loading || state.has_more {
            return Ok(false);
        }
        if let Some(message) = &state.last_error {
            writeln!(out, "{message}")?;
        } else if !state.items.is_empty() {
            writeln!(out, "{END_LINE}")?;
        }
        out.flush()?;
        Ok(true)
    }
}
