//! Scroll cursor: one buffered page of hits and a position within it.

use tracing::debug;

use crate::backend::{instrumented, BackendOp, Page, ScrollRequest, ScrollToken, SearchBackend};
use crate::config::IteratorOptions;
use crate::context::QueryContext;
use crate::query::Predicate;
use crate::types::{Result, ResultKind};

/// Everything a cursor needs to talk to the backend for one call.
pub(crate) struct ScrollSource<'a> {
    pub backend: &'a dyn SearchBackend,
    pub ctx: &'a QueryContext,
    pub options: &'a IteratorOptions,
    pub kind: ResultKind,
    /// `None` scrolls every document of `kind`.
    pub predicate: Option<&'a Predicate>,
}

impl ScrollSource<'_> {
    fn start(&self) -> Result<Page> {
        let request = ScrollRequest {
            index: &self.options.index,
            doc_type: self.kind,
            predicate: self.predicate,
            sort_field: self.options.sort_field.as_deref(),
            size: self.options.page_size,
            keep_alive: self.options.scroll_keep_alive(),
        };
        instrumented(BackendOp::ScrollStart, self.ctx, || {
            self.backend.scroll_start(self.ctx, &request)
        })
    }

    fn next_page(&self, token: &ScrollToken) -> Result<Page> {
        instrumented(BackendOp::ScrollNext, self.ctx, || {
            self.backend.scroll_next(
                self.ctx,
                &self.options.index,
                token,
                self.options.scroll_keep_alive(),
            )
        })
    }
}

#[derive(Debug, Default)]
enum CursorState {
    #[default]
    Unstarted,
    /// `pos` is always within `0..=page.hits.len()`.
    HasPage { page: Page, pos: usize },
    Exhausted,
}

/// One page of hits plus a position, refilled through the scroll token.
#[derive(Debug, Default)]
pub(crate) struct ScrollCursor {
    state: CursorState,
}

impl ScrollCursor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the next hit identifier, `Ok(None)` once the scroll is drained.
    ///
    /// A failed scroll open leaves the cursor unstarted; a failed continuation
    /// exhausts it.
    pub(crate) fn advance(&mut self, source: &ScrollSource<'_>) -> Result<Option<String>> {
        if matches!(self.state, CursorState::Unstarted) {
            let page = source.start()?;
            debug!(
                kind = source.kind.as_str(),
                hits = page.len(),
                total_hits = page.total_hits,
                "scroll opened"
            );
            self.state = CursorState::HasPage { page, pos: 0 };
        }

        let token = match &mut self.state {
            CursorState::Unstarted | CursorState::Exhausted => return Ok(None),
            CursorState::HasPage { page, pos } => {
                if let Some(hit) = page.hits.get(*pos) {
                    *pos += 1;
                    return Ok(Some(hit.id.clone()));
                }
                page.scroll_id.clone()
            }
        };

        let Some(token) = token else {
            self.state = CursorState::Exhausted;
            return Ok(None);
        };
        match source.next_page(&token) {
            Ok(page) => match page.hits.first().map(|hit| hit.id.clone()) {
                Some(id) => {
                    debug!(token = %token, hits = page.len(), "scroll page fetched");
                    self.state = CursorState::HasPage { page, pos: 1 };
                    Ok(Some(id))
                }
                None => {
                    debug!(token = %token, "scroll drained");
                    self.state = CursorState::Exhausted;
                    Ok(None)
                }
            },
            Err(err) => {
                self.state = CursorState::Exhausted;
                Err(err)
            }
        }
    }

    /// Drops the current page; the next advance re-opens the scroll.
    pub(crate) fn reset(&mut self) {
        self.state = CursorState::Unstarted;
    }

    #[cfg(test)]
    pub(crate) fn is_exhausted(&self) -> bool {
        matches!(self.state, CursorState::Exhausted)
    }

    #[cfg(test)]
    pub(crate) fn is_started(&self) -> bool {
        !matches!(self.state, CursorState::Unstarted)
    }
}
