use async_trait::async_trait;

use crate::Error;

/// Value of `Page::next` when there is no further page
pub const NO_NEXT_PAGE: i64 = -1;

/// A validated `(index, size)` window over an ordered listing
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageRequest {
    index: i64,
    size: i64,
    offset: usize,
}

impl PageRequest {
    pub fn new(index: i64, size: i64) -> Result<PageRequest, Error> {
        if index < 0 {
            return Err(Error::InvalidInput(format!(
                "page index must not be negative, got {index}"
            )));
        }
        if size <= 0 {
            return Err(Error::InvalidInput(format!(
                "page size must be positive, got {size}"
            )));
        }
        let offset = index
            .checked_mul(size)
            .and_then(|o| usize::try_from(o).ok())
            .ok_or_else(|| {
                Error::InvalidInput(format!("page {index} of size {size} is out of range"))
            })?;
        Ok(PageRequest {
            index,
            size,
            offset,
        })
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.size as usize
    }

    /// The page right after this one, if it is addressable at all
    pub fn next(&self) -> Option<PageRequest> {
        PageRequest::new(self.index.checked_add(1)?, self.size).ok()
    }

    /// Applies this window to an already-ordered slice
    pub fn slice<'a, T>(&self, all: &'a [T]) -> &'a [T] {
        let start = self.offset.min(all.len());
        let end = start.saturating_add(self.limit()).min(all.len());
        &all[start..end]
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub index: i64,
    pub size: i64,

    /// `index + 1`, or `NO_NEXT_PAGE`
    pub next: i64,

    /// Always `index - 1`, even on the first page. Up to the renderer.
    pub prev: i64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next != NO_NEXT_PAGE
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            index: self.index,
            size: self.size,
            next: self.next,
            prev: self.prev,
        }
    }
}

/// Something that can hand out windows of an externally-ordered listing
#[async_trait]
pub trait Listing: Send {
    type Entry: Send;

    async fn fetch(&mut self, req: PageRequest) -> Result<Vec<Self::Entry>, Error>;
}

#[async_trait]
impl<'a, T: Clone + Send + Sync> Listing for &'a [T] {
    type Entry = T;

    async fn fetch(&mut self, req: PageRequest) -> Result<Vec<T>, Error> {
        Ok(req.slice(*self).to_vec())
    }
}

/// Fetches page `index`, then probes page `index + 1` to know whether there is
/// a next page. This costs a second bounded fetch but never a full count.
pub async fn paginate<L: Listing + ?Sized>(
    listing: &mut L,
    index: i64,
    size: i64,
) -> Result<Page<L::Entry>, Error> {
    let req = PageRequest::new(index, size)?;
    let items = listing.fetch(req).await?;
    let has_next = match req.next() {
        Some(next) => !listing.fetch(next).await?.is_empty(),
        None => false,
    };
    Ok(Page {
        items,
        index,
        size,
        next: if has_next { index + 1 } else { NO_NEXT_PAGE },
        prev: index - 1,
    })
}
