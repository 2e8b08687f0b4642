use serde::Serialize;

/// Resolves a requested page number against a row count.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: i64,
}

/// The slice of rows a resolved page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    per_page: i64,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub results: Vec<T>,
}

impl Paginator {
    pub fn new(per_page: i64) -> Self {
        Paginator {
            per_page: per_page.max(1),
        }
    }

    /// A missing or non-numeric page gives the first page, a number outside
    /// the valid range gives the last one. There is always at least one page.
    pub fn window(&self, requested: Option<&str>, count: i64) -> PageWindow {
        let count = count.max(0);
        let num_pages = ((count + self.per_page - 1) / self.per_page).max(1);
        let number = match requested_number(requested) {
            n if n >= 1 && n <= num_pages => n,
            _ => num_pages,
        };
        PageWindow {
            number,
            num_pages,
            count,
            per_page: self.per_page,
        }
    }
}

/// The page number asked for, before it is checked against the row count.
/// Missing or non-numeric input asks for page 1.
pub fn requested_number(requested: Option<&str>) -> i64 {
    requested
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(1)
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn page<T>(&self, results: Vec<T>) -> Page<T> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.number < self.num_pages,
            has_previous: self.number > 1,
            results,
        }
    }
}

impl<T> Page<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_page_is_first() {
        let window = Paginator::new(10).window(None, 13);
        assert_eq!(window.number, 1);
        assert_eq!(window.num_pages, 2);
        assert_eq!(window.offset(), 0);
        assert_eq!(window.limit(), 10);
    }

    #[test]
    fn second_page_starts_after_first() {
        let window = Paginator::new(10).window(Some("2"), 13);
        assert_eq!(window.number, 2);
        assert_eq!(window.offset(), 10);

        let page = window.page(vec![11, 12, 13]);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn garbage_page_is_first() {
        assert_eq!(Paginator::new(10).window(Some("abc"), 30).number, 1);
        assert_eq!(Paginator::new(10).window(Some("1.5"), 30).number, 1);
    }

    #[test]
    fn out_of_range_page_is_last() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.window(Some("99"), 30).number, 3);
        assert_eq!(paginator.window(Some("0"), 30).number, 3);
        assert_eq!(paginator.window(Some("-1"), 30).number, 3);
    }

    #[test]
    fn empty_listing_has_one_empty_page() {
        let window = Paginator::new(10).window(Some("5"), 0);
        assert_eq!(window.number, 1);
        assert_eq!(window.num_pages, 1);

        let page = window.page(Vec::<i32>::new());
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        assert_eq!(Paginator::new(10).window(None, 20).num_pages, 2);
        assert_eq!(Paginator::new(10).window(None, 21).num_pages, 3);
    }

    #[test]
    fn requested_number_ignores_row_count() {
        assert_eq!(requested_number(None), 1);
        assert_eq!(requested_number(Some("x")), 1);
        assert_eq!(requested_number(Some(" 4 ")), 4);
        assert_eq!(requested_number(Some("-2")), -2);
    }
}
