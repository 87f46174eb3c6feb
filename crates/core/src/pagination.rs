//! Pagination window calculation.
//!
//! The page links offered for direct navigation are never the full page count. They form a
//! window of `page_cnt` consecutive pages whose first page is `k * page_cnt + 1`. The `prev` and
//! `next` controls jump a whole window at a time; a numbered link jumps inside the window.
//!
//! The calculator never produces a window containing page 0. A window may run past the last
//! page of the list; callers clamp it with [`clamp_to_limit`] before rendering.

use crate::constants::MAX_PAGE_WINDOW;
use pview_types::{PageLength, PageNumber};
use serde::Serialize;

/// An inclusive window of page numbers.
///
/// Invariant: `start % page_cnt == 1 % page_cnt` and `end - start + 1 == page_cnt`, except for
/// the window holding `u32::MAX`, which ends there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// The window containing page 1.
    pub fn initial(page_cnt: u32) -> Self {
        compute_range(PageNumber::FIRST, page_cnt)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, page: PageNumber) -> bool {
        (self.start..=self.end).contains(&page.get())
    }
}

/// Computes the window containing `new_page`.
///
/// `page_cnt` is clamped to `1..=MAX_PAGE_WINDOW`, the same bounds [`crate::CoreConfig`]
/// enforces for configured values.
pub fn compute_range(new_page: PageNumber, page_cnt: u32) -> PageRange {
    let page_cnt = window_size(page_cnt);
    let start = ((new_page.get() - 1) / page_cnt) * page_cnt + 1;
    PageRange {
        start,
        end: start.saturating_add(page_cnt - 1),
    }
}

fn window_size(page_cnt: u32) -> u32 {
    page_cnt.clamp(1, MAX_PAGE_WINDOW)
}

/// The page numbers of `range`, in order.
pub fn make_seq_array(range: &PageRange) -> Vec<u32> {
    (range.start..=range.end).collect()
}

/// The last page of a list of `total_length` rows, `ceil(total_length / length)`.
pub fn limit_page(total_length: u64, length: PageLength) -> u64 {
    total_length.div_ceil(u64::from(length.get()))
}

/// The page numbers of `range` that exist in a list whose last page is `limit`.
pub fn clamp_to_limit(range: &PageRange, limit: u64) -> Vec<u32> {
    make_seq_array(range)
        .into_iter()
        .filter(|page| u64::from(*page) <= limit)
        .collect()
}

/// A pagination control click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTransition {
    Prev,
    Next,
    Num(PageNumber),
}

/// Why a transition was declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Boundary {
    /// `prev` would move to page 0 or below.
    Start,
    /// `next` would move past the last page.
    End,
    /// A numbered link outside `1..=limit`.
    OutOfRange,
    /// `next` before the list's total length is known.
    UnknownTotal,
}

/// Result of a pagination click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to `page`. `range` is the new window for `prev`/`next`; `None` keeps the current one.
    Accepted {
        page: PageNumber,
        range: Option<PageRange>,
    },
    Rejected(Boundary),
}

/// Paging inputs the calculator needs for a transition.
#[derive(Debug, Clone, Copy)]
pub struct PagingContext {
    pub current_page: PageNumber,
    pub length: PageLength,
    pub total_length: Option<u64>,
    pub page_cnt: u32,
}

impl PagingContext {
    fn limit(&self) -> Option<u64> {
        self.total_length
            .map(|total| limit_page(total, self.length))
    }
}

/// Validates a pagination click against the list boundaries.
pub fn apply_transition(transition: PageTransition, ctx: &PagingContext) -> Transition {
    let current = u64::from(ctx.current_page.get());
    let step = u64::from(window_size(ctx.page_cnt));

    match transition {
        PageTransition::Prev => {
            let Some(new_page) = current.checked_sub(step).filter(|p| *p > 0) else {
                return Transition::Rejected(Boundary::Start);
            };
            accept_window(new_page, ctx.page_cnt)
        }
        PageTransition::Next => {
            let Some(limit) = ctx.limit() else {
                return Transition::Rejected(Boundary::UnknownTotal);
            };
            let new_page = current + step;
            if new_page > limit {
                return Transition::Rejected(Boundary::End);
            }
            accept_window(new_page, ctx.page_cnt)
        }
        PageTransition::Num(page) => {
            if ctx.limit().is_some_and(|limit| u64::from(page.get()) > limit) {
                return Transition::Rejected(Boundary::OutOfRange);
            }
            Transition::Accepted { page, range: None }
        }
    }
}

fn accept_window(new_page: u64, page_cnt: u32) -> Transition {
    match u32::try_from(new_page).ok().and_then(|p| PageNumber::new(p).ok()) {
        Some(page) => Transition::Accepted {
            page,
            range: Some(compute_range(page, page_cnt)),
        },
        None => Transition::Rejected(Boundary::End),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32) -> PageNumber {
        PageNumber::new(n).expect("positive page")
    }

    fn ctx(current: u32, length: u32, total: Option<u64>) -> PagingContext {
        PagingContext {
            current_page: page(current),
            length: PageLength::new(length).expect("positive length"),
            total_length: total,
            page_cnt: 10,
        }
    }

    #[test]
    fn compute_range_aligns_to_window() {
        let range = compute_range(page(1), 10);
        assert_eq!((range.start(), range.end()), (1, 10));

        let range = compute_range(page(10), 10);
        assert_eq!((range.start(), range.end()), (1, 10));

        let range = compute_range(page(11), 10);
        assert_eq!((range.start(), range.end()), (11, 20));

        let range = compute_range(page(95), 10);
        assert_eq!((range.start(), range.end()), (91, 100));
    }

    #[test]
    fn every_window_has_fixed_size_and_aligned_start() {
        for n in 1..=250 {
            let range = compute_range(page(n), 10);
            assert_eq!(range.end() - range.start(), 9);
            assert_eq!(range.start() % 10, 1);
            assert!(range.contains(page(n)));
        }
    }

    #[test]
    fn window_holding_the_last_representable_page_ends_there() {
        let range = compute_range(page(u32::MAX), 10);
        assert_eq!((range.start(), range.end()), (4_294_967_291, u32::MAX));
        assert!(range.contains(page(u32::MAX)));
        assert_eq!(make_seq_array(&range).len(), 5);

        let range = compute_range(page(u32::MAX), 7);
        assert_eq!(range.end(), u32::MAX);
        assert_eq!(range.start() % 7, 1);
    }

    #[test]
    fn oversized_window_is_capped() {
        let range = compute_range(page(1), u32::MAX);
        assert_eq!((range.start(), range.end()), (1, MAX_PAGE_WINDOW));
        assert_eq!(compute_range(page(1), 0), compute_range(page(1), 1));
    }

    #[test]
    fn next_past_the_page_number_space_is_rejected() {
        let mut near_top = ctx(4_294_967_291, 1, Some(u64::MAX));
        assert_eq!(
            apply_transition(PageTransition::Next, &near_top),
            Transition::Rejected(Boundary::End)
        );

        near_top.page_cnt = u32::MAX;
        assert_eq!(
            apply_transition(PageTransition::Next, &near_top),
            Transition::Rejected(Boundary::End)
        );
    }

    #[test]
    fn make_seq_array_lists_window_in_order() {
        let range = compute_range(page(23), 10);
        assert_eq!(make_seq_array(&range), (21..=30).collect::<Vec<_>>());
    }

    #[test]
    fn limit_page_rounds_up() {
        let ten = PageLength::new(10).expect("positive");
        assert_eq!(limit_page(95, ten), 10);
        assert_eq!(limit_page(100, ten), 10);
        assert_eq!(limit_page(101, ten), 11);
        assert_eq!(limit_page(0, ten), 0);
    }

    #[test]
    fn prev_is_rejected_within_first_window() {
        for current in 1..=10 {
            assert_eq!(
                apply_transition(PageTransition::Prev, &ctx(current, 10, Some(1000))),
                Transition::Rejected(Boundary::Start),
                "prev from page {current} must be rejected"
            );
        }
    }

    #[test]
    fn prev_moves_back_one_window() {
        let transition = apply_transition(PageTransition::Prev, &ctx(25, 10, Some(1000)));
        assert_eq!(
            transition,
            Transition::Accepted {
                page: page(15),
                range: Some(compute_range(page(15), 10)),
            }
        );
    }

    #[test]
    fn next_respects_last_page() {
        // 95 rows of 10 per page gives 10 pages.
        assert_eq!(
            apply_transition(PageTransition::Next, &ctx(91, 10, Some(95))),
            Transition::Rejected(Boundary::End)
        );
        assert_eq!(
            apply_transition(PageTransition::Next, &ctx(1, 10, Some(95))),
            Transition::Rejected(Boundary::End)
        );
    }

    #[test]
    fn next_into_tail_window_is_clamped_by_caller() {
        // 950 rows of 10 per page gives 95 pages.
        let transition = apply_transition(PageTransition::Next, &ctx(81, 10, Some(950)));
        let Transition::Accepted {
            page: new_page,
            range: Some(range),
        } = transition
        else {
            panic!("expected accepted transition, got {transition:?}");
        };
        assert_eq!(new_page, page(91));
        assert_eq!((range.start(), range.end()), (91, 100));
        assert_eq!(clamp_to_limit(&range, 95), (91..=95).collect::<Vec<_>>());
        assert_eq!(clamp_to_limit(&range, 91), vec![91]);
    }

    #[test]
    fn next_without_total_is_rejected() {
        assert_eq!(
            apply_transition(PageTransition::Next, &ctx(1, 10, None)),
            Transition::Rejected(Boundary::UnknownTotal)
        );
    }

    #[test]
    fn num_keeps_window_and_checks_limit() {
        assert_eq!(
            apply_transition(PageTransition::Num(page(7)), &ctx(1, 10, Some(95))),
            Transition::Accepted {
                page: page(7),
                range: None,
            }
        );
        assert_eq!(
            apply_transition(PageTransition::Num(page(11)), &ctx(1, 10, Some(95))),
            Transition::Rejected(Boundary::OutOfRange)
        );
    }
}
