//! Background pruning of good-for-day orders.
//!
//! A single worker thread owned by the book loops forever: compute the
//! next occurrence of the daily cutoff in local time, sleep on the
//! shutdown condition variable until the deadline, then cancel every
//! resting good-for-day order. Ids are collected under the lock and the
//! cancels applied in a second acquisition, so the order index is never
//! mutated while it is being scanned and the lock is not held across the
//! deadline computation.

use std::sync::atomic::Ordering as AtomicOrdering;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use tracing::{info, warn};

use crate::order_book::Shared;
use crate::OrderId;

/// Slack added on top of the deadline so a timer that fires marginally
/// early still lands past the cutoff.
const CUTOFF_SLACK: Duration = Duration::from_millis(100);

/// The default daily cutoff: 16:00 local time.
pub fn default_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).expect("16:00:00 is a valid time of day")
}

pub(crate) fn run(shared: &Shared, cutoff: NaiveTime) {
    loop {
        let now = Local::now();
        let Some(deadline) = next_cutoff(now, cutoff) else {
            // The cutoff does not exist in local time today (clock or DST
            // trouble); try again rather than abandoning the worker.
            warn!("next cutoff could not be resolved in local time, retrying");
            continue;
        };
        let wait = time_until(now, deadline) + CUTOFF_SLACK;

        {
            let guard = shared.state.lock().unwrap();
            if shared.shutdown.load(AtomicOrdering::Acquire) {
                return;
            }
            let (_guard, timeout) = shared
                .shutdown_signal
                .wait_timeout(guard, wait)
                .unwrap();
            if shared.shutdown.load(AtomicOrdering::Acquire) {
                return;
            }
            if !timeout.timed_out() {
                // Woken without a shutdown request; recompute and wait again.
                continue;
            }
        }

        let day_order_ids: Vec<OrderId> = {
            let state = shared.state.lock().unwrap();
            state.day_order_ids()
        };
        if day_order_ids.is_empty() {
            continue;
        }

        info!(count = day_order_ids.len(), "cancelling good-for-day orders at cutoff");
        let mut state = shared.state.lock().unwrap();
        for order_id in day_order_ids {
            state.cancel_order(order_id);
        }
    }
}

/// Next occurrence of `cutoff` strictly after `now`'s time of day, in
/// local time. `None` when the resulting wall-clock instant does not
/// exist (DST gap) or the date arithmetic overflows.
fn next_cutoff(now: DateTime<Local>, cutoff: NaiveTime) -> Option<DateTime<Local>> {
    let mut date = now.date_naive();
    if now.time() >= cutoff {
        date = date.succ_opt()?;
    }
    Local.from_local_datetime(&date.and_time(cutoff)).earliest()
}

fn time_until(now: DateTime<Local>, deadline: DateTime<Local>) -> Duration {
    (deadline - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use crate::order::Order;
    use crate::order_book::Orderbook;
    use crate::order_type::OrderType;
    use crate::side::Side;

    fn local(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 7, 10, h, m, s)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn cutoff_later_today_stays_on_today() {
        let now = local(10, 30, 0);
        let deadline = next_cutoff(now, default_cutoff()).unwrap();
        assert_eq!(deadline.date_naive(), now.date_naive());
        assert_eq!(deadline.time(), default_cutoff());
    }

    #[test]
    fn cutoff_already_passed_rolls_to_tomorrow() {
        for now in [local(16, 0, 0), local(23, 59, 59)] {
            let deadline = next_cutoff(now, default_cutoff()).unwrap();
            assert_eq!(deadline.date_naive(), now.date_naive().succ_opt().unwrap());
            assert_eq!(deadline.time(), default_cutoff());
        }
    }

    #[test]
    fn wait_duration_is_never_negative() {
        let now = local(12, 0, 0);
        assert_eq!(time_until(now, now), Duration::ZERO);
        assert_eq!(time_until(now, local(11, 59, 0)), Duration::ZERO);
        assert_eq!(time_until(now, local(12, 0, 5)), Duration::from_secs(5));
    }

    #[test]
    fn dropping_the_book_stops_the_worker_promptly() {
        // The worker is asleep until tomorrow's cutoff; drop must still
        // return quickly by signalling shutdown.
        let book = Orderbook::new();
        book.add_order(Order::new(OrderType::GoodForDay, 1, Side::Buy, 100, 10));
        drop(book);
    }

    #[test]
    fn day_orders_are_cancelled_at_the_cutoff() {
        let now = Local::now();
        let cutoff_at = now + chrono::Duration::seconds(2);
        if cutoff_at.date_naive() != now.date_naive() {
            // Too close to midnight for a same-day cutoff; skip.
            return;
        }

        let book = Orderbook::with_cutoff(cutoff_at.time());
        book.add_order(Order::new(OrderType::GoodForDay, 1, Side::Buy, 100, 10));
        book.add_order(Order::new(OrderType::GoodForDay, 2, Side::Sell, 200, 10));
        book.add_order(Order::new(OrderType::GoodTillCancel, 3, Side::Sell, 300, 10));
        assert_eq!(book.size(), 3);

        thread::sleep(Duration::from_secs(3));

        assert_eq!(book.size(), 1);
        let infos = book.level_infos();
        assert!(infos.bids().is_empty());
        assert_eq!(infos.asks().len(), 1);
        assert_eq!(infos.asks()[0].price, 300);
    }
}
