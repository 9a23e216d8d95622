//! Count-up and entrance animation on the frame clock.
//!
//! Animation timing is independent of fetch timing: a counter animates
//! from whatever it currently shows to the new target, and each counter
//! runs its own frame loop with no shared state. The numeric curve and
//! frame math live here as pure functions so they are testable off the
//! browser; the `wasm32` half drives them with `requestAnimationFrame`.

/// Duration of the initial page-load count-up.
pub const COUNT_UP_MS: f64 = 900.0;
/// Duration of a number swap during a client-side scope refresh.
pub const SWAP_MS: f64 = 600.0;
/// Viewport fraction of a card that must be visible before its entrance
/// fires.
pub const ENTRANCE_THRESHOLD: f64 = 0.2;

/// Ease-out-cubic: fast start, settle at the end. Input is expected to
/// be pre-clamped to `[0, 1]`.
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Displayed value for one animation frame, plus whether the animation
/// is finished.
///
/// Once elapsed time reaches the duration the value is exactly `target`
/// (never an off-by-rounding neighbor) and the loop must stop
/// rescheduling itself.
pub fn frame_value(start: i64, target: i64, elapsed_ms: f64, duration_ms: f64) -> (i64, bool) {
    let t = if duration_ms <= 0.0 {
        1.0
    } else {
        (elapsed_ms / duration_ms).clamp(0.0, 1.0)
    };
    if t >= 1.0 {
        return (target, true);
    }
    let eased = ease_out_cubic(t);
    let value = start as f64 + (target - start) as f64 * eased;
    (value.round() as i64, false)
}

/// Entrance stagger for the card at `index`: 80 ms per card, capped at
/// 400 ms so a long row does not trickle in forever.
pub fn entrance_delay_ms(index: usize) -> i32 {
    (index as i32 * 80).min(400)
}

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::{frame_value, ENTRANCE_THRESHOLD};

    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Element, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
        IntersectionObserverInit};

    /// Whether the user asked for reduced motion. When set, entrance and
    /// count animations are skipped and final values shown immediately.
    pub fn prefers_reduced_motion() -> bool {
        web_sys::window()
            .and_then(|w| w.match_media("(prefers-reduced-motion: reduce)").ok())
            .flatten()
            .map(|m| m.matches())
            .unwrap_or(false)
    }

    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0)
    }

    fn request_frame(callback: &Closure<dyn FnMut(f64)>) {
        if let Some(window) = web_sys::window() {
            let _ = window.request_animation_frame(callback.as_ref().unchecked_ref());
        }
    }

    /// Parse the integer a counter element currently displays.
    pub fn displayed_value(el: &HtmlElement) -> i64 {
        let text = el.text_content().unwrap_or_default();
        let digits: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        digits.parse().unwrap_or(0)
    }

    /// Animate one counter element from `start` to `target`.
    ///
    /// Each call owns its own frame loop; concurrent animations on
    /// different elements do not interact. The closure keeps itself
    /// alive through an `Rc` cycle that is dropped on the final frame,
    /// so the loop cannot outlive the animation.
    pub fn count_up(el: HtmlElement, start: i64, target: i64, duration_ms: f64) {
        if prefers_reduced_motion() || start == target {
            el.set_text_content(Some(&target.to_string()));
            return;
        }

        let started = now_ms();
        let holder: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
        let loop_handle = holder.clone();

        let step = Closure::wrap(Box::new(move |_frame_time: f64| {
            let (value, done) = frame_value(start, target, now_ms() - started, duration_ms);
            el.set_text_content(Some(&value.to_string()));
            if done {
                // Drop the closure; no further frames are scheduled.
                loop_handle.borrow_mut().take();
            } else if let Some(step) = loop_handle.borrow().as_ref() {
                request_frame(step);
            }
        }) as Box<dyn FnMut(f64)>);

        request_frame(&step);
        *holder.borrow_mut() = Some(step);
    }

    /// Reveal cards as they enter the viewport, staggered by index, and
    /// start each card's count-up exactly once.
    ///
    /// The observer unobserves a card after its entrance, so re-entering
    /// the viewport never re-fires the animation.
    pub fn observe_card_entrances(cards: Vec<HtmlElement>) {
        if prefers_reduced_motion() {
            for card in &cards {
                let _ = card.class_list().add_1("is-in");
                reveal_final_count(card);
            }
            return;
        }

        let ordered = Rc::new(cards);
        let lookup = ordered.clone();

        let on_intersect = Closure::wrap(Box::new(
            move |entries: Vec<IntersectionObserverEntry>, observer: IntersectionObserver| {
                for entry in entries {
                    if !entry.is_intersecting() {
                        continue;
                    }
                    let target: Element = entry.target();
                    observer.unobserve(&target);
                    let Ok(card) = target.dyn_into::<HtmlElement>() else {
                        continue;
                    };
                    let index = lookup
                        .iter()
                        .position(|c| c.is_same_node(Some(&card)))
                        .unwrap_or(0);
                    schedule_entrance(card, super::entrance_delay_ms(index));
                }
            },
        )
            as Box<dyn FnMut(Vec<IntersectionObserverEntry>, IntersectionObserver)>);

        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(ENTRANCE_THRESHOLD));
        let Ok(observer) = IntersectionObserver::new_with_options(
            on_intersect.as_ref().unchecked_ref(),
            &options,
        ) else {
            // No observer support: show everything immediately.
            for card in ordered.iter() {
                let _ = card.class_list().add_1("is-in");
                reveal_final_count(card);
            }
            return;
        };
        for card in ordered.iter() {
            observer.observe(card);
        }
        // The observer and its callback live for the page lifetime.
        on_intersect.forget();
    }

    fn schedule_entrance(card: HtmlElement, delay_ms: i32) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let fire = Closure::once_into_js(move || {
            let _ = card.class_list().add_1("is-in");
            if let Some(count) = counter_of(&card) {
                let target = data_target(&count);
                count_up(count, 0, target, super::COUNT_UP_MS);
            }
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            fire.unchecked_ref(),
            delay_ms,
        );
    }

    fn reveal_final_count(card: &HtmlElement) {
        if let Some(count) = counter_of(card) {
            let target = data_target(&count);
            count.set_text_content(Some(&target.to_string()));
        }
    }

    fn counter_of(card: &HtmlElement) -> Option<HtmlElement> {
        card.query_selector(".card-count")
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    fn data_target(count: &HtmlElement) -> i64 {
        count
            .get_attribute("data-target")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| displayed_value(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5); // ease-out front-loads progress
    }

    #[test]
    fn final_frame_is_exactly_target() {
        let (value, done) = frame_value(0, 42, 900.0, 900.0);
        assert_eq!(value, 42);
        assert!(done);
        // Well past the end, still exactly the target.
        let (value, done) = frame_value(17, 42, 5000.0, 900.0);
        assert_eq!(value, 42);
        assert!(done);
    }

    #[test]
    fn count_up_stays_within_bounds_and_is_monotonic() {
        let mut previous = 0;
        for step in 0..=90 {
            let elapsed = step as f64 * 10.0;
            let (value, _) = frame_value(0, 42, elapsed, 900.0);
            assert!((0..=42).contains(&value));
            assert!(value >= previous, "regressed at {elapsed}ms");
            previous = value;
        }
        assert_eq!(previous, 42);
    }

    #[test]
    fn descending_animation_reaches_target() {
        let (value, done) = frame_value(42, 5, 600.0, 600.0);
        assert_eq!(value, 5);
        assert!(done);
        let (mid, done) = frame_value(42, 5, 300.0, 600.0);
        assert!(!done);
        assert!((5..=42).contains(&mid));
    }

    #[test]
    fn zero_duration_snaps_to_target() {
        assert_eq!(frame_value(0, 9, 0.0, 0.0), (9, true));
    }

    #[test]
    fn entrance_stagger_is_capped() {
        assert_eq!(entrance_delay_ms(0), 0);
        assert_eq!(entrance_delay_ms(1), 80);
        assert_eq!(entrance_delay_ms(4), 320);
        assert_eq!(entrance_delay_ms(5), 400);
        assert_eq!(entrance_delay_ms(50), 400);
    }
}
