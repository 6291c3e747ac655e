use paneboard::layout::{natural_row_heights, pack, place};
use paneboard::types::{Rect, SizeRequest};

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u16) -> u16 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) % u64::from(bound)) as u16
    }
}

fn assert_disjoint_and_inside(rects: &[Rect], width: u16, height: u16) {
    for (i, a) in rects.iter().enumerate() {
        assert!(a.fits_within(width, height), "{a:?} escapes {width}x{height}");
        for b in &rects[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn packed_rectangles_never_overlap_or_escape_the_canvas() {
    let mut rng = Lcg(7);
    for _ in 0..500 {
        let width = 10 + rng.next(200);
        let height = 4 + rng.next(60);
        let count = 1 + rng.next(12) as usize;
        let requests = (0..count)
            .map(|_| SizeRequest::Fixed {
                width: 1 + rng.next(width),
                height: 1 + rng.next(height),
            })
            .collect::<Vec<_>>();

        let slots = pack(&requests, width, height).expect("every pane fits the canvas");
        let rects = place(&slots, &natural_row_heights(&slots), height)
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        assert_disjoint_and_inside(&rects, width, height);
    }
}

#[test]
fn auto_mode_fills_the_canvas_without_overlap() {
    for count in 1..=12usize {
        for (width, height) in [(80u16, 24u16), (200, 50), (33, 9)] {
            let requests = vec![SizeRequest::Auto; count];
            let slots = pack(&requests, width, height).expect("auto fits");
            let rects = place(&slots, &natural_row_heights(&slots), height)
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .expect("auto panes are all visible");
            assert_eq!(rects.len(), count);
            assert_disjoint_and_inside(&rects, width, height);
            let rows = if count < 6 { 1 } else { 2 };
            assert_eq!(slots.iter().map(|s| s.row_group).max(), Some(rows - 1));
        }
    }
}

#[test]
fn placement_follows_reading_order() {
    let requests = vec![
        SizeRequest::Fixed { width: 30, height: 3 },
        SizeRequest::Fixed { width: 30, height: 5 },
        SizeRequest::Fixed { width: 30, height: 2 },
        SizeRequest::Fixed { width: 50, height: 2 },
    ];
    let slots = pack(&requests, 70, 20).expect("pack");
    let rects = place(&slots, &natural_row_heights(&slots), 20);
    let tops_lefts = rects
        .iter()
        .map(|rect| rect.map(|r| (r.top, r.left)))
        .collect::<Vec<_>>();
    assert_eq!(
        tops_lefts,
        vec![Some((0, 0)), Some((0, 31)), Some((5, 0)), Some((7, 0))]
    );
}
