//! Point filter / converter

use contracts::{RawFrame, RenderableFrame, VertexCells};

/// Convert a decoded frame into a renderable one.
///
/// Points whose x, y or z is NaN or infinite are dropped without error and do
/// not take an output index. Surviving points keep their input order; ring
/// numbers are widened to 32 bits. One vertex cell is emitted per survivor.
pub fn convert(raw: &RawFrame) -> RenderableFrame {
    let mut frame = RenderableFrame::with_capacity(raw.len());

    for point in raw.points.iter().filter(|p| p.has_finite_position()) {
        frame.positions.push(point.position);
        frame.intensity.push(point.intensity);
        frame.ring.push(u32::from(point.ring));
    }

    frame.verts = VertexCells::with_count(frame.positions.len());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RawPoint;
    use rand::Rng;

    fn raw(points: Vec<RawPoint>) -> RawFrame {
        RawFrame::new(1000, points)
    }

    #[test]
    fn test_all_valid_points() {
        let frame = convert(&raw(vec![
            RawPoint::new(1.0, 2.0, 3.0, 10.0, 5),
            RawPoint::new(4.0, 5.0, 6.0, 20.0, 6),
        ]));

        assert_eq!(frame.positions, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(frame.intensity, vec![10.0, 20.0]);
        assert_eq!(frame.ring, vec![5, 6]);
        assert_eq!(frame.verts.point_ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_non_finite_point_is_silently_dropped() {
        let frame = convert(&raw(vec![
            RawPoint::new(1.0, 2.0, 3.0, 10.0, 5),
            RawPoint::new(f32::NAN, 0.0, 0.0, 99.0, 7),
            RawPoint::new(4.0, 5.0, 6.0, 20.0, 6),
        ]));

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.positions, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(frame.intensity, vec![10.0, 20.0]);
        assert_eq!(frame.ring, vec![5, 6]);
        // The dropped point does not consume an index
        assert_eq!(frame.verts.point_ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_every_coordinate_is_checked() {
        let frame = convert(&raw(vec![
            RawPoint::new(f32::INFINITY, 0.0, 0.0, 1.0, 0),
            RawPoint::new(0.0, f32::NEG_INFINITY, 0.0, 1.0, 0),
            RawPoint::new(0.0, 0.0, f32::NAN, 1.0, 0),
        ]));
        assert!(frame.is_empty());
        assert!(frame.verts.is_empty());
        assert!(frame.is_consistent());
    }

    #[test]
    fn test_non_finite_intensity_is_kept() {
        let frame = convert(&raw(vec![RawPoint::new(1.0, 1.0, 1.0, f32::NAN, 2)]));
        assert_eq!(frame.len(), 1);
        assert!(frame.intensity[0].is_nan());
    }

    #[test]
    fn test_empty_input() {
        let frame = convert(&raw(Vec::new()));
        assert!(frame.is_empty());
        assert!(frame.intensity.is_empty());
        assert!(frame.ring.is_empty());
        assert!(frame.verts.is_empty());
    }

    #[test]
    fn test_ring_widening() {
        let frame = convert(&raw(vec![RawPoint::new(0.0, 0.0, 0.0, 0.0, u16::MAX)]));
        assert_eq!(frame.ring, vec![65535u32]);
    }

    #[test]
    fn test_input_not_mutated() {
        let input = raw(vec![
            RawPoint::new(f32::NAN, 0.0, 0.0, 0.0, 0),
            RawPoint::new(1.0, 1.0, 1.0, 1.0, 1),
        ]);
        let before = format!("{:?}", input);
        let _ = convert(&input);
        assert_eq!(format!("{:?}", input), before);
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let input = raw(vec![
            RawPoint::new(1.0, 2.0, 3.0, 4.0, 5),
            RawPoint::new(f32::NAN, 2.0, 3.0, 4.0, 5),
            RawPoint::new(6.0, 7.0, 8.0, 9.0, 10),
        ]);
        assert_eq!(convert(&input), convert(&input));
    }

    #[test]
    fn test_randomized_frames_preserve_order() {
        let mut rng = rand::rng();

        for _ in 0..50 {
            let n = rng.random_range(0..500);
            let points: Vec<RawPoint> = (0..n)
                .map(|i| {
                    let x = if rng.random_bool(0.2) {
                        f32::NAN
                    } else {
                        rng.random_range(-100.0..100.0)
                    };
                    // Encode the input index in the intensity to check ordering
                    RawPoint::new(x, rng.random_range(-100.0..100.0), 0.5, i as f32, (i % 64) as u16)
                })
                .collect();
            let expected: Vec<&RawPoint> = points.iter().filter(|p| p.position[0].is_finite()).collect();

            let frame = convert(&raw(points.clone()));

            assert!(frame.is_consistent());
            assert_eq!(frame.len(), expected.len());
            for (i, point) in expected.iter().enumerate() {
                assert_eq!(frame.positions[i], point.position);
                assert_eq!(frame.intensity[i], point.intensity);
                assert_eq!(frame.ring[i], point.ring as u32);
            }
            assert!(frame.intensity.windows(2).all(|w| w[0] < w[1]));
            assert!(frame
                .verts
                .point_ids()
                .enumerate()
                .all(|(cell, id)| id == cell as i64));
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut rng = rand::rng();
        let points: Vec<RawPoint> = (0..300)
            .map(|_| {
                let z = if rng.random_bool(0.25) {
                    f32::INFINITY
                } else {
                    rng.random_range(-3.0..3.0)
                };
                RawPoint::new(
                    rng.random_range(-100.0..100.0),
                    rng.random_range(-100.0..100.0),
                    z,
                    rng.random_range(0.0..255.0),
                    rng.random_range(0..64),
                )
            })
            .collect();
        let frame = convert(&raw(points));

        // Feed the survivors back in as a raw frame
        let refed: Vec<RawPoint> = frame
            .positions
            .iter()
            .zip(&frame.intensity)
            .zip(&frame.ring)
            .map(|((&[x, y, z], &intensity), &ring)| {
                RawPoint::new(x, y, z, intensity, u16::try_from(ring).unwrap())
            })
            .collect();
        let again = convert(&raw(refed));

        assert_eq!(again.len(), frame.len());
        assert_eq!(again, frame);
    }
}
