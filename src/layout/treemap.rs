//! Squarified treemap with label bands and pixel rounding.
//!
//! Each directory is inset by the outer padding (with a taller top band for
//! its label), then its children are tiled in rows whose aspect ratios stay
//! as close to the golden ratio as possible. Siblings are separated by the
//! inner padding. Rounding happens once, after the whole tree is placed.

use super::{Geometry, Hierarchy, NodeId, TreemapOptions, Viewport};

/// Target aspect ratio for rows.
const PHI: f64 = 1.618_033_988_749_895;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bounds {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

/// Compute a rectangle for every hierarchy node, indexed by pre-order position.
pub(super) fn tile(hierarchy: &Hierarchy, viewport: Viewport, options: &TreemapOptions) -> Vec<Geometry> {
    let mut bounds = vec![Bounds::default(); hierarchy.len()];
    if let Some(root) = bounds.first_mut() {
        *root = Bounds {
            x0: 0.0,
            y0: 0.0,
            x1: viewport.width,
            y1: viewport.height,
        };
    }

    let half_inner = options.padding_inner / 2.0;

    for &id in hierarchy.preorder() {
        let Some(node) = hierarchy.get_node(id) else { continue };

        // Every node but the root gives back half the inner gap on each side.
        let p = if node.depth == 0 { 0.0 } else { half_inner };
        let mut b = bounds[node.index];
        b.x0 += p;
        b.y0 += p;
        b.x1 -= p;
        b.y1 -= p;
        collapse(&mut b);
        bounds[node.index] = b;

        if !hierarchy.has_children(id) {
            continue;
        }

        let mut inner = Bounds {
            x0: b.x0 + options.padding_outer - half_inner,
            y0: b.y0 + options.padding_top - half_inner,
            x1: b.x1 - (options.padding_outer - half_inner),
            y1: b.y1 - (options.padding_outer - half_inner),
        };
        collapse(&mut inner);
        clamp_within(&mut inner, b);
        squarify(hierarchy, id, inner, &mut bounds);
    }

    bounds
        .into_iter()
        .map(|b| {
            let b = if options.round { round(b) } else { b };
            Geometry::Rect {
                x0: b.x0,
                y0: b.y0,
                x1: b.x1,
                y1: b.y1,
            }
        })
        .collect()
}

/// Keep `x1 >= x0` and `y1 >= y0` by collapsing an inverted span onto its midpoint.
fn collapse(b: &mut Bounds) {
    if b.x1 < b.x0 {
        let mid = (b.x0 + b.x1) / 2.0;
        b.x0 = mid;
        b.x1 = mid;
    }
    if b.y1 < b.y0 {
        let mid = (b.y0 + b.y1) / 2.0;
        b.y0 = mid;
        b.y1 = mid;
    }
}

/// Pull every edge of `b` inside `outer`. Padding larger than a tiny
/// directory would otherwise push its children outside it.
fn clamp_within(b: &mut Bounds, outer: Bounds) {
    b.x0 = b.x0.clamp(outer.x0, outer.x1);
    b.x1 = b.x1.clamp(outer.x0, outer.x1);
    b.y0 = b.y0.clamp(outer.y0, outer.y1);
    b.y1 = b.y1.clamp(outer.y0, outer.y1);
}

/// Half-up rounding to whole pixels.
fn round(b: Bounds) -> Bounds {
    let r = |v: f64| (v + 0.5).floor();
    Bounds {
        x0: r(b.x0),
        y0: r(b.y0),
        x1: r(b.x1),
        y1: r(b.y1),
    }
}

/// Tile the children of `parent` into `area`, writing each child's bounds.
fn squarify(hierarchy: &Hierarchy, parent: NodeId, area: Bounds, bounds: &mut [Bounds]) {
    let children: Vec<(usize, f64)> = hierarchy
        .children(parent)
        .filter_map(|c| hierarchy.get_node(c).map(|n| (n.index, n.value as f64)))
        .collect();
    let n = children.len();

    let Bounds {
        mut x0,
        mut y0,
        x1,
        y1,
    } = area;
    let mut value: f64 = children.iter().map(|(_, v)| v).sum();

    let (mut i0, mut i1) = (0usize, 0usize);
    while i0 < n {
        let dx = x1 - x0;
        let dy = y1 - y0;

        // Skip ahead to the first non-empty child to seed the row.
        let mut sum_value = 0.0;
        while i1 < n {
            sum_value = children[i1].1;
            i1 += 1;
            if sum_value != 0.0 {
                break;
            }
        }

        if dx > 0.0 && dy > 0.0 && value > 0.0 {
            let mut min_value = sum_value;
            let mut max_value = sum_value;
            let alpha = (dy / dx).max(dx / dy) / (value * PHI);
            let mut beta = sum_value * sum_value * alpha;
            let mut min_ratio = (max_value / beta).max(beta / min_value);

            // Grow the row while the worst aspect ratio does not get worse.
            while i1 < n {
                let node_value = children[i1].1;
                sum_value += node_value;
                min_value = min_value.min(node_value);
                max_value = max_value.max(node_value);
                beta = sum_value * sum_value * alpha;
                let new_ratio = (max_value / beta).max(beta / min_value);
                if new_ratio > min_ratio {
                    sum_value -= node_value;
                    break;
                }
                min_ratio = new_ratio;
                i1 += 1;
            }
        } else {
            // Degenerate area or nothing left to size: one row takes the rest.
            sum_value += children[i1..].iter().map(|(_, v)| v).sum::<f64>();
            i1 = n;
        }

        let row = &children[i0..i1];
        if dx < dy {
            // Horizontal band across the full width.
            let band_y1 = if value > 0.0 { y0 + dy * sum_value / value } else { y1 };
            dice(row, sum_value, Bounds { x0, y0, x1, y1: band_y1 }, bounds);
            if value > 0.0 {
                y0 = band_y1;
            }
        } else {
            // Vertical band across the full height.
            let band_x1 = if value > 0.0 { x0 + dx * sum_value / value } else { x1 };
            slice(row, sum_value, Bounds { x0, y0, x1: band_x1, y1 }, bounds);
            if value > 0.0 {
                x0 = band_x1;
            }
        }

        value -= sum_value;
        i0 = i1;
    }
}

/// Lay a row out left to right.
fn dice(row: &[(usize, f64)], row_value: f64, area: Bounds, bounds: &mut [Bounds]) {
    let k = if row_value > 0.0 { (area.x1 - area.x0) / row_value } else { 0.0 };
    let mut x = area.x0;
    for &(index, value) in row {
        let next = x + value * k;
        bounds[index] = Bounds {
            x0: x,
            y0: area.y0,
            x1: next,
            y1: area.y1,
        };
        x = next;
    }
}

/// Lay a row out top to bottom.
fn slice(row: &[(usize, f64)], row_value: f64, area: Bounds, bounds: &mut [Bounds]) {
    let k = if row_value > 0.0 { (area.y1 - area.y0) / row_value } else { 0.0 };
    let mut y = area.y0;
    for &(index, value) in row {
        let next = y + value * k;
        bounds[index] = Bounds {
            x0: area.x0,
            y0: y,
            x1: area.x1,
            y1: next,
        };
        y = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeNode;

    fn rect(g: Geometry) -> (f64, f64, f64, f64) {
        match g {
            Geometry::Rect { x0, y0, x1, y1 } => (x0, y0, x1, y1),
            Geometry::Circle { .. } => panic!("expected rect"),
        }
    }

    fn no_padding() -> TreemapOptions {
        TreemapOptions {
            padding_outer: 0.0,
            padding_top: 0.0,
            padding_inner: 0.0,
            round: false,
        }
    }

    fn tree() -> TreeNode {
        TreeNode::dir(
            "root",
            vec![
                TreeNode::dir(
                    "big",
                    vec![
                        TreeNode::file("b1", 6000),
                        TreeNode::file("b2", 2500),
                        TreeNode::dir("deep", vec![TreeNode::file("d", 700)]),
                    ],
                ),
                TreeNode::file("mid", 3000),
                TreeNode::file("small", 900),
                TreeNode::file("tiny", 40),
                TreeNode::file("zero", 0),
            ],
        )
    }

    #[test]
    fn test_areas_proportional_without_padding() {
        let h = Hierarchy::build(&tree());
        let g = tile(&h, Viewport::new(400.0, 300.0), &no_padding());
        let total = 400.0 * 300.0;
        let root_value = h.get_node(h.root()).unwrap().value as f64;

        for &id in h.children(h.root()).collect::<Vec<_>>().iter() {
            let node = h.get_node(id).unwrap();
            let (x0, y0, x1, y1) = rect(g[node.index]);
            let area = (x1 - x0) * (y1 - y0);
            let expected = total * node.value as f64 / root_value;
            assert!((area - expected).abs() < 1e-6, "{} area {} vs {}", node.name, area, expected);
        }
    }

    #[test]
    fn test_children_tile_parent_exactly() {
        let h = Hierarchy::build(&tree());
        let g = tile(&h, Viewport::new(500.0, 500.0), &no_padding());
        let sum: f64 = h
            .children(h.root())
            .map(|c| {
                let (x0, y0, x1, y1) = rect(g[h.get_node(c).unwrap().index]);
                (x1 - x0) * (y1 - y0)
            })
            .sum();
        assert!((sum - 250_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_rectangles_are_well_formed_and_rounded() {
        let h = Hierarchy::build(&tree());
        let g = tile(&h, Viewport::new(640.0, 480.0), &TreemapOptions::default());
        for geometry in g {
            let (x0, y0, x1, y1) = rect(geometry);
            assert!(x1 >= x0 && y1 >= y0);
            for v in [x0, y0, x1, y1] {
                assert_eq!(v, v.round());
                assert!((0.0..=640.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_label_band_reserved() {
        let h = Hierarchy::build(&tree());
        let g = tile(&h, Viewport::new(640.0, 480.0), &TreemapOptions::default());
        let root = rect(g[0]);
        assert_eq!(root, (0.0, 0.0, 640.0, 480.0));

        // Top-level children start below the 19px label band, left edge at the 3px outer inset.
        let first_rows: Vec<_> = h.children(h.root()).map(|c| rect(g[h.get_node(c).unwrap().index])).collect();
        let min_y = first_rows.iter().map(|r| r.1).fold(f64::MAX, f64::min);
        let min_x = first_rows.iter().map(|r| r.0).fold(f64::MAX, f64::min);
        assert_eq!(min_y, 19.0);
        assert_eq!(min_x, 3.0);

        for (x0, y0, x1, y1) in first_rows {
            assert!(x0 >= 3.0 && y0 >= 19.0 && x1 <= 637.0 && y1 <= 477.0);
        }
    }

    #[test]
    fn test_zero_value_child_is_degenerate() {
        let h = Hierarchy::build(&tree());
        let g = tile(&h, Viewport::new(300.0, 300.0), &no_padding());
        let zero = h.get_node(h.find_by_path("root/zero").unwrap()).unwrap();
        let (x0, y0, x1, y1) = rect(g[zero.index]);
        assert!((x1 - x0) * (y1 - y0) == 0.0);
    }

    #[test]
    fn test_tiny_viewport_stays_well_formed() {
        let h = Hierarchy::build(&tree());
        let g = tile(&h, Viewport::new(10.0, 8.0), &TreemapOptions::default());
        for geometry in g {
            let (x0, y0, x1, y1) = rect(geometry);
            assert!(x1 >= x0 && y1 >= y0);
        }
    }

    #[test]
    fn test_all_zero_children() {
        let t = TreeNode::dir("root", vec![TreeNode::file("a", 0), TreeNode::file("b", 0)]);
        let h = Hierarchy::build(&t);
        let g = tile(&h, Viewport::new(100.0, 100.0), &no_padding());
        for geometry in g.iter().skip(1) {
            let (x0, y0, x1, y1) = rect(*geometry);
            assert!(x1 >= x0 && y1 >= y0);
            assert!(x0.is_finite() && y0.is_finite());
        }
    }

    #[test]
    fn test_padding_wider_than_parent_keeps_children_inside() {
        let t = TreeNode::dir(
            "root",
            vec![TreeNode::dir("d", vec![TreeNode::file("f", 5), TreeNode::file("g", 1)])],
        );
        let h = Hierarchy::build(&t);
        let options = TreemapOptions {
            round: false,
            ..TreemapOptions::default()
        };
        let g = tile(&h, Viewport::new(4.0, 12.0), &options);

        for &id in h.preorder() {
            let Some(parent) = h.parent(id) else { continue };
            let (x0, y0, x1, y1) = rect(g[h.get_node(id).unwrap().index]);
            let (px0, py0, px1, py1) = rect(g[h.get_node(parent).unwrap().index]);
            assert!(x0 >= px0 && x1 <= px1 && y0 >= py0 && y1 <= py1, "{:?} outside parent", (x0, y0, x1, y1));
            assert!(x0 <= x1 && y0 <= y1);
        }
    }
}
