//! Hierarchical circle packing.
//!
//! Leaves get a radius of `sqrt(value)`. Each directory packs its children
//! with a front-chain placement, then takes the smallest circle enclosing
//! them. Packing runs twice: once without padding to learn the overall
//! scale, then with the padding converted into that scale. The result is
//! scaled into a `min(width, height)` square centred in the viewport.

use super::{Geometry, Hierarchy, PackOptions, Viewport};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Circle {
    x: f64,
    y: f64,
    r: f64,
}

/// Compute a circle for every hierarchy node, indexed by pre-order position.
pub(super) fn pack(hierarchy: &Hierarchy, viewport: Viewport, options: &PackOptions) -> Vec<Geometry> {
    let side = viewport.width.min(viewport.height);
    let mut circles = vec![Circle::default(); hierarchy.len()];

    for &id in hierarchy.preorder() {
        if let Some(node) = hierarchy.get_node(id) {
            if !hierarchy.has_children(id) {
                circles[node.index].r = (node.value as f64).sqrt();
            }
        }
    }

    let mut rng = Lcg::new();
    pack_all(hierarchy, &mut circles, 0.0, &mut rng);

    let root_index = 0;
    let root_r = circles[root_index].r;
    if side > 0.0 && root_r > 0.0 {
        pack_all(hierarchy, &mut circles, options.padding * root_r / side, &mut rng);
    }

    // Children are positioned relative to their parent's centre; resolve to
    // absolute coordinates top-down while scaling into the square.
    let root_r = circles[root_index].r;
    let k = if root_r > 0.0 { side / (2.0 * root_r) } else { 0.0 };
    let offset_x = (viewport.width - side) / 2.0;
    let offset_y = (viewport.height - side) / 2.0;

    let mut placed = vec![Circle::default(); hierarchy.len()];
    for &id in hierarchy.preorder() {
        let Some(node) = hierarchy.get_node(id) else { continue };
        let local = circles[node.index];
        let parent = hierarchy
            .parent(id)
            .and_then(|p| hierarchy.get_node(p))
            .map(|p| placed[p.index]);

        placed[node.index] = match parent {
            Some(parent) => Circle {
                x: parent.x + k * local.x,
                y: parent.y + k * local.y,
                r: local.r * k,
            },
            None => Circle {
                x: side / 2.0,
                y: side / 2.0,
                r: local.r * k,
            },
        };
    }

    placed
        .into_iter()
        .map(|c| Geometry::Circle {
            cx: c.x + offset_x,
            cy: c.y + offset_y,
            r: c.r,
        })
        .collect()
}

/// One bottom-up packing pass. `padding` is added to every child radius
/// while packing and removed again afterwards, leaving it as a gap.
fn pack_all(hierarchy: &Hierarchy, circles: &mut [Circle], padding: f64, rng: &mut Lcg) {
    for &id in hierarchy.preorder().iter().rev() {
        if !hierarchy.has_children(id) {
            continue;
        }
        let Some(node) = hierarchy.get_node(id) else { continue };

        let indices: Vec<usize> = hierarchy
            .children(id)
            .filter_map(|c| hierarchy.get_node(c).map(|n| n.index))
            .collect();

        let mut siblings: Vec<Circle> = indices
            .iter()
            .map(|&i| Circle {
                r: circles[i].r + padding,
                ..circles[i]
            })
            .collect();

        let enclosing = pack_siblings(&mut siblings, rng);

        for (&i, packed) in indices.iter().zip(&siblings) {
            circles[i] = Circle {
                r: packed.r - padding,
                ..*packed
            };
        }
        circles[node.index].r = enclosing + padding;
    }
}

/// Place circles tangentially around the origin, largest first, and return
/// the radius of the circle enclosing them (centred on the origin).
fn pack_siblings(circles: &mut [Circle], rng: &mut Lcg) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return circles[0].r + circles[1].r;
    }

    let (b0, a0) = (circles[1], circles[0]);
    place(b0, a0, &mut circles[2]);

    // Front chain as a circular doubly linked list over circle indices.
    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    let (mut a, mut b, c) = (0usize, 1usize, 2usize);
    next[a] = b;
    prev[c] = b;
    next[b] = c;
    prev[a] = c;
    next[c] = a;
    prev[b] = a;

    let mut i = 3;
    let mut retries = 0usize;
    'pack: while i < n {
        let c = i;
        let (ca, cb) = (circles[a], circles[b]);
        place(ca, cb, &mut circles[c]);

        // Look for the nearest front-chain circle the new one overlaps,
        // walking forward from b and backward from a by accumulated radius.
        // Each retry drops a chain circle, so more than `i` retries means
        // rounding is reporting overlaps that are not there.
        if retries <= i {
            let (mut j, mut k) = (next[b], prev[a]);
            let (mut sj, mut sk) = (circles[b].r, circles[a].r);
            loop {
                if sj <= sk {
                    if intersects(&circles[j], &circles[c]) {
                        b = j;
                        next[a] = b;
                        prev[b] = a;
                        retries += 1;
                        continue 'pack;
                    }
                    sj += circles[j].r;
                    j = next[j];
                } else {
                    if intersects(&circles[k], &circles[c]) {
                        a = k;
                        next[a] = b;
                        prev[b] = a;
                        retries += 1;
                        continue 'pack;
                    }
                    sk += circles[k].r;
                    k = prev[k];
                }
                if j == next[k] {
                    break;
                }
            }
        }
        retries = 0;

        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        // Restart from the chain pair closest to the origin.
        let mut best = score(circles, &next, a);
        let mut cursor = next[c];
        while cursor != b {
            let s = score(circles, &next, cursor);
            if s < best {
                a = cursor;
                best = s;
            }
            cursor = next[cursor];
        }
        b = next[a];
        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut cursor = next[b];
    while cursor != b {
        chain.push(circles[cursor]);
        cursor = next[cursor];
    }
    let e = enclose(chain, rng);

    for circle in circles.iter_mut() {
        circle.x -= e.x;
        circle.y -= e.y;
    }
    e.r
}

/// Position `c` tangent to both `a` and `b`.
fn place(b: Circle, a: Circle, c: &mut Circle) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;

    if d2 != 0.0 {
        let a2 = (a.r + c.r) * (a.r + c.r);
        let b2 = (b.r + c.r) * (b.r + c.r);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            c.x = b.x - x * dx - y * dy;
            c.y = b.y - x * dy + y * dx;
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            c.x = a.x + x * dx - y * dy;
            c.y = a.y + x * dy + y * dx;
        }
    } else {
        c.x = a.x + c.r;
        c.y = a.y;
    }
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted midpoint of a chain
/// node and its successor.
fn score(circles: &[Circle], next: &[usize], node: usize) -> f64 {
    let a = circles[node];
    let b = circles[next[node]];
    let ab = a.r + b.r;
    if ab == 0.0 {
        return a.x * a.x + a.y * a.y;
    }
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}

/// Smallest circle enclosing all `circles` (Welzl's move-to-front variant
/// over a deterministic shuffle).
///
/// Far from the origin, rounding can leave no basis that encloses the new
/// circle, or make two bases replace each other forever. Either way the
/// search stops and a covering circle around the current estimate is
/// returned instead.
fn enclose(mut circles: Vec<Circle>, rng: &mut Lcg) -> Circle {
    rng.shuffle(&mut circles);

    let max_restarts = 64 * circles.len() + 64;
    let mut restarts = 0;
    let mut basis: Vec<Circle> = Vec::new();
    let mut e: Option<Circle> = None;
    let mut i = 0;
    while i < circles.len() {
        let p = circles[i];
        match e {
            Some(current) if encloses_weak(&current, &p) => i += 1,
            _ => {
                restarts += 1;
                match extend_basis(&basis, p) {
                    Some(next) if restarts <= max_restarts => {
                        e = Some(enclose_basis(&next));
                        basis = next;
                        i = 0;
                    }
                    _ => return cover(e, &circles),
                }
            }
        }
    }
    e.unwrap_or_default()
}

/// A circle containing every one of `circles`, centred on `hint` when it is
/// finite and on the centroid otherwise. Not minimal.
fn cover(hint: Option<Circle>, circles: &[Circle]) -> Circle {
    if circles.is_empty() {
        return Circle::default();
    }

    let (x, y) = match hint {
        Some(c) if c.x.is_finite() && c.y.is_finite() => (c.x, c.y),
        _ => {
            let n = circles.len() as f64;
            (
                circles.iter().map(|c| c.x).sum::<f64>() / n,
                circles.iter().map(|c| c.y).sum::<f64>() / n,
            )
        }
    };
    let r = circles
        .iter()
        .map(|c| (c.x - x).hypot(c.y - y) + c.r)
        .fold(0.0, f64::max);
    Circle { x, y, r }
}

/// The smallest basis enclosing both `basis` and `p`, or `None` when no
/// candidate checks out numerically.
fn extend_basis(basis: &[Circle], p: Circle) -> Option<Vec<Circle>> {
    if encloses_weak_all(&p, basis) {
        return Some(vec![p]);
    }

    for &bi in basis {
        if encloses_not(&p, &bi) && encloses_weak_all(&enclose_basis2(&bi, &p), basis) {
            return Some(vec![bi, p]);
        }
    }

    for (i, &bi) in basis.iter().enumerate() {
        for &bj in &basis[i + 1..] {
            if encloses_not(&enclose_basis2(&bi, &bj), &p)
                && encloses_not(&enclose_basis2(&bi, &p), &bj)
                && encloses_not(&enclose_basis2(&bj, &p), &bi)
                && encloses_weak_all(&enclose_basis3(&bi, &bj, &p), basis)
            {
                return Some(vec![bi, bj, p]);
            }
        }
    }

    None
}

fn encloses_not(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr < 0.0 || dr * dr < dx * dx + dy * dy
}

fn encloses_weak(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: &Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
    match basis {
        [a] => *a,
        [a, b] => enclose_basis2(a, b),
        [a, b, c] => enclose_basis3(a, b, c),
        _ => Circle::default(),
    }
}

fn enclose_basis2(a: &Circle, b: &Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    Circle {
        x: (a.x + b.x + x21 / l * r21) / 2.0,
        y: (a.y + b.y + y21 / l * r21) / 2.0,
        r: (l + a.r + b.r) / 2.0,
    }
}

fn enclose_basis3(a: &Circle, b: &Circle, c: &Circle) -> Circle {
    let (x1, y1, r1) = (a.x, a.y, a.r);
    let (x2, y2, r2) = (b.x, b.y, b.r);
    let (x3, y3, r3) = (c.x, c.y, c.r);
    let a2 = x1 - x2;
    let a3 = x1 - x3;
    let b2 = y1 - y2;
    let b3 = y1 - y3;
    let c2 = r2 - r1;
    let c3 = r3 - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
    let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;
    let ab = a3 * b2 - a2 * b3;
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = -(if qa.abs() > 1e-6 {
        (qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        qc / qb
    });
    Circle {
        x: x1 + xa + xb * r,
        y: y1 + ya + yb * r,
        r,
    }
}

/// Linear congruential generator with a fixed seed, so the enclosing-circle
/// shuffle is identical on every run.
struct Lcg {
    state: u64,
}

impl Lcg {
    const A: u64 = 1_664_525;
    const C: u64 = 1_013_904_223;
    const M: u64 = 1 << 32;

    fn new() -> Self {
        Self { state: 1 }
    }

    fn next_f64(&mut self) -> f64 {
        self.state = (Self::A * self.state + Self::C) % Self::M;
        self.state as f64 / Self::M as f64
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        let mut m = items.len();
        while m > 0 {
            let i = (self.next_f64() * m as f64) as usize;
            m -= 1;
            items.swap(m, i);
        }
    }
}
