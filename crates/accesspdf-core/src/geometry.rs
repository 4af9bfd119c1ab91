/// A 2D point in PDF user space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether this point is (0, 0), the position of an untransformed text origin.
    pub fn is_origin(&self) -> bool {
        self.x.abs() < f64::EPSILON && self.y.abs() < f64::EPSILON
    }
}

/// An affine transformation matrix `[a b c d e f]` as used by `cm` and `Tm`.
///
/// Matrices compose in PDF row-vector order: `m1.concat(&m2)` applies `m1`
/// first, then `m2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ctm {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Ctm {
    fn default() -> Self {
        Self::identity()
    }
}

impl Ctm {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// A pure translation by `(tx, ty)`.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Multiply `self × other`.
    pub fn concat(&self, other: &Ctm) -> Ctm {
        Ctm {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point through this matrix.
    pub fn transform_point(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// The translation component `(e, f)`.
    pub fn origin(&self) -> Point {
        Point::new(self.e, self.f)
    }

    /// Magnitude of the vertical scale component, used to derive the
    /// rendered font size from the declared one.
    pub fn vertical_scale(&self) -> f64 {
        let scale = (self.c * self.c + self.d * self.d).sqrt();
        if scale > 0.0 { scale } else { 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-10,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn identity_leaves_points_alone() {
        let p = Ctm::identity().transform_point(Point::new(3.0, 4.0));
        assert_eq!(p, Point::new(3.0, 4.0));
    }

    #[test]
    fn translation_then_scale_concat_order() {
        let t = Ctm::translation(10.0, 20.0);
        let s = Ctm::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let m = t.concat(&s);
        let p = m.transform_point(Point::new(1.0, 1.0));
        assert_approx(p.x, 22.0);
        assert_approx(p.y, 42.0);
    }

    #[test]
    fn vertical_scale_of_scaled_matrix() {
        assert_approx(Ctm::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0).vertical_scale(), 2.0);
        assert_approx(Ctm::new(1.0, 0.0, 0.0, -3.0, 0.0, 0.0).vertical_scale(), 3.0);
    }

    #[test]
    fn degenerate_vertical_scale_falls_back_to_one() {
        assert_approx(Ctm::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0).vertical_scale(), 1.0);
    }

    #[test]
    fn origin_detection() {
        assert!(Point::new(0.0, 0.0).is_origin());
        assert!(!Point::new(0.0, 720.0).is_origin());
    }
}
