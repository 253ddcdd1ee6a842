// Matrix stack used while walking the scene graph

use glam::Mat4;

/// Ancestor transforms collected during a depth-first walk.
///
/// The most recently pushed matrix is the top. A stack lives for a single
/// traversal and is never kept between frames.
#[derive(Debug, Default)]
pub struct MatrixStack {
    entries: Vec<Mat4>,
}

impl MatrixStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, matrix: Mat4) {
        self.entries.push(matrix);
    }

    /// Removes the most recently pushed matrix.
    ///
    /// # Panics
    /// Panics on an empty stack; an unbalanced pop means the traversal is broken.
    pub fn pop(&mut self) -> Mat4 {
        self.entries
            .pop()
            .unwrap_or_else(|| panic!("matrix stack underflow"))
    }

    /// Returns the most recently pushed matrix.
    ///
    /// # Panics
    /// Panics on an empty stack.
    pub fn top(&self) -> &Mat4 {
        self.entries
            .last()
            .unwrap_or_else(|| panic!("top() called on an empty matrix stack"))
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Product of every entry, oldest on the left: `root * ... * top`.
    ///
    /// An empty stack accumulates to the identity.
    pub fn accumulate(&self) -> Mat4 {
        self.entries
            .iter()
            .fold(Mat4::IDENTITY, |acc, matrix| acc * *matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn sample_matrices() -> (Mat4, Mat4, Mat4) {
        (
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Mat4::from_scale(Vec3::new(2.0, 1.0, 0.5)),
        )
    }

    #[test]
    fn accumulate_applies_oldest_first() {
        let (a, b, c) = sample_matrices();
        let mut stack = MatrixStack::new();
        stack.push(a);
        stack.push(b);
        stack.push(c);

        let accumulated = stack.accumulate();
        assert!(accumulated.abs_diff_eq(a * b * c, 1e-6));
        assert!(!accumulated.abs_diff_eq(c * b * a, 1e-3));
    }

    #[test]
    fn empty_stack_accumulates_to_identity() {
        assert_eq!(MatrixStack::new().accumulate(), Mat4::IDENTITY);
    }

    #[test]
    fn push_pop_and_top() {
        let (a, b, _) = sample_matrices();
        let mut stack = MatrixStack::new();
        stack.push(a);
        stack.push(b);
        assert_eq!(stack.depth(), 2);
        assert_eq!(*stack.top(), b);
        assert_eq!(stack.pop(), b);
        assert_eq!(*stack.top(), a);
        assert_eq!(stack.pop(), a);
        assert!(stack.is_empty());
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn pop_on_empty_stack_panics() {
        MatrixStack::new().pop();
    }

    #[test]
    #[should_panic]
    fn top_on_empty_stack_panics() {
        let stack = MatrixStack::new();
        let _ = stack.top();
    }
}
